//! Saviesa model family: additive, interaction, multiplicative.
//!
//! Estimators are small configuration values implementing [`Regressor`];
//! fitting returns an immutable [`FittedModel`] that can be shared freely.

pub mod model;

pub use model::*;
