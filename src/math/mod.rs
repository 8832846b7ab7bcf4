//! Mathematical utilities: least squares and feature transforms.

pub mod ols;
pub mod transform;

pub use ols::*;
pub use transform::*;
