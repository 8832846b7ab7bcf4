//! Input/output helpers.
//!
//! - CSV ingest + validation (`ingest`)
//! - comparison/diagnostic CSV and JSON summary exports (`export`)

pub mod export;
pub mod ingest;

pub use export::*;
pub use ingest::*;
