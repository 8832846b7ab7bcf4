//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the model variants (`ModelKind`) and selection criteria (`Criterion`)
//! - the canonical factor ordering (`FactorSet`)
//! - in-memory observations (`Dataset`) and run configuration (`AnalysisConfig`)

pub mod types;

pub use types::*;
