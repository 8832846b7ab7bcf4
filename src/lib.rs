//! `saviesa` library crate.
//!
//! The binary (`saviesa`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the model/metric/diagnostic core stays free of I/O and is reusable from other drivers

pub mod app;
pub mod cli;
pub mod data;
pub mod diagnostic;
pub mod domain;
pub mod error;
pub mod io;
pub mod math;
pub mod metrics;
pub mod models;
pub mod report;
pub mod selection;
