//! Command-line parsing for the Saviesa model comparison tool.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the modeling/math code.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::data::{DEFAULT_NOISE_SD, DEFAULT_SAMPLE_SIZE, DEFAULT_SEED};
use crate::domain::Criterion;
use crate::models::DEFAULT_EPSILON;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "saviesa",
    version,
    about = "Compare additive, interaction and multiplicative (Saviesa) performance models"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit the three models, print the comparison table, and optionally export it.
    Compare(CompareArgs),
    /// Compare multiplicative and additive limiting-factor diagnoses row by row.
    Diagnose(DiagnoseArgs),
    /// Write a synthetic education dataset to CSV.
    Simulate(SimulateArgs),
}

/// Where the observations come from (shared by `compare` and `diagnose`).
#[derive(Debug, Args, Clone)]
pub struct DataArgs {
    /// Input CSV; omit to use the synthetic education sample.
    #[arg(long, value_name = "CSV")]
    pub csv: Option<PathBuf>,

    /// Factor columns, in canonical order (comma-separated).
    #[arg(long, value_delimiter = ',', default_value = "O,L,M")]
    pub factors: Vec<String>,

    /// Target (performance) column.
    #[arg(long, default_value = "F")]
    pub target: String,

    /// Column holding the row identifier (CSV only).
    #[arg(long)]
    pub id_column: Option<String>,

    /// Synthetic sample size.
    #[arg(short = 'n', long, default_value_t = DEFAULT_SAMPLE_SIZE)]
    pub n: usize,

    /// Random seed for the synthetic sample.
    #[arg(long, default_value_t = DEFAULT_SEED)]
    pub seed: u64,

    /// Noise standard deviation for the synthetic sample.
    #[arg(long, default_value_t = DEFAULT_NOISE_SD)]
    pub noise: f64,

    /// Shift added before every logarithm of the multiplicative model.
    #[arg(long, default_value_t = DEFAULT_EPSILON)]
    pub epsilon: f64,
}

/// Options for `compare`.
#[derive(Debug, Args, Clone)]
pub struct CompareArgs {
    #[command(flatten)]
    pub data: DataArgs,

    /// Add leave-one-out cross-validation columns.
    #[arg(long)]
    pub loocv: bool,

    /// Information criterion used to pick the preferred model.
    #[arg(long, value_enum, default_value_t = Criterion::Bic)]
    pub criterion: Criterion,

    /// Export the comparison table to CSV.
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// Export a JSON run summary.
    #[arg(long)]
    pub json: Option<PathBuf>,
}

/// Options for `diagnose`.
#[derive(Debug, Args, Clone)]
pub struct DiagnoseArgs {
    #[command(flatten)]
    pub data: DataArgs,

    /// Export per-row diagnoses to CSV.
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// Export a JSON run summary (comparison plus diagnosis).
    #[arg(long)]
    pub json: Option<PathBuf>,
}

/// Options for `simulate`.
#[derive(Debug, Args, Clone)]
pub struct SimulateArgs {
    /// Output CSV path.
    #[arg(long, short = 'o', value_name = "CSV")]
    pub out: PathBuf,

    /// Sample size.
    #[arg(short = 'n', long, default_value_t = DEFAULT_SAMPLE_SIZE)]
    pub n: usize,

    /// Random seed.
    #[arg(long, default_value_t = DEFAULT_SEED)]
    pub seed: u64,

    /// Noise standard deviation.
    #[arg(long, default_value_t = DEFAULT_NOISE_SD)]
    pub noise: f64,
}
