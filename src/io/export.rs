//! Export run results.
//!
//! - dataset CSV (the `simulate` output, readable by ingest)
//! - comparison table CSV (one row per model)
//! - per-observation diagnostic CSV
//! - JSON run summary
//!
//! Everything is meant to be easy to consume in spreadsheets or downstream scripts.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::diagnostic::{DifferentialDiagnosis, FactorShare, GainSummary};
use crate::domain::{Criterion, Dataset};
use crate::error::AppError;
use crate::models::Elasticities;
use crate::selection::{ComparisonRow, ComparisonTable};

fn create(path: &Path, what: &str) -> Result<File, AppError> {
    File::create(path).map_err(|e| AppError::new(2, format!("Failed to create {what} '{}': {e}", path.display())))
}

fn csv_err(e: csv::Error) -> AppError {
    AppError::new(2, format!("Failed to write export: {e}"))
}

fn flush_err(e: std::io::Error) -> AppError {
    AppError::new(2, format!("Failed to write export: {e}"))
}

fn opt(v: Option<f64>) -> String {
    v.map(|v| format!("{v:.6}")).unwrap_or_default()
}

/// Write a dataset as `id,<factors...>,<target>`.
pub fn write_dataset_csv(path: &Path, data: &Dataset, target: &str) -> Result<(), AppError> {
    let mut file = create(path, "dataset CSV")?;
    write_dataset(&mut file, data, target)
}

pub fn write_dataset<W: Write>(out: &mut W, data: &Dataset, target: &str) -> Result<(), AppError> {
    let mut wtr = csv::Writer::from_writer(out);

    let mut header = vec!["id"];
    header.extend(data.factors.names().iter().map(String::as_str));
    header.push(target);
    wtr.write_record(&header).map_err(csv_err)?;

    for i in 0..data.len() {
        let mut record = vec![data.ids[i].clone()];
        // `f64::to_string` prints the shortest representation that parses back exactly.
        record.extend(data.x.row(i).iter().map(|v| v.to_string()));
        record.push(data.y[i].to_string());
        wtr.write_record(&record).map_err(csv_err)?;
    }
    wtr.flush().map_err(flush_err)
}

/// Write the comparison table to a CSV file.
pub fn write_comparison_csv(path: &Path, table: &ComparisonTable) -> Result<(), AppError> {
    let mut file = create(path, "comparison CSV")?;
    write_comparison(&mut file, table)
}

pub fn write_comparison<W: Write>(out: &mut W, table: &ComparisonTable) -> Result<(), AppError> {
    let mut wtr = csv::Writer::from_writer(out);
    wtr.write_record([
        "model",
        "n_params",
        "r2",
        "rmse",
        "mae",
        "aic",
        "bic",
        "r2_loocv",
        "rmse_loocv",
        "mae_loocv",
        "overfit_gap",
    ])
    .map_err(csv_err)?;

    for r in table.rows() {
        let m = &r.metrics;
        let cv = r.loocv;
        wtr.write_record([
            r.model.clone(),
            r.n_params.to_string(),
            format!("{:.6}", m.r2),
            format!("{:.6}", m.rmse),
            format!("{:.6}", m.mae),
            opt(m.aic),
            opt(m.bic),
            opt(cv.map(|c| c.r2)),
            opt(cv.map(|c| c.rmse)),
            opt(cv.map(|c| c.mae)),
            opt(cv.map(|c| c.overfit_gap)),
        ])
        .map_err(csv_err)?;
    }
    wtr.flush().map_err(flush_err)
}

/// Write one row per observation with both diagnoses.
pub fn write_diagnostic_csv(
    path: &Path,
    data: &Dataset,
    diag: &DifferentialDiagnosis,
    target: &str,
) -> Result<(), AppError> {
    let mut file = create(path, "diagnostic CSV")?;
    write_diagnostic(&mut file, data, diag, target)
}

pub fn write_diagnostic<W: Write>(
    out: &mut W,
    data: &Dataset,
    diag: &DifferentialDiagnosis,
    target: &str,
) -> Result<(), AppError> {
    let mut wtr = csv::Writer::from_writer(out);

    let mut header = vec!["id"];
    header.extend(data.factors.names().iter().map(String::as_str));
    header.extend([
        target,
        "limiting_multiplicative",
        "limiting_additive",
        "convergent",
        "efficiency_gain",
    ]);
    wtr.write_record(&header).map_err(csv_err)?;

    for i in 0..data.len() {
        let mut record = vec![data.ids[i].clone()];
        record.extend(data.x.row(i).iter().map(|v| format!("{v:.6}")));
        record.extend([
            format!("{:.6}", data.y[i]),
            diag.limiting_multiplicative[i].clone(),
            diag.limiting_additive[i].clone(),
            diag.divergence.convergent_mask[i].to_string(),
            format!("{:.6}", diag.efficiency_gains[i]),
        ]);
        wtr.write_record(&record).map_err(csv_err)?;
    }
    wtr.flush().map_err(flush_err)
}

/// Diagnosis headline figures (per-row vectors live in the CSV).
#[derive(Debug, Clone, Serialize)]
pub struct DiagnosisSummary<'a> {
    pub additive_weights: &'a [f64],
    pub n_convergent: usize,
    pub n_divergent: usize,
    pub convergence_rate: f64,
    pub divergence_rate: f64,
    pub gain_summary: Option<GainSummary>,
    pub distribution_multiplicative: &'a [FactorShare],
    pub distribution_additive: &'a [FactorShare],
}

impl<'a> From<&'a DifferentialDiagnosis> for DiagnosisSummary<'a> {
    fn from(d: &'a DifferentialDiagnosis) -> Self {
        Self {
            additive_weights: &d.additive_weights,
            n_convergent: d.divergence.n_convergent,
            n_divergent: d.divergence.n_divergent,
            convergence_rate: d.divergence.convergence_rate,
            divergence_rate: d.divergence.divergence_rate,
            gain_summary: d.gain_summary,
            distribution_multiplicative: &d.distribution_multiplicative,
            distribution_additive: &d.distribution_additive,
        }
    }
}

/// JSON summary of one run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary<'a> {
    pub tool: &'static str,
    pub version: &'static str,
    pub generated_at: DateTime<Utc>,
    pub n_observations: usize,
    pub factors: &'a [String],
    pub epsilon: f64,
    pub models: &'a [ComparisonRow],
    pub criterion: Criterion,
    pub preferred: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elasticities: Option<Elasticities>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnosis: Option<DiagnosisSummary<'a>>,
}

impl<'a> RunSummary<'a> {
    pub fn new(data: &'a Dataset, table: &'a ComparisonTable, criterion: Criterion, epsilon: f64) -> Self {
        Self {
            tool: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
            generated_at: Utc::now(),
            n_observations: data.len(),
            factors: data.factors.names(),
            epsilon,
            models: table.rows(),
            criterion,
            preferred: table.preferred(criterion).map(|r| r.model.as_str()),
            elasticities: table
                .fit_for(crate::domain::ModelKind::Multiplicative)
                .and_then(|f| f.elasticities().ok()),
            diagnosis: None,
        }
    }

    pub fn with_diagnosis(mut self, diag: &'a DifferentialDiagnosis) -> Self {
        self.diagnosis = Some(diag.into());
        self
    }
}

/// Write a run summary JSON file.
pub fn write_summary_json(path: &Path, summary: &RunSummary<'_>) -> Result<(), AppError> {
    let file = create(path, "summary JSON")?;
    serde_json::to_writer_pretty(file, summary)
        .map_err(|e| AppError::new(2, format!("Failed to write summary JSON: {e}")))?;
    Ok(())
}
