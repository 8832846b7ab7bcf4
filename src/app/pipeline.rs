//! Shared analysis pipeline used by the `compare` and `diagnose` commands.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! load (CSV or synthetic) -> compare models -> (optionally) diagnose
//!
//! The command handlers can then focus on presentation and exports.

use crate::data::generate_education_sample;
use crate::diagnostic::{DifferentialDiagnosis, differential_diagnosis};
use crate::domain::{AnalysisConfig, DataSource, Dataset, FactorSet};
use crate::error::AppError;
use crate::io::ingest::{ColumnSpec, RowError, load_dataset};
use crate::selection::{ComparisonTable, ModelComparator};

/// Observations for one run plus where they came from.
#[derive(Debug, Clone)]
pub struct LoadedData {
    pub dataset: Dataset,
    /// Human-readable description of the source.
    pub source: String,
    pub row_errors: Vec<RowError>,
}

/// All computed outputs of a `compare` run.
#[derive(Debug, Clone)]
pub struct CompareOutput {
    pub data: LoadedData,
    pub table: ComparisonTable,
}

/// All computed outputs of a `diagnose` run.
#[derive(Debug, Clone)]
pub struct DiagnoseOutput {
    pub data: LoadedData,
    pub table: ComparisonTable,
    pub diagnosis: DifferentialDiagnosis,
}

/// Load the dataset described by `config.source`.
pub fn load_data(config: &AnalysisConfig) -> Result<LoadedData, AppError> {
    match &config.source {
        DataSource::Csv { path, id_column } => {
            let columns = ColumnSpec {
                factors: &config.factor_names,
                target: &config.target,
                id_column: id_column.as_deref(),
            };
            let ingest = load_dataset(path, &columns)?;
            Ok(LoadedData {
                dataset: ingest.dataset,
                source: format!("{} ({} of {} rows)", path.display(), ingest.rows_used, ingest.rows_read),
                row_errors: ingest.row_errors,
            })
        }
        DataSource::Synthetic { n, seed, noise_sd } => {
            if config.factor_names != FactorSet::olm().names() {
                log::warn!(
                    "synthetic sample always uses factors O,L,M; ignoring --factors {}",
                    config.factor_names.join(",")
                );
            }
            let dataset = generate_education_sample(*n, *seed, *noise_sd)?;
            Ok(LoadedData {
                dataset,
                source: format!("synthetic education sample (seed={seed}, noise={noise_sd})"),
                row_errors: Vec::new(),
            })
        }
    }
}

fn comparator(config: &AnalysisConfig) -> Result<ModelComparator, AppError> {
    Ok(ModelComparator::new()
        .with_epsilon(config.epsilon)?
        .with_loocv(config.loocv))
}

/// Load, then fit and score every model.
pub fn run_compare(config: &AnalysisConfig) -> Result<CompareOutput, AppError> {
    let data = load_data(config)?;
    let table = comparator(config)?.compare(&data.dataset.x, &data.dataset.y, None)?;
    Ok(CompareOutput { data, table })
}

/// Load, compare, then run the differential limiting-factor diagnosis.
pub fn run_diagnose(config: &AnalysisConfig) -> Result<DiagnoseOutput, AppError> {
    let CompareOutput { data, table } = run_compare(config)?;
    let diagnosis = differential_diagnosis(&data.dataset.x, &data.dataset.y, &data.dataset.factors)?;
    Ok(DiagnoseOutput {
        data,
        table,
        diagnosis,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Criterion, ModelKind};

    fn synthetic(n: usize, loocv: bool) -> AnalysisConfig {
        AnalysisConfig {
            source: DataSource::Synthetic {
                n,
                seed: 42,
                noise_sd: 0.05,
            },
            factor_names: vec!["O".to_string(), "L".to_string(), "M".to_string()],
            target: "F".to_string(),
            epsilon: 1e-10,
            loocv,
            criterion: Criterion::Bic,
            export_csv: None,
            export_json: None,
        }
    }

    #[test]
    fn compare_on_synthetic_sample() {
        let out = run_compare(&synthetic(300, false)).unwrap();
        assert_eq!(out.data.dataset.len(), 300);
        assert_eq!(out.table.rows().len(), 3);
        assert!(out.table.fit_for(ModelKind::Multiplicative).is_some());
    }

    #[test]
    fn diagnose_covers_every_row() {
        let out = run_diagnose(&synthetic(120, false)).unwrap();
        assert_eq!(out.diagnosis.limiting_multiplicative.len(), 120);
        assert_eq!(out.diagnosis.divergence.n_total, 120);
    }

    #[test]
    fn invalid_epsilon_maps_to_usage_error() {
        let mut config = synthetic(20, false);
        config.epsilon = -1.0;
        assert_eq!(run_compare(&config).unwrap_err().exit_code(), 2);
    }

    #[test]
    fn missing_csv_is_reported() {
        let mut config = synthetic(20, false);
        config.source = DataSource::Csv {
            path: "definitely/not/here.csv".into(),
            id_column: None,
        };
        assert_eq!(load_data(&config).unwrap_err().exit_code(), 2);
    }
}
