//! Shared domain types.
//!
//! These types are intentionally kept lightweight so they can be:
//!
//! - used in-memory during fitting and diagnosis
//! - handed to the report/export layer as plain records

use std::path::PathBuf;

use clap::ValueEnum;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::math::interaction_count;

/// Concrete model variant.
///
/// Declaration order is the fitting order used by comparisons and reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    /// `F = α0 + Σ αi Xi` (full compensability).
    Additive,
    /// Additive plus every pairwise product `Xi Xj` (partial compensability).
    Interaction,
    /// `ln F = β0 + Σ βi ln Xi` (no compensability, Liebig's law).
    Multiplicative,
}

impl ModelKind {
    pub const ALL: [ModelKind; 3] = [
        ModelKind::Additive,
        ModelKind::Interaction,
        ModelKind::Multiplicative,
    ];

    /// Human-readable label for terminal output.
    pub fn display_name(self) -> &'static str {
        match self {
            ModelKind::Additive => "Additive",
            ModelKind::Interaction => "Interaction",
            ModelKind::Multiplicative => "Multiplicative",
        }
    }

    /// Parameter count (slopes + intercept) for information criteria.
    pub fn param_count(self, n_features: usize) -> usize {
        match self {
            ModelKind::Additive | ModelKind::Multiplicative => n_features + 1,
            ModelKind::Interaction => n_features + interaction_count(n_features) + 1,
        }
    }
}

/// Information criterion used to pick a preferred model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Criterion {
    Aic,
    Bic,
}

/// Ordered factor names.
///
/// The order is canonical: it is the column order of the feature matrix and
/// the tie-break order of the limiting-factor rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactorSet {
    names: Vec<String>,
}

impl FactorSet {
    pub fn new<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Result<Self, ModelError> {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if names.is_empty() {
            return Err(ModelError::EmptyInput("factor set has no names"));
        }
        Ok(Self { names })
    }

    /// `F1, F2, ..., Fn`.
    pub fn default_for(n: usize) -> Self {
        Self {
            names: (1..=n).map(|i| format!("F{i}")).collect(),
        }
    }

    /// Orientation, Levier, Milieu.
    pub fn olm() -> Self {
        Self {
            names: vec!["O".to_string(), "L".to_string(), "M".to_string()],
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn name(&self, index: usize) -> Result<&str, ModelError> {
        self.names
            .get(index)
            .map(String::as_str)
            .ok_or(ModelError::FactorIndexOutOfRange {
                index,
                len: self.names.len(),
            })
    }

    pub fn index_of(&self, name: &str) -> Result<usize, ModelError> {
        self.names
            .iter()
            .position(|n| n == name)
            .ok_or_else(|| ModelError::UnknownFactor(name.to_string()))
    }

    /// Ensure this set names exactly `n_columns` factors.
    pub fn check_width(&self, n_columns: usize) -> Result<(), ModelError> {
        if self.names.len() != n_columns {
            return Err(ModelError::FactorNameCountMismatch {
                expected: n_columns,
                got: self.names.len(),
            });
        }
        Ok(())
    }
}

/// A set of observations ready for fitting: one row per unit of analysis.
#[derive(Debug, Clone)]
pub struct Dataset {
    /// Unit identifiers (department code, school id, ...), one per row.
    pub ids: Vec<String>,
    pub factors: FactorSet,
    /// Factor values, columns in `factors` order.
    pub x: DMatrix<f64>,
    /// Observed composite performance F.
    pub y: DVector<f64>,
}

impl Dataset {
    pub fn new(
        ids: Vec<String>,
        factors: FactorSet,
        x: DMatrix<f64>,
        y: DVector<f64>,
    ) -> Result<Self, ModelError> {
        if x.nrows() != y.len() {
            return Err(ModelError::RowCountMismatch {
                x_rows: x.nrows(),
                y_len: y.len(),
            });
        }
        if ids.len() != y.len() {
            return Err(ModelError::LengthMismatch {
                left: ids.len(),
                right: y.len(),
            });
        }
        factors.check_width(x.ncols())?;
        Ok(Self { ids, factors, x, y })
    }

    pub fn len(&self) -> usize {
        self.y.len()
    }

    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }

    pub fn stats(&self) -> DatasetStats {
        let column = |values: Vec<f64>| ColumnStats::from_values(&values);
        DatasetStats {
            n: self.len(),
            factors: (0..self.x.ncols())
                .map(|j| column(self.x.column(j).iter().copied().collect()))
                .collect(),
            target: column(self.y.iter().copied().collect()),
        }
    }
}

/// Mean / standard deviation / range of one column.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ColumnStats {
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

impl ColumnStats {
    fn from_values(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self {
                mean: f64::NAN,
                std: f64::NAN,
                min: f64::NAN,
                max: f64::NAN,
            };
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        Self {
            mean,
            std: var.sqrt(),
            min: values.iter().copied().fold(f64::INFINITY, f64::min),
            max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        }
    }
}

/// Summary stats for a dataset (factor columns in canonical order, then F).
#[derive(Debug, Clone, Serialize)]
pub struct DatasetStats {
    pub n: usize,
    pub factors: Vec<ColumnStats>,
    pub target: ColumnStats,
}

/// Where the observations come from.
#[derive(Debug, Clone)]
pub enum DataSource {
    Csv {
        path: PathBuf,
        id_column: Option<String>,
    },
    Synthetic {
        n: usize,
        seed: u64,
        noise_sd: f64,
    },
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus defaults).
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub source: DataSource,
    pub factor_names: Vec<String>,
    pub target: String,

    /// ε added before every logarithm of the multiplicative model.
    pub epsilon: f64,
    /// Add LOOCV columns to the comparison table.
    pub loocv: bool,
    pub criterion: Criterion,

    pub export_csv: Option<PathBuf>,
    pub export_json: Option<PathBuf>,
}
