//! Limiting-factor diagnosis.
//!
//! Two rules name the factor that binds an observation:
//!
//! - multiplicative (Liebig): the factor with the smallest raw value
//! - additive: the factor with the largest weighted contribution `αi · Xi`,
//!   where `αi` come from an additive fit over the same factors
//!
//! Exact ties go to the factor that comes first in the canonical
//! [`FactorSet`] order. When the two rules disagree, the efficiency gain
//! `X[additive] / X[multiplicative]` says how much scarcer the Liebig factor is
//! than the one the additive reading would target.

use nalgebra::{DMatrix, DVector};
use serde::Serialize;

use crate::domain::FactorSet;
use crate::error::ModelError;
use crate::models::{AdditiveModel, Regressor};

fn check_finite(values: &[f64], row: usize) -> Result<(), ModelError> {
    match values.iter().position(|v| !v.is_finite()) {
        Some(col) => Err(ModelError::NonFiniteFactor { row, col }),
        None => Ok(()),
    }
}

fn argmin_first(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate().skip(1) {
        if v < values[best] {
            best = i;
        }
    }
    best
}

fn argmax_first(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate().skip(1) {
        if v > values[best] {
            best = i;
        }
    }
    best
}

fn multiplicative_index(values: &[f64], row: usize) -> Result<usize, ModelError> {
    if values.is_empty() {
        return Err(ModelError::EmptyInput("observation has no factor values"));
    }
    check_finite(values, row)?;
    Ok(argmin_first(values))
}

fn additive_index(weights: &[f64], values: &[f64], row: usize) -> Result<usize, ModelError> {
    if values.is_empty() {
        return Err(ModelError::EmptyInput("observation has no factor values"));
    }
    if weights.len() != values.len() {
        return Err(ModelError::LengthMismatch {
            left: weights.len(),
            right: values.len(),
        });
    }
    check_finite(values, row)?;
    let contributions: Vec<f64> = weights.iter().zip(values).map(|(w, v)| w * v).collect();
    Ok(argmax_first(&contributions))
}

/// Index of the limiting factor of one observation under the minimum rule.
///
/// A non-finite value is reported as row 0; use
/// [`limiting_indices_multiplicative`] to get real row numbers.
pub fn limiting_index_multiplicative(values: &[f64]) -> Result<usize, ModelError> {
    multiplicative_index(values, 0)
}

/// Index of the limiting factor of one observation under the
/// max-weighted-contribution rule.
///
/// A non-finite value is reported as row 0; use
/// [`limiting_indices_additive`] to get real row numbers.
pub fn limiting_index_additive(weights: &[f64], values: &[f64]) -> Result<usize, ModelError> {
    additive_index(weights, values, 0)
}

/// Name of the limiting factor of one observation (minimum rule).
pub fn identify_limiting_factor(values: &[f64], factors: &FactorSet) -> Result<String, ModelError> {
    factors.check_width(values.len())?;
    let idx = limiting_index_multiplicative(values)?;
    Ok(factors.name(idx)?.to_string())
}

/// Per-row limiting factor names (minimum rule).
pub fn identify_limiting_factors(x: &DMatrix<f64>, factors: &FactorSet) -> Result<Vec<String>, ModelError> {
    let idx = limiting_indices_multiplicative(x)?;
    names_for(&idx, factors, x.ncols())
}

/// Name of the limiting factor of one observation (additive rule).
pub fn identify_limiting_factor_additive(
    weights: &[f64],
    values: &[f64],
    factors: &FactorSet,
) -> Result<String, ModelError> {
    factors.check_width(values.len())?;
    let idx = limiting_index_additive(weights, values)?;
    Ok(factors.name(idx)?.to_string())
}

/// Per-row limiting factor names (additive rule).
pub fn identify_limiting_factors_additive(
    x: &DMatrix<f64>,
    weights: &[f64],
    factors: &FactorSet,
) -> Result<Vec<String>, ModelError> {
    let idx = limiting_indices_additive(x, weights)?;
    names_for(&idx, factors, x.ncols())
}

pub fn limiting_indices_multiplicative(x: &DMatrix<f64>) -> Result<Vec<usize>, ModelError> {
    rows(x)
        .enumerate()
        .map(|(r, values)| multiplicative_index(&values, r))
        .collect()
}

pub fn limiting_indices_additive(x: &DMatrix<f64>, weights: &[f64]) -> Result<Vec<usize>, ModelError> {
    rows(x)
        .enumerate()
        .map(|(r, values)| additive_index(weights, &values, r))
        .collect()
}

fn rows(x: &DMatrix<f64>) -> impl Iterator<Item = Vec<f64>> + '_ {
    x.row_iter().map(|row| row.iter().copied().collect())
}

fn names_for(indices: &[usize], factors: &FactorSet, width: usize) -> Result<Vec<String>, ModelError> {
    factors.check_width(width)?;
    indices
        .iter()
        .map(|&i| factors.name(i).map(str::to_string))
        .collect()
}

/// Agreement between two label vectors.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DivergenceStats {
    pub n_total: usize,
    pub n_convergent: usize,
    pub n_divergent: usize,
    /// Percentage of rows where the labels agree.
    pub convergence_rate: f64,
    /// Percentage of rows where the labels differ.
    pub divergence_rate: f64,
    pub convergent_mask: Vec<bool>,
    pub divergent_mask: Vec<bool>,
}

/// Elementwise comparison of two label vectors.
pub fn divergence_rate<T: PartialEq>(labels1: &[T], labels2: &[T]) -> Result<DivergenceStats, ModelError> {
    if labels1.len() != labels2.len() {
        return Err(ModelError::LengthMismatch {
            left: labels1.len(),
            right: labels2.len(),
        });
    }
    if labels1.is_empty() {
        return Err(ModelError::EmptyInput("no labels to compare"));
    }

    let convergent_mask: Vec<bool> = labels1.iter().zip(labels2).map(|(a, b)| a == b).collect();
    let divergent_mask: Vec<bool> = convergent_mask.iter().map(|c| !c).collect();

    let n_total = labels1.len();
    let n_convergent = convergent_mask.iter().filter(|c| **c).count();
    let n_divergent = n_total - n_convergent;

    let divergence_rate = n_divergent as f64 * 100.0 / n_total as f64;

    Ok(DivergenceStats {
        n_total,
        n_convergent,
        n_divergent,
        convergence_rate: 100.0 - divergence_rate,
        divergence_rate,
        convergent_mask,
        divergent_mask,
    })
}

/// Efficiency gain for one observation.
///
/// - rules agree: exactly 1.0
/// - rules disagree: `values[additive] / values[multiplicative]`, or 1.0 when
///   the multiplicative-rule value is not strictly positive
pub fn efficiency_gain(
    values: &[f64],
    limiting_multiplicative: usize,
    limiting_additive: usize,
) -> Result<f64, ModelError> {
    for index in [limiting_multiplicative, limiting_additive] {
        if index >= values.len() {
            return Err(ModelError::FactorIndexOutOfRange {
                index,
                len: values.len(),
            });
        }
    }

    if limiting_multiplicative == limiting_additive {
        return Ok(1.0);
    }

    let binding = values[limiting_multiplicative];
    if binding > 0.0 {
        Ok(values[limiting_additive] / binding)
    } else {
        Ok(1.0)
    }
}

/// [`efficiency_gain`] with factor labels instead of indices.
pub fn efficiency_gain_by_name(
    values: &[f64],
    limiting_multiplicative: &str,
    limiting_additive: &str,
    factors: &FactorSet,
) -> Result<f64, ModelError> {
    factors.check_width(values.len())?;
    efficiency_gain(
        values,
        factors.index_of(limiting_multiplicative)?,
        factors.index_of(limiting_additive)?,
    )
}

/// Descriptive statistics of the gains over divergent rows.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GainSummary {
    pub n: usize,
    pub mean: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
}

/// Summarize gains; `None` when there are none (no divergent rows).
pub fn summarize_gains(gains: &[f64]) -> Option<GainSummary> {
    if gains.is_empty() {
        return None;
    }
    let mut sorted = gains.to_vec();
    sorted.sort_by(f64::total_cmp);

    let n = sorted.len();
    let mid = n / 2;
    let median = if n % 2 == 1 {
        sorted[mid]
    } else {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    };

    Some(GainSummary {
        n,
        mean: sorted.iter().sum::<f64>() / n as f64,
        median,
        min: sorted[0],
        max: sorted[n - 1],
    })
}

/// How often one factor is named limiting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FactorShare {
    pub factor: String,
    pub count: usize,
    pub pct: f64,
}

/// Count and percentage of each factor in `labels`, in canonical order.
///
/// Factors that never appear are listed with a zero count.
pub fn label_distribution(labels: &[String], factors: &FactorSet) -> Result<Vec<FactorShare>, ModelError> {
    let mut counts = vec![0usize; factors.len()];
    for label in labels {
        counts[factors.index_of(label)?] += 1;
    }
    let total = labels.len();
    Ok(factors
        .names()
        .iter()
        .zip(counts)
        .map(|(name, count)| FactorShare {
            factor: name.clone(),
            count,
            pct: if total == 0 {
                0.0
            } else {
                count as f64 * 100.0 / total as f64
            },
        })
        .collect())
}

/// Full comparison of the multiplicative and additive diagnoses on a dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DifferentialDiagnosis {
    pub factors: Vec<String>,
    /// Additive-fit weights used by the additive rule, one per factor.
    pub additive_weights: Vec<f64>,
    pub limiting_multiplicative: Vec<String>,
    pub limiting_additive: Vec<String>,
    pub divergence: DivergenceStats,
    /// Per-row gain (1.0 on convergent rows).
    pub efficiency_gains: Vec<f64>,
    /// Summary over divergent rows only.
    pub gain_summary: Option<GainSummary>,
    pub distribution_multiplicative: Vec<FactorShare>,
    pub distribution_additive: Vec<FactorShare>,
}

/// Fit an additive model on `x`, then diagnose every row under both rules.
pub fn differential_diagnosis(
    x: &DMatrix<f64>,
    y: &DVector<f64>,
    factors: &FactorSet,
) -> Result<DifferentialDiagnosis, ModelError> {
    factors.check_width(x.ncols())?;

    // Row-wise check first so a bad factor is reported by its own row.
    let mult_idx = limiting_indices_multiplicative(x)?;
    let additive_weights = AdditiveModel.fit(x, y)?.coefficients().coefficients;

    let add_idx = limiting_indices_additive(x, &additive_weights)?;
    let divergence = divergence_rate(&mult_idx, &add_idx)?;

    let mut efficiency_gains = Vec::with_capacity(x.nrows());
    let mut divergent_gains = Vec::new();
    for (r, row) in rows(x).enumerate() {
        let gain = efficiency_gain(&row, mult_idx[r], add_idx[r])?;
        if divergence.divergent_mask[r] {
            divergent_gains.push(gain);
        }
        efficiency_gains.push(gain);
    }

    let limiting_multiplicative = names_for(&mult_idx, factors, x.ncols())?;
    let limiting_additive = names_for(&add_idx, factors, x.ncols())?;

    log::info!(
        "differential diagnosis: {}/{} divergent ({:.1}%)",
        divergence.n_divergent,
        divergence.n_total,
        divergence.divergence_rate
    );

    Ok(DifferentialDiagnosis {
        factors: factors.names().to_vec(),
        additive_weights,
        distribution_multiplicative: label_distribution(&limiting_multiplicative, factors)?,
        distribution_additive: label_distribution(&limiting_additive, factors)?,
        limiting_multiplicative,
        limiting_additive,
        divergence,
        efficiency_gains,
        gain_summary: summarize_gains(&divergent_gains),
    })
}
