//! Goodness-of-fit metrics.
//!
//! - R², RMSE, MAE from a (true, predicted) pair
//! - AIC / BIC in the Gaussian form `n ln(RSS/n) + penalty`
//! - side-by-side comparison of two prediction sets
//! - leave-one-out cross-validation (`loocv`)
//!
//! Information criteria floor `RSS/n` at [`RSS_FLOOR`] so a perfect fit gives
//! a large negative but finite value instead of `-inf`.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::ModelError;

pub mod loocv;

pub use loocv::*;

/// Lower bound applied to `RSS/n` before taking its logarithm.
pub const RSS_FLOOR: f64 = 1e-12;

fn check_pair(y_true: &[f64], y_pred: &[f64]) -> Result<(), ModelError> {
    if y_true.len() != y_pred.len() {
        return Err(ModelError::LengthMismatch {
            left: y_true.len(),
            right: y_pred.len(),
        });
    }
    if y_true.is_empty() {
        return Err(ModelError::EmptyInput("no values to score"));
    }
    Ok(())
}

fn rss(y_true: &[f64], y_pred: &[f64]) -> f64 {
    y_true
        .iter()
        .zip(y_pred.iter())
        .map(|(t, p)| (t - p).powi(2))
        .sum()
}

/// Coefficient of determination `1 - RSS/TSS`.
///
/// A constant target has `TSS = 0`; it scores 1.0 when predicted exactly and
/// 0.0 otherwise.
pub fn r2(y_true: &[f64], y_pred: &[f64]) -> Result<f64, ModelError> {
    check_pair(y_true, y_pred)?;
    let mean = y_true.iter().sum::<f64>() / y_true.len() as f64;
    let tss: f64 = y_true.iter().map(|t| (t - mean).powi(2)).sum();
    let rss = rss(y_true, y_pred);

    if tss == 0.0 {
        return Ok(if rss == 0.0 { 1.0 } else { 0.0 });
    }
    Ok(1.0 - rss / tss)
}

pub fn rmse(y_true: &[f64], y_pred: &[f64]) -> Result<f64, ModelError> {
    check_pair(y_true, y_pred)?;
    Ok((rss(y_true, y_pred) / y_true.len() as f64).sqrt())
}

pub fn mae(y_true: &[f64], y_pred: &[f64]) -> Result<f64, ModelError> {
    check_pair(y_true, y_pred)?;
    let total: f64 = y_true
        .iter()
        .zip(y_pred.iter())
        .map(|(t, p)| (t - p).abs())
        .sum();
    Ok(total / y_true.len() as f64)
}

/// `n ln(RSS/n) + 2k`, with `k` counting the intercept.
pub fn aic(y_true: &[f64], y_pred: &[f64], n_params: usize) -> Result<f64, ModelError> {
    let log_term = gaussian_log_term(y_true, y_pred)?;
    Ok(log_term + 2.0 * n_params as f64)
}

/// `n ln(RSS/n) + k ln(n)`, with `k` counting the intercept.
pub fn bic(y_true: &[f64], y_pred: &[f64], n_params: usize) -> Result<f64, ModelError> {
    let log_term = gaussian_log_term(y_true, y_pred)?;
    let n = y_true.len() as f64;
    Ok(log_term + n_params as f64 * n.ln())
}

fn gaussian_log_term(y_true: &[f64], y_pred: &[f64]) -> Result<f64, ModelError> {
    check_pair(y_true, y_pred)?;
    let n = y_true.len() as f64;
    let rss_per = (rss(y_true, y_pred) / n).max(RSS_FLOOR);
    Ok(n * rss_per.ln())
}

/// Metrics computed from one (true, predicted) pair.
///
/// `aic`/`bic` are present only when a parameter count was supplied.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricSet {
    pub r2: f64,
    pub rmse: f64,
    pub mae: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aic: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bic: Option<f64>,
}

impl MetricSet {
    /// Plain `name -> value` record for report/export collaborators.
    pub fn to_record(&self) -> BTreeMap<String, f64> {
        let mut out = BTreeMap::new();
        out.insert("r2".to_string(), self.r2);
        out.insert("rmse".to_string(), self.rmse);
        out.insert("mae".to_string(), self.mae);
        if let Some(v) = self.aic {
            out.insert("aic".to_string(), v);
        }
        if let Some(v) = self.bic {
            out.insert("bic".to_string(), v);
        }
        out
    }
}

/// R², RMSE, MAE, plus AIC/BIC when `n_params` is given.
pub fn all_metrics(
    y_true: &[f64],
    y_pred: &[f64],
    n_params: Option<usize>,
) -> Result<MetricSet, ModelError> {
    let (aic, bic) = match n_params {
        Some(k) => (Some(aic(y_true, y_pred, k)?), Some(bic(y_true, y_pred, k)?)),
        None => (None, None),
    };
    Ok(MetricSet {
        r2: r2(y_true, y_pred)?,
        rmse: rmse(y_true, y_pred)?,
        mae: mae(y_true, y_pred)?,
        aic,
        bic,
    })
}

/// How much the second prediction set improves on the first.
///
/// Deltas are `second - first`. Percentage improvements are
/// `(first - second) / first * 100` and are `None` when the first model's
/// error is exactly zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Gains {
    pub delta_r2: f64,
    pub delta_rmse: f64,
    pub delta_mae: f64,
    pub pct_rmse_improvement: Option<f64>,
    pub pct_mae_improvement: Option<f64>,
}

/// Named metrics for two prediction sets plus the gains of the second.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionComparison {
    pub first: (String, MetricSet),
    pub second: (String, MetricSet),
    pub gains: Gains,
}

/// Percentage improvement of `after` over `before`, guarded against zero.
pub fn pct_improvement(before: f64, after: f64) -> Option<f64> {
    if before == 0.0 {
        return None;
    }
    Some((before - after) / before * 100.0)
}

pub fn compare_predictions(
    y_true: &[f64],
    y_pred1: &[f64],
    y_pred2: &[f64],
    names: (&str, &str),
) -> Result<PredictionComparison, ModelError> {
    let m1 = all_metrics(y_true, y_pred1, None)?;
    let m2 = all_metrics(y_true, y_pred2, None)?;

    let gains = Gains {
        delta_r2: m2.r2 - m1.r2,
        delta_rmse: m2.rmse - m1.rmse,
        delta_mae: m2.mae - m1.mae,
        pct_rmse_improvement: pct_improvement(m1.rmse, m2.rmse),
        pct_mae_improvement: pct_improvement(m1.mae, m2.mae),
    };

    Ok(PredictionComparison {
        first: (names.0.to_string(), m1),
        second: (names.1.to_string(), m2),
        gains,
    })
}
