//! Model comparison (additive vs interaction vs multiplicative).
//!
//! Every variant is fitted on the identical `(X, y)` and scored on the
//! original scale of F:
//! - R² / RMSE / MAE
//! - AIC = n ln(RSS/n) + 2k, BIC = n ln(RSS/n) + k ln(n)
//! - optionally LOOCV R² / RMSE / MAE and the in-sample minus LOOCV R² gap
//!
//! Preference rule:
//! 1. Take the minimum of the chosen criterion
//! 2. Among models within [`PREFERENCE_MARGIN`] of it, prefer the fewest parameters

use nalgebra::{DMatrix, DVector};
use serde::Serialize;

use crate::domain::{Criterion, ModelKind};
use crate::error::ModelError;
use crate::metrics::{MetricSet, all_metrics, loocv};
use crate::models::{AdditiveModel, FittedModel, InteractionModel, MultiplicativeModel, Regressor};

/// Criterion difference below which the simpler model is preferred.
pub const PREFERENCE_MARGIN: f64 = 2.0;

/// Out-of-sample scores for one model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LoocvScores {
    pub r2: f64,
    pub rmse: f64,
    pub mae: f64,
    /// In-sample R² minus LOOCV R²; large values point at overfitting.
    pub overfit_gap: f64,
}

/// One line of the comparison table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonRow {
    pub model: String,
    pub kind: ModelKind,
    pub n_params: usize,
    pub metrics: MetricSet,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loocv: Option<LoocvScores>,
}

impl ComparisonRow {
    pub fn criterion(&self, criterion: Criterion) -> Option<f64> {
        match criterion {
            Criterion::Aic => self.metrics.aic,
            Criterion::Bic => self.metrics.bic,
        }
    }
}

/// Rows in fitting order (additive, interaction, multiplicative).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonTable {
    rows: Vec<ComparisonRow>,
    #[serde(skip)]
    fits: Vec<FittedModel>,
}

impl ComparisonTable {
    pub fn rows(&self) -> &[ComparisonRow] {
        &self.rows
    }

    pub fn get(&self, model: &str) -> Option<&ComparisonRow> {
        self.rows.iter().find(|r| r.model == model)
    }

    /// Fitted model behind each row, same order as [`ComparisonTable::rows`].
    pub fn fits(&self) -> &[FittedModel] {
        &self.fits
    }

    pub fn fit_for(&self, kind: ModelKind) -> Option<&FittedModel> {
        self.fits.iter().find(|f| f.kind() == kind)
    }

    /// Preferred model under `criterion`.
    ///
    /// Returns `None` when no row carries a finite value for the criterion.
    pub fn preferred(&self, criterion: Criterion) -> Option<&ComparisonRow> {
        let scored: Vec<(&ComparisonRow, f64)> = self
            .rows
            .iter()
            .filter_map(|r| r.criterion(criterion).map(|v| (r, v)))
            .filter(|(_, v)| v.is_finite())
            .collect();

        let best = scored
            .iter()
            .map(|(_, v)| *v)
            .fold(f64::INFINITY, f64::min);
        if !best.is_finite() {
            return None;
        }

        // `min_by_key` keeps the first of equal keys, i.e. fitting order.
        scored
            .into_iter()
            .filter(|(_, v)| *v <= best + PREFERENCE_MARGIN)
            .min_by_key(|(r, _)| r.n_params)
            .map(|(r, _)| r)
    }
}

/// Fits the three variants with shared settings.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModelComparator {
    multiplicative: MultiplicativeModel,
    loocv: bool,
}

impl ModelComparator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `epsilon` for the multiplicative model's logarithms.
    pub fn with_epsilon(mut self, epsilon: f64) -> Result<Self, ModelError> {
        self.multiplicative = MultiplicativeModel::with_epsilon(epsilon)?;
        Ok(self)
    }

    /// Also run leave-one-out cross-validation for every model.
    pub fn with_loocv(mut self, loocv: bool) -> Self {
        self.loocv = loocv;
        self
    }

    fn estimator(&self, kind: ModelKind) -> Configured {
        Configured {
            kind,
            multiplicative: self.multiplicative,
        }
    }

    /// Fit every variant on `(x, y)` and build the table.
    ///
    /// `names` overrides the display label of each row, in fitting order.
    pub fn compare(
        &self,
        x: &DMatrix<f64>,
        y: &DVector<f64>,
        names: Option<[&str; 3]>,
    ) -> Result<ComparisonTable, ModelError> {
        let names = names.unwrap_or(ModelKind::ALL.map(ModelKind::display_name));
        let y_true = y.as_slice();

        let mut rows = Vec::with_capacity(ModelKind::ALL.len());
        let mut fits = Vec::with_capacity(ModelKind::ALL.len());

        for (kind, name) in ModelKind::ALL.into_iter().zip(names) {
            let estimator = self.estimator(kind);
            let fitted = estimator.fit(x, y)?;
            let pred = fitted.predict(x)?;
            let n_params = fitted.param_count();
            let metrics = all_metrics(y_true, pred.as_slice(), Some(n_params))?;

            let cv_scores = if self.loocv {
                let cv = loocv(|| estimator, x, y)?;
                Some(LoocvScores {
                    r2: cv.r2_loocv,
                    rmse: cv.rmse_loocv,
                    mae: cv.mae_loocv,
                    overfit_gap: metrics.r2 - cv.r2_loocv,
                })
            } else {
                None
            };

            log::info!(
                "{name}: r2={:.4} rmse={:.4} mae={:.4} k={n_params}{}",
                metrics.r2,
                metrics.rmse,
                metrics.mae,
                cv_scores
                    .map(|cv| format!(" loocv_r2={:.4}", cv.r2))
                    .unwrap_or_default()
            );

            rows.push(ComparisonRow {
                model: name.to_string(),
                kind,
                n_params,
                metrics,
                loocv: cv_scores,
            });
            fits.push(fitted);
        }

        Ok(ComparisonTable { rows, fits })
    }
}

/// Estimator for one kind with the comparator's settings.
#[derive(Debug, Clone, Copy)]
struct Configured {
    kind: ModelKind,
    multiplicative: MultiplicativeModel,
}

impl Regressor for Configured {
    fn kind(&self) -> ModelKind {
        self.kind
    }

    fn fit(&self, x: &DMatrix<f64>, y: &DVector<f64>) -> Result<FittedModel, ModelError> {
        match self.kind {
            ModelKind::Additive => AdditiveModel.fit(x, y),
            ModelKind::Interaction => InteractionModel.fit(x, y),
            ModelKind::Multiplicative => self.multiplicative.fit(x, y),
        }
    }
}

/// Fit additive, interaction and multiplicative models and score them in-sample.
pub fn compare_models(
    x: &DMatrix<f64>,
    y: &DVector<f64>,
    names: Option<[&str; 3]>,
) -> Result<ComparisonTable, ModelError> {
    ModelComparator::new().compare(x, y, names)
}

/// [`compare_models`] plus LOOCV scores per model.
pub fn compare_models_with_loocv(
    x: &DMatrix<f64>,
    y: &DVector<f64>,
    names: Option<[&str; 3]>,
) -> Result<ComparisonTable, ModelError> {
    ModelComparator::new().with_loocv(true).compare(x, y, names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::prelude::*;
    use rand::rngs::StdRng;
    use rand_distr::Normal;

    fn factors(n: usize, seed: u64) -> DMatrix<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        DMatrix::from_fn(n, 3, |_, _| rng.gen_range(0.2..1.0))
    }

    fn row(model: &str, kind: ModelKind, n_params: usize, aic: f64) -> ComparisonRow {
        ComparisonRow {
            model: model.to_string(),
            kind,
            n_params,
            metrics: MetricSet {
                r2: 0.5,
                rmse: 0.1,
                mae: 0.1,
                aic: Some(aic),
                bic: Some(aic + 1.0),
            },
            loocv: None,
        }
    }

    fn table(rows: Vec<ComparisonRow>) -> ComparisonTable {
        ComparisonTable { rows, fits: vec![] }
    }

    #[test]
    fn rows_follow_fitting_order() {
        let x = factors(40, 1);
        let y = DVector::from_fn(40, |i, _| 0.1 + 0.3 * x[(i, 0)] + 0.2 * x[(i, 1)] + 0.1 * x[(i, 2)]);

        let table = compare_models(&x, &y, None).unwrap();
        let names: Vec<&str> = table.rows().iter().map(|r| r.model.as_str()).collect();
        assert_eq!(names, vec!["Additive", "Interaction", "Multiplicative"]);
        assert_eq!(table.rows()[1].n_params, 7);
        assert_eq!(table.fits().len(), 3);
        assert!(table.rows().iter().all(|r| r.loocv.is_none()));

        let custom = compare_models(&x, &y, Some(["A", "I", "M"])).unwrap();
        assert!(custom.get("M").is_some());
        assert!(custom.get("Multiplicative").is_none());
    }

    #[test]
    fn linear_data_fits_additive_exactly() {
        let x = factors(30, 2);
        let y = DVector::from_fn(30, |i, _| 0.05 + 0.4 * x[(i, 0)] + 0.3 * x[(i, 1)] + 0.2 * x[(i, 2)]);

        let table = compare_models(&x, &y, None).unwrap();
        let add = table.get("Additive").unwrap();
        assert!(add.metrics.r2 > 1.0 - 1e-9);
        // Interaction nests additive, so it fits at least as well.
        let int = table.get("Interaction").unwrap();
        assert!(int.metrics.r2 > 1.0 - 1e-9);
        // Both are perfect; the floor makes their AIC differ by the penalty only.
        assert_eq!(table.preferred(Criterion::Aic).unwrap().kind, ModelKind::Additive);
    }

    #[test]
    fn product_data_prefers_multiplicative() {
        let x = factors(60, 3);
        let noise = Normal::<f64>::new(0.0, 0.002).unwrap();
        let mut rng = StdRng::seed_from_u64(33);
        let y = DVector::from_fn(60, |i, _| {
            let clean = x[(i, 0)] * x[(i, 1)] * x[(i, 2)];
            clean * (1.0 + noise.sample(&mut rng))
        });

        let table = compare_models(&x, &y, None).unwrap();
        let mult = table.get("Multiplicative").unwrap();
        let add = table.get("Additive").unwrap();
        assert!(mult.metrics.r2 > add.metrics.r2);
        assert!(mult.metrics.aic.unwrap() < add.metrics.aic.unwrap());
        assert_eq!(table.preferred(Criterion::Bic).unwrap().kind, ModelKind::Multiplicative);
        assert!(table.fit_for(ModelKind::Multiplicative).unwrap().elasticities().is_ok());
    }

    #[test]
    fn preference_margin_picks_simpler_model() {
        let t = table(vec![
            row("Additive", ModelKind::Additive, 4, -100.0),
            row("Interaction", ModelKind::Interaction, 7, -101.5),
            row("Multiplicative", ModelKind::Multiplicative, 4, -90.0),
        ]);
        assert_eq!(t.preferred(Criterion::Aic).unwrap().model, "Additive");

        let t = table(vec![
            row("Additive", ModelKind::Additive, 4, -100.0),
            row("Interaction", ModelKind::Interaction, 7, -110.0),
            row("Multiplicative", ModelKind::Multiplicative, 4, -90.0),
        ]);
        assert_eq!(t.preferred(Criterion::Aic).unwrap().model, "Interaction");
    }

    #[test]
    fn equal_parameter_counts_keep_fitting_order() {
        let t = table(vec![
            row("Additive", ModelKind::Additive, 4, -99.0),
            row("Interaction", ModelKind::Interaction, 7, -100.0),
            row("Multiplicative", ModelKind::Multiplicative, 4, -100.0),
        ]);
        assert_eq!(t.preferred(Criterion::Aic).unwrap().model, "Additive");
    }

    #[test]
    fn preferred_needs_a_finite_criterion() {
        let mut r = row("Additive", ModelKind::Additive, 4, f64::NAN);
        r.metrics.bic = None;
        let t = table(vec![r]);
        assert!(t.preferred(Criterion::Aic).is_none());
        assert!(t.preferred(Criterion::Bic).is_none());
    }

    #[test]
    fn loocv_columns_and_overfit_gap() {
        let x = factors(25, 4);
        let noise = Normal::<f64>::new(0.0, 0.02).unwrap();
        let mut rng = StdRng::seed_from_u64(44);
        let y = DVector::from_fn(25, |i, _| 0.2 + 0.5 * x[(i, 0)] + 0.2 * x[(i, 1)] + noise.sample(&mut rng));

        let table = compare_models_with_loocv(&x, &y, None).unwrap();
        for r in table.rows() {
            let cv = r.loocv.unwrap();
            assert!((cv.overfit_gap - (r.metrics.r2 - cv.r2)).abs() < 1e-12);
        }
        // PRESS >= RSS for OLS, so the linear models never validate better than they fit.
        let add = table.get("Additive").unwrap().loocv.unwrap();
        assert!(add.overfit_gap >= 0.0);
        let int = table.get("Interaction").unwrap().loocv.unwrap();
        assert!(int.overfit_gap >= 0.0);
    }

    #[test]
    fn invalid_epsilon_is_rejected() {
        assert_eq!(
            ModelComparator::new().with_epsilon(0.0).unwrap_err(),
            ModelError::InvalidEpsilon(0.0)
        );
        assert!(ModelComparator::new().with_epsilon(1e-6).is_ok());
    }

    #[test]
    fn mismatched_rows_propagate() {
        let x = factors(5, 5);
        let y = DVector::from_element(4, 0.5);
        assert_eq!(
            compare_models(&x, &y, None).unwrap_err(),
            ModelError::RowCountMismatch { x_rows: 5, y_len: 4 }
        );
    }
}
