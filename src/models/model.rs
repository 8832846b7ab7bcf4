//! Additive / interaction / multiplicative model implementations.
//!
//! Each variant is a feature transform (plus, for the multiplicative model,
//! a target transform and its inverse) wrapped around the same OLS solve:
//!
//! | variant        | design                    | target      | prediction        |
//! |----------------|---------------------------|-------------|-------------------|
//! | additive       | `X`                       | `y`         | `Xβ + β0`         |
//! | interaction    | `X ++ [Xi·Xj for i<j]`    | `y`         | `X'β + β0`        |
//! | multiplicative | `ln(X + ε)`               | `ln(y + ε)` | `exp(ln(X+ε)β+β0)`|
//!
//! Fitting never mutates the estimator; it produces an immutable
//! [`FittedModel`] that carries the transform it was fitted with, so predict
//! always replays the fit-time design.

use nalgebra::{DMatrix, DVector};
use serde::Serialize;

use crate::domain::ModelKind;
use crate::error::ModelError;
use crate::math::{LinearFit, add_pairwise_interactions, check_shapes, count_zeros, log_shift_matrix, log_shift_vector};
use crate::metrics::r2;

/// Default shift added before every logarithm.
pub const DEFAULT_EPSILON: f64 = 1e-10;

/// Something that can be fitted to a feature matrix and a target vector.
///
/// `fit` takes `&self`: an estimator holds configuration only, never fitted
/// state, so every call starts from scratch.
pub trait Regressor {
    fn kind(&self) -> ModelKind;

    fn fit(&self, x: &DMatrix<f64>, y: &DVector<f64>) -> Result<FittedModel, ModelError>;
}

/// `F = α0 + Σ αi Xi`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AdditiveModel;

/// `F = α0 + Σ αi Xi + Σ_{i<j} αij Xi Xj`.
#[derive(Debug, Clone, Copy, Default)]
pub struct InteractionModel;

/// `ln(F + ε) = β0 + Σ βi ln(Xi + ε)`, i.e. `F ≈ e^β0 Π Xi^βi`.
#[derive(Debug, Clone, Copy)]
pub struct MultiplicativeModel {
    epsilon: f64,
}

impl MultiplicativeModel {
    pub fn new() -> Self {
        Self {
            epsilon: DEFAULT_EPSILON,
        }
    }

    pub fn with_epsilon(epsilon: f64) -> Result<Self, ModelError> {
        if !(epsilon.is_finite() && epsilon > 0.0) {
            return Err(ModelError::InvalidEpsilon(epsilon));
        }
        Ok(Self { epsilon })
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }
}

impl Default for MultiplicativeModel {
    fn default() -> Self {
        Self::new()
    }
}

/// The transform pair a fitted model replays on new inputs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeatureTransform {
    Identity,
    PairwiseInteractions,
    /// `ln(x + ε)` on features and target; predictions are exponentiated back.
    LogShift { epsilon: f64 },
}

impl FeatureTransform {
    fn apply(&self, x: &DMatrix<f64>) -> Result<DMatrix<f64>, ModelError> {
        match self {
            FeatureTransform::Identity => Ok(x.clone()),
            FeatureTransform::PairwiseInteractions => Ok(add_pairwise_interactions(x)),
            FeatureTransform::LogShift { epsilon } => log_shift_matrix(x, *epsilon),
        }
    }

    fn apply_target(&self, y: &DVector<f64>) -> Result<DVector<f64>, ModelError> {
        match self {
            FeatureTransform::LogShift { epsilon } => log_shift_vector(y, *epsilon),
            _ => Ok(y.clone()),
        }
    }

    fn invert_target(&self, y: DVector<f64>) -> DVector<f64> {
        match self {
            FeatureTransform::LogShift { .. } => y.map(f64::exp),
            _ => y,
        }
    }
}

/// Intercept plus weights aligned with the transformed design columns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Coefficients {
    pub intercept: f64,
    pub coefficients: Vec<f64>,
}

/// Log-linear intercept plus one elasticity per raw factor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Elasticities {
    pub intercept: f64,
    pub elasticities: Vec<f64>,
}

/// Immutable result of fitting one variant to one dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct FittedModel {
    kind: ModelKind,
    transform: FeatureTransform,
    /// Raw (pre-transform) feature count seen at fit time.
    n_features: usize,
    linear: LinearFit,
}

impl FittedModel {
    fn fit_with(
        kind: ModelKind,
        transform: FeatureTransform,
        x: &DMatrix<f64>,
        y: &DVector<f64>,
    ) -> Result<Self, ModelError> {
        check_shapes(x, y)?;

        let design = transform.apply(x)?;
        let target = transform.apply_target(y)?;
        let linear = LinearFit::fit(&design, &target)?;

        log::debug!(
            "fitted {} model: n={}, features={}, design columns={}, intercept={:.6}",
            kind.display_name(),
            y.len(),
            x.ncols(),
            design.ncols(),
            linear.intercept
        );

        Ok(Self {
            kind,
            transform,
            n_features: x.ncols(),
            linear,
        })
    }

    pub fn kind(&self) -> ModelKind {
        self.kind
    }

    pub fn transform(&self) -> FeatureTransform {
        self.transform
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Slopes + intercept; the `k` to pass to AIC/BIC.
    pub fn param_count(&self) -> usize {
        self.linear.coefficients.len() + 1
    }

    /// Predict on the original scale of F.
    ///
    /// `x` must have the fit-time column count; the fit-time transform
    /// (and for the multiplicative model the fit-time ε) is reapplied.
    pub fn predict(&self, x: &DMatrix<f64>) -> Result<DVector<f64>, ModelError> {
        if x.ncols() != self.n_features {
            return Err(ModelError::FeatureCountMismatch {
                expected: self.n_features,
                got: x.ncols(),
            });
        }
        let design = self.transform.apply(x)?;
        let raw = self.linear.predict(&design)?;
        Ok(self.transform.invert_target(raw))
    }

    /// R² of this model's predictions against `y`.
    pub fn score(&self, x: &DMatrix<f64>, y: &DVector<f64>) -> Result<f64, ModelError> {
        let pred = self.predict(x)?;
        r2(y.as_slice(), pred.as_slice())
    }

    /// Intercept and per-column weights of the underlying linear fit.
    ///
    /// For the interaction model the interaction weights follow the raw ones
    /// in `(i, j)` lexicographic order. For the multiplicative model these are
    /// the log-space coefficients (see [`FittedModel::elasticities`]).
    pub fn coefficients(&self) -> Coefficients {
        Coefficients {
            intercept: self.linear.intercept,
            coefficients: self.linear.coefficients.clone(),
        }
    }

    /// Elasticities of F with respect to each factor (multiplicative only).
    pub fn elasticities(&self) -> Result<Elasticities, ModelError> {
        match self.transform {
            FeatureTransform::LogShift { .. } => Ok(Elasticities {
                intercept: self.linear.intercept,
                elasticities: self.linear.coefficients.clone(),
            }),
            _ => Err(ModelError::NotLogLinear(self.kind.display_name())),
        }
    }
}

impl Regressor for AdditiveModel {
    fn kind(&self) -> ModelKind {
        ModelKind::Additive
    }

    fn fit(&self, x: &DMatrix<f64>, y: &DVector<f64>) -> Result<FittedModel, ModelError> {
        FittedModel::fit_with(ModelKind::Additive, FeatureTransform::Identity, x, y)
    }
}

impl Regressor for InteractionModel {
    fn kind(&self) -> ModelKind {
        ModelKind::Interaction
    }

    fn fit(&self, x: &DMatrix<f64>, y: &DVector<f64>) -> Result<FittedModel, ModelError> {
        FittedModel::fit_with(
            ModelKind::Interaction,
            FeatureTransform::PairwiseInteractions,
            x,
            y,
        )
    }
}

impl Regressor for MultiplicativeModel {
    fn kind(&self) -> ModelKind {
        ModelKind::Multiplicative
    }

    fn fit(&self, x: &DMatrix<f64>, y: &DVector<f64>) -> Result<FittedModel, ModelError> {
        let zeros = count_zeros(x.iter()) + count_zeros(y.iter());
        if zeros > 0 {
            log::warn!(
                "{zeros} zero value(s) in multiplicative fit input; they map to ln({:e})",
                self.epsilon
            );
        }
        FittedModel::fit_with(
            ModelKind::Multiplicative,
            FeatureTransform::LogShift {
                epsilon: self.epsilon,
            },
            x,
            y,
        )
    }
}

/// A model kind fits with its default configuration.
impl Regressor for ModelKind {
    fn kind(&self) -> ModelKind {
        *self
    }

    fn fit(&self, x: &DMatrix<f64>, y: &DVector<f64>) -> Result<FittedModel, ModelError> {
        match self {
            ModelKind::Additive => AdditiveModel.fit(x, y),
            ModelKind::Interaction => InteractionModel.fit(x, y),
            ModelKind::Multiplicative => MultiplicativeModel::new().fit(x, y),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::prelude::*;
    use rand::rngs::StdRng;
    use rand_distr::Normal;

    fn uniform_features(rng: &mut StdRng, n: usize, p: usize, offset: f64) -> DMatrix<f64> {
        DMatrix::from_fn(n, p, |_, _| rng.gen_range(0.0..1.0) + offset)
    }

    #[test]
    fn additive_reproduces_exact_linear_target() {
        let mut rng = StdRng::seed_from_u64(42);
        let x = uniform_features(&mut rng, 50, 3, 0.0);
        let y = DVector::from_fn(50, |i, _| 0.5 + 0.3 * x[(i, 0)] + 0.4 * x[(i, 1)] - 0.2 * x[(i, 2)]);

        let fit = AdditiveModel.fit(&x, &y).unwrap();
        let pred = fit.predict(&x).unwrap();
        for (p, t) in pred.iter().zip(y.iter()) {
            assert!((p - t).abs() < 1e-9);
        }
        assert!((fit.score(&x, &y).unwrap() - 1.0).abs() < 1e-12);

        let coefs = fit.coefficients();
        assert_eq!(coefs.coefficients.len(), 3);
        assert!((coefs.intercept - 0.5).abs() < 1e-9);
        assert!((coefs.coefficients[2] + 0.2).abs() < 1e-9);
    }

    #[test]
    fn additive_scores_high_on_noisy_linear_data() {
        let mut rng = StdRng::seed_from_u64(42);
        let noise = Normal::<f64>::new(0.0, 0.01).unwrap();
        let x = uniform_features(&mut rng, 100, 2, 0.0);
        let y = DVector::from_fn(100, |i, _| {
            0.5 + 0.3 * x[(i, 0)] + 0.4 * x[(i, 1)] + noise.sample(&mut rng)
        });

        let fit = AdditiveModel.fit(&x, &y).unwrap();
        assert_eq!(fit.predict(&x).unwrap().len(), 100);
        let score = fit.score(&x, &y).unwrap();
        assert!(score > 0.9 && score <= 1.0, "score={score}");
    }

    #[test]
    fn interaction_captures_product_term() {
        let mut rng = StdRng::seed_from_u64(42);
        let noise = Normal::<f64>::new(0.0, 0.01).unwrap();
        let x = uniform_features(&mut rng, 100, 2, 0.0);
        let y = DVector::from_fn(100, |i, _| {
            0.5 + 0.3 * x[(i, 0)] + 0.4 * x[(i, 1)] + 0.2 * x[(i, 0)] * x[(i, 1)]
                + noise.sample(&mut rng)
        });

        let fit = InteractionModel.fit(&x, &y).unwrap();
        assert!(fit.score(&x, &y).unwrap() > 0.95);
        assert_eq!(fit.coefficients().coefficients.len(), 3);
        assert_eq!(fit.param_count(), 4);
    }

    #[test]
    fn interaction_predict_replays_fit_design() {
        let mut rng = StdRng::seed_from_u64(7);
        let x = uniform_features(&mut rng, 30, 3, 0.0);
        let y = DVector::from_fn(30, |i, _| x[(i, 0)] * x[(i, 2)] + 0.1 * x[(i, 1)]);

        let fit = InteractionModel.fit(&x, &y).unwrap();
        let first = fit.predict(&x).unwrap();
        let second = fit.predict(&x).unwrap();
        assert_eq!(first, second);
        for (p, t) in first.iter().zip(y.iter()) {
            assert!((p - t).abs() < 1e-8);
        }
    }

    #[test]
    fn interaction_rejects_different_feature_count() {
        let mut rng = StdRng::seed_from_u64(1);
        let x = uniform_features(&mut rng, 20, 3, 0.0);
        let y = DVector::from_fn(20, |i, _| x[(i, 0)]);
        let fit = InteractionModel.fit(&x, &y).unwrap();

        let err = fit.predict(&uniform_features(&mut rng, 5, 2, 0.0)).unwrap_err();
        assert_eq!(err, ModelError::FeatureCountMismatch { expected: 3, got: 2 });
    }

    #[test]
    fn interaction_with_one_feature_matches_additive() {
        let x = DMatrix::from_row_slice(4, 1, &[0.1, 0.2, 0.5, 0.9]);
        let y = DVector::from_row_slice(&[0.3, 0.35, 0.6, 0.8]);
        let inter = InteractionModel.fit(&x, &y).unwrap();
        let add = AdditiveModel.fit(&x, &y).unwrap();
        let a = inter.coefficients();
        let b = add.coefficients();
        assert_eq!(a.coefficients.len(), 1);
        assert!((a.intercept - b.intercept).abs() < 1e-12);
        assert!((a.coefficients[0] - b.coefficients[0]).abs() < 1e-12);
    }

    #[test]
    fn multiplicative_recovers_unit_elasticities() {
        let mut rng = StdRng::seed_from_u64(42);
        let noise = Normal::<f64>::new(0.0, 0.01).unwrap();
        let x = uniform_features(&mut rng, 100, 2, 0.1);
        let y = DVector::from_fn(100, |i, _| {
            x[(i, 0)] * x[(i, 1)] * noise.sample(&mut rng).exp()
        });

        let fit = MultiplicativeModel::new().fit(&x, &y).unwrap();
        let el = fit.elasticities().unwrap();
        assert_eq!(el.elasticities.len(), 2);
        assert!((el.elasticities[0] - 1.0).abs() < 0.1);
        assert!((el.elasticities[1] - 1.0).abs() < 0.1);
        assert!(fit.score(&x, &y).unwrap() > 0.95);
    }

    #[test]
    fn multiplicative_exact_product_is_reproduced() {
        let mut rng = StdRng::seed_from_u64(3);
        let x = uniform_features(&mut rng, 40, 3, 0.2);
        let y = DVector::from_fn(40, |i, _| x[(i, 0)] * x[(i, 1)] * x[(i, 2)]);

        let fit = MultiplicativeModel::new().fit(&x, &y).unwrap();
        for e in fit.elasticities().unwrap().elasticities {
            assert!((e - 1.0).abs() < 1e-6);
        }
        let pred = fit.predict(&x).unwrap();
        for (p, t) in pred.iter().zip(y.iter()) {
            assert!((p - t).abs() < 1e-6);
        }
    }

    #[test]
    fn multiplicative_uses_fit_time_epsilon() {
        let x = DMatrix::from_row_slice(4, 1, &[0.0, 0.2, 0.5, 0.9]);
        let y = DVector::from_row_slice(&[0.1, 0.2, 0.5, 0.9]);
        let model = MultiplicativeModel::with_epsilon(1e-3).unwrap();
        let fit = model.fit(&x, &y).unwrap();
        assert_eq!(fit.transform(), FeatureTransform::LogShift { epsilon: 1e-3 });
        assert!(fit.predict(&x).unwrap().iter().all(|v| v.is_finite() && *v > 0.0));
    }

    #[test]
    fn multiplicative_rejects_negative_inputs_and_bad_epsilon() {
        let x = DMatrix::from_row_slice(3, 1, &[0.2, -0.5, 0.9]);
        let y = DVector::from_row_slice(&[0.1, 0.2, 0.5]);
        let err = MultiplicativeModel::new().fit(&x, &y).unwrap_err();
        assert!(matches!(err, ModelError::LogDomain { row: 1, col: 0, .. }));

        assert!(MultiplicativeModel::with_epsilon(0.0).is_err());
        assert!(MultiplicativeModel::with_epsilon(f64::NAN).is_err());
    }

    #[test]
    fn elasticities_require_log_linear_fit() {
        let x = DMatrix::from_row_slice(3, 1, &[0.1, 0.2, 0.3]);
        let y = DVector::from_row_slice(&[0.1, 0.2, 0.3]);
        let fit = AdditiveModel.fit(&x, &y).unwrap();
        assert_eq!(fit.elasticities().unwrap_err(), ModelError::NotLogLinear("Additive"));
    }

    #[test]
    fn every_variant_rejects_mismatched_rows() {
        let x = DMatrix::<f64>::from_element(4, 2, 0.5);
        let y = DVector::<f64>::from_element(3, 0.5);
        for kind in ModelKind::ALL {
            let err = kind.fit(&x, &y).unwrap_err();
            assert_eq!(err, ModelError::RowCountMismatch { x_rows: 4, y_len: 3 });
        }
    }

    #[test]
    fn empty_input_is_a_shape_error() {
        let x = DMatrix::<f64>::zeros(0, 2);
        let y = DVector::<f64>::zeros(0);
        assert!(matches!(AdditiveModel.fit(&x, &y), Err(ModelError::EmptyInput(_))));
    }

    #[test]
    fn non_finite_data_fails_fast_for_every_variant() {
        let mut x = DMatrix::from_row_slice(4, 2, &[0.1, 0.9, 0.4, 0.2, f64::NAN, 0.5, 0.9, 0.8]);
        let y = DVector::from_row_slice(&[0.3, 0.35, 0.6, 0.8]);
        let bad_factor = ModelError::NonFiniteFactor { row: 2, col: 0 };
        assert_eq!(AdditiveModel.fit(&x, &y).unwrap_err(), bad_factor);
        assert_eq!(InteractionModel.fit(&x, &y).unwrap_err(), bad_factor);
        assert_eq!(MultiplicativeModel::new().fit(&x, &y).unwrap_err(), bad_factor);

        x[(2, 0)] = 0.7;
        let mut y = y;
        y[1] = f64::NEG_INFINITY;
        assert_eq!(AdditiveModel.fit(&x, &y).unwrap_err(), ModelError::NonFiniteTarget { row: 1 });
    }
}
