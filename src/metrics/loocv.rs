//! Leave-one-out cross-validation.
//!
//! For each row `i`, a fresh estimator from the factory is fitted on every
//! other row and used to predict row `i`. The `n` out-of-sample predictions
//! are then scored against the observed target as one vector.
//!
//! Folds share nothing but the (read-only) input matrices, so they run in
//! parallel; results are collected in row order.

use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;
use serde::Serialize;

use crate::error::ModelError;
use crate::math::check_shapes;
use crate::metrics::{mae, r2, rmse};
use crate::models::Regressor;

/// Out-of-sample scores and the predictions they were computed from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoocvResult {
    pub r2_loocv: f64,
    pub rmse_loocv: f64,
    pub mae_loocv: f64,
    /// Prediction for row `i` from the model fitted without row `i`.
    pub predictions: Vec<f64>,
    pub actuals: Vec<f64>,
}

impl LoocvResult {
    pub fn n_folds(&self) -> usize {
        self.predictions.len()
    }
}

/// Run LOOCV with one freshly built estimator per fold.
pub fn loocv<F, R>(factory: F, x: &DMatrix<f64>, y: &DVector<f64>) -> Result<LoocvResult, ModelError>
where
    F: Fn() -> R + Sync,
    R: Regressor,
{
    check_shapes(x, y)?;
    let n = y.len();
    if n < 2 {
        return Err(ModelError::TooFewObservations { needed: 2, got: n });
    }

    let predictions: Vec<f64> = (0..n)
        .into_par_iter()
        .map(|i| {
            let x_train = x.clone().remove_row(i);
            let y_train = y.clone().remove_row(i);
            let x_test = x.rows(i, 1).into_owned();

            let fitted = factory().fit(&x_train, &y_train)?;
            let pred = fitted.predict(&x_test)?;
            Ok(pred[0])
        })
        .collect::<Result<Vec<f64>, ModelError>>()?;

    let actuals: Vec<f64> = y.iter().copied().collect();

    let non_finite = predictions.iter().filter(|p| !p.is_finite()).count();
    if non_finite > 0 {
        log::warn!("LOOCV produced {non_finite} non-finite prediction(s) out of {n}");
    }

    let result = LoocvResult {
        r2_loocv: r2(&actuals, &predictions)?,
        rmse_loocv: rmse(&actuals, &predictions)?,
        mae_loocv: mae(&actuals, &predictions)?,
        predictions,
        actuals,
    };

    log::debug!(
        "LOOCV over {n} folds: r2={:.4}, rmse={:.4}, mae={:.4}",
        result.r2_loocv,
        result.rmse_loocv,
        result.mae_loocv
    );

    Ok(result)
}
