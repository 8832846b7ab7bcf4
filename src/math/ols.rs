//! Ordinary least squares with an intercept.
//!
//! Every model variant reduces to the same problem once its feature transform
//! has been applied:
//!
//! ```text
//! minimize Σ (y_i - β0 - x_i^T β)^2
//! ```
//!
//! Implementation choices:
//! - The intercept is an explicit column of ones prepended to the design matrix.
//! - We solve with SVD so tall, square, and (in LOOCV on tiny samples)
//!   underdetermined systems all go through one path. Nalgebra's `QR::solve`
//!   is intended for square systems and would panic otherwise.
//! - Parameter counts are tiny (a handful of columns), so SVD cost is negligible.

use nalgebra::{DMatrix, DVector};

use crate::error::ModelError;

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    // Collinear factor columns (e.g. a constant O) make the strict tolerance
    // fail, so relax it progressively before giving up.
    for &tol in &[1e-10, 1e-8, 1e-6] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

/// Intercept and per-column slopes of a fitted linear map.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearFit {
    pub intercept: f64,
    /// Slopes aligned index-for-index with the columns the fit was run on.
    pub coefficients: Vec<f64>,
}

impl LinearFit {
    /// Fit `y ≈ intercept + x · coefficients` by ordinary least squares.
    pub fn fit(x: &DMatrix<f64>, y: &DVector<f64>) -> Result<Self, ModelError> {
        check_shapes(x, y)?;

        let design = x.clone().insert_column(0, 1.0);
        let beta = solve_least_squares(&design, y).ok_or(ModelError::SolveFailed)?;

        Ok(Self {
            intercept: beta[0],
            coefficients: beta.iter().skip(1).copied().collect(),
        })
    }

    /// Apply the linear map to each row of `x`.
    pub fn predict(&self, x: &DMatrix<f64>) -> Result<DVector<f64>, ModelError> {
        if x.ncols() != self.coefficients.len() {
            return Err(ModelError::FeatureCountMismatch {
                expected: self.coefficients.len(),
                got: x.ncols(),
            });
        }

        let beta = DVector::from_column_slice(&self.coefficients);
        Ok((x * beta).add_scalar(self.intercept))
    }
}

/// Validate that `x` and `y` describe the same, non-empty set of finite observations.
///
/// The SVD never converges on NaN, so non-finite input has to be rejected here.
pub fn check_shapes(x: &DMatrix<f64>, y: &DVector<f64>) -> Result<(), ModelError> {
    if x.nrows() != y.len() {
        return Err(ModelError::RowCountMismatch {
            x_rows: x.nrows(),
            y_len: y.len(),
        });
    }
    if y.is_empty() {
        return Err(ModelError::EmptyInput("no observations to fit"));
    }
    for row in 0..x.nrows() {
        if let Some(col) = (0..x.ncols()).find(|&c| !x[(row, c)].is_finite()) {
            return Err(ModelError::NonFiniteFactor { row, col });
        }
    }
    if let Some(row) = y.iter().position(|v| !v.is_finite()) {
        return Err(ModelError::NonFiniteTarget { row });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn least_squares_solves_simple_system() {
        // Fit y = 2 + 3x on x = [0,1,2]
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let y = DVector::from_row_slice(&[2.0, 5.0, 8.0]);

        let beta = solve_least_squares(&x, &y).unwrap();
        assert!((beta[0] - 2.0).abs() < 1e-10);
        assert!((beta[1] - 3.0).abs() < 1e-10);
    }

    #[test]
    fn linear_fit_recovers_intercept_and_slopes() {
        // y = 0.5 + 0.3 a + 0.4 b
        let rows = [[0.1, 0.9], [0.4, 0.2], [0.7, 0.5], [0.9, 0.8], [0.3, 0.6]];
        let x = DMatrix::from_fn(rows.len(), 2, |i, j| rows[i][j]);
        let y = DVector::from_fn(rows.len(), |i, _| 0.5 + 0.3 * rows[i][0] + 0.4 * rows[i][1]);

        let fit = LinearFit::fit(&x, &y).unwrap();
        assert!((fit.intercept - 0.5).abs() < 1e-9);
        assert!((fit.coefficients[0] - 0.3).abs() < 1e-9);
        assert!((fit.coefficients[1] - 0.4).abs() < 1e-9);

        let pred = fit.predict(&x).unwrap();
        for (p, t) in pred.iter().zip(y.iter()) {
            assert!((p - t).abs() < 1e-9);
        }
    }

    #[test]
    fn intercept_only_fit_is_the_mean() {
        let x = DMatrix::<f64>::zeros(4, 0);
        let y = DVector::from_row_slice(&[1.0, 2.0, 3.0, 6.0]);
        let fit = LinearFit::fit(&x, &y).unwrap();
        assert!(fit.coefficients.is_empty());
        assert!((fit.intercept - 3.0).abs() < 1e-12);
    }

    #[test]
    fn mismatched_rows_are_rejected() {
        let x = DMatrix::<f64>::zeros(3, 1);
        let y = DVector::from_row_slice(&[1.0, 2.0]);
        let err = LinearFit::fit(&x, &y).unwrap_err();
        assert_eq!(err, ModelError::RowCountMismatch { x_rows: 3, y_len: 2 });
    }

    #[test]
    fn non_finite_inputs_are_rejected_before_solving() {
        let y = DVector::from_row_slice(&[1.0, 2.0, 3.0, 4.0]);
        let mut x = DMatrix::from_row_slice(4, 2, &[0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8]);
        x[(2, 1)] = f64::NAN;
        assert_eq!(
            LinearFit::fit(&x, &y).unwrap_err(),
            ModelError::NonFiniteFactor { row: 2, col: 1 }
        );

        x[(2, 1)] = 0.6;
        x[(0, 0)] = f64::NEG_INFINITY;
        assert_eq!(
            LinearFit::fit(&x, &y).unwrap_err(),
            ModelError::NonFiniteFactor { row: 0, col: 0 }
        );

        x[(0, 0)] = 0.1;
        let mut y = y;
        y[3] = f64::INFINITY;
        assert_eq!(LinearFit::fit(&x, &y).unwrap_err(), ModelError::NonFiniteTarget { row: 3 });
        y[3] = f64::NAN;
        assert_eq!(LinearFit::fit(&x, &y).unwrap_err(), ModelError::NonFiniteTarget { row: 3 });
    }

    #[test]
    fn predict_rejects_wrong_column_count() {
        let fit = LinearFit {
            intercept: 0.0,
            coefficients: vec![1.0, 2.0],
        };
        let err = fit.predict(&DMatrix::<f64>::zeros(2, 3)).unwrap_err();
        assert_eq!(err, ModelError::FeatureCountMismatch { expected: 2, got: 3 });
    }
}
