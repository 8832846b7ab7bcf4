//! Feature transforms applied before the linear solve.
//!
//! - pairwise interactions: append `x_i * x_j` for every `i < j`
//! - shifted log: `ln(x + ε)`, used on both features and target of the
//!   multiplicative model
//!
//! Both are deterministic functions of their input, so applying them at
//! predict time reproduces the fit-time design exactly.

use nalgebra::{DMatrix, DVector};

use crate::error::ModelError;

/// Number of interaction columns generated for `n_features` raw columns.
pub fn interaction_count(n_features: usize) -> usize {
    n_features * n_features.saturating_sub(1) / 2
}

/// Column pairs `(i, j)` with `i < j`, in lexicographic order.
pub fn interaction_pairs(n_features: usize) -> Vec<(usize, usize)> {
    let mut out = Vec::with_capacity(interaction_count(n_features));
    for i in 0..n_features {
        for j in (i + 1)..n_features {
            out.push((i, j));
        }
    }
    out
}

/// Append pairwise products to `x`, original columns first.
///
/// With fewer than two columns there is nothing to pair, and the matrix is
/// returned unaugmented.
pub fn add_pairwise_interactions(x: &DMatrix<f64>) -> DMatrix<f64> {
    let p = x.ncols();
    let pairs = interaction_pairs(p);
    if pairs.is_empty() {
        return x.clone();
    }

    DMatrix::from_fn(x.nrows(), p + pairs.len(), |r, c| {
        if c < p {
            x[(r, c)]
        } else {
            let (i, j) = pairs[c - p];
            x[(r, i)] * x[(r, j)]
        }
    })
}

/// Elementwise `ln(x + ε)` over a matrix.
///
/// Zero becomes `ln ε` (a large negative number). Values with `x + ε <= 0`
/// have no logarithm and are reported instead of turning into NaN.
pub fn log_shift_matrix(x: &DMatrix<f64>, epsilon: f64) -> Result<DMatrix<f64>, ModelError> {
    let mut out = DMatrix::zeros(x.nrows(), x.ncols());
    for r in 0..x.nrows() {
        for c in 0..x.ncols() {
            out[(r, c)] = log_shift(x[(r, c)], epsilon).ok_or(ModelError::LogDomain {
                row: r,
                col: c,
                value: x[(r, c)],
            })?;
        }
    }
    Ok(out)
}

/// Elementwise `ln(y + ε)` over a vector (the target column).
pub fn log_shift_vector(y: &DVector<f64>, epsilon: f64) -> Result<DVector<f64>, ModelError> {
    let mut out = DVector::zeros(y.len());
    for (i, &v) in y.iter().enumerate() {
        out[i] = log_shift(v, epsilon).ok_or(ModelError::LogDomain {
            row: i,
            col: 0,
            value: v,
        })?;
    }
    Ok(out)
}

fn log_shift(value: f64, epsilon: f64) -> Option<f64> {
    let shifted = value + epsilon;
    if shifted > 0.0 && shifted.is_finite() {
        Some(shifted.ln())
    } else {
        None
    }
}

/// Count entries that are exactly zero (they land on `ln ε`).
pub fn count_zeros<'a>(values: impl IntoIterator<Item = &'a f64>) -> usize {
    values.into_iter().filter(|v| **v == 0.0).count()
}
