use thiserror::Error;

/// Errors raised by the model/metrics/diagnostic layer.
///
/// All of these are caller mistakes or degenerate inputs. Nothing is retried:
/// the computations are deterministic, so a retry would fail the same way.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("dimension mismatch: X has {x_rows} rows but y has {y_len} elements")]
    RowCountMismatch { x_rows: usize, y_len: usize },

    #[error("model was fitted on {expected} feature columns but received {got}")]
    FeatureCountMismatch { expected: usize, got: usize },

    #[error("length mismatch: {left} vs {right} elements")]
    LengthMismatch { left: usize, right: usize },

    #[error("factor index {index} is out of range for {len} factors")]
    FactorIndexOutOfRange { index: usize, len: usize },

    #[error("expected {expected} factor names, got {got}")]
    FactorNameCountMismatch { expected: usize, got: usize },

    #[error("unknown factor label '{0}'")]
    UnknownFactor(String),

    #[error("elasticities are only defined for the multiplicative model (got {0})")]
    NotLogLinear(&'static str),

    #[error("epsilon must be finite and > 0 (got {0})")]
    InvalidEpsilon(f64),

    #[error("non-finite factor value at row {row}, column {col}")]
    NonFiniteFactor { row: usize, col: usize },

    #[error("non-finite target value at row {row}")]
    NonFiniteTarget { row: usize },

    #[error("empty input: {0}")]
    EmptyInput(&'static str),

    #[error("insufficient observations: need at least {needed}, got {got}")]
    TooFewObservations { needed: usize, got: usize },

    #[error("log transform undefined at row {row}, column {col}: value {value} + epsilon is not positive")]
    LogDomain { row: usize, col: usize, value: f64 },

    #[error("least squares solve failed (design matrix too ill-conditioned)")]
    SolveFailed,
}

impl ModelError {
    /// Exit code used when this error terminates the binary.
    ///
    /// - 2: usage (shape/contract violations by the caller)
    /// - 3: missing or unusable data
    /// - 4: numeric failure
    pub fn exit_code(&self) -> u8 {
        match self {
            ModelError::EmptyInput(_)
            | ModelError::TooFewObservations { .. }
            | ModelError::NonFiniteFactor { .. }
            | ModelError::NonFiniteTarget { .. } => 3,
            ModelError::LogDomain { .. } | ModelError::SolveFailed => 4,
            _ => 2,
        }
    }
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<ModelError> for AppError {
    fn from(err: ModelError) -> Self {
        AppError::new(err.exit_code(), err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_errors_map_to_exit_codes() {
        let usage: AppError = ModelError::RowCountMismatch { x_rows: 3, y_len: 2 }.into();
        assert_eq!(usage.exit_code(), 2);
        assert!(usage.to_string().contains("3 rows"));

        let shape: AppError = ModelError::EmptyInput("feature matrix").into();
        assert_eq!(shape.exit_code(), 3);

        let nan: AppError = ModelError::NonFiniteTarget { row: 4 }.into();
        assert_eq!(nan.exit_code(), 3);
        assert!(nan.to_string().contains("row 4"));

        let numeric: AppError = ModelError::SolveFailed.into();
        assert_eq!(numeric.exit_code(), 4);
    }
}
