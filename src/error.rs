use thiserror::Error;

/// Smoother error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SmootherError {
    #[error("Dimension mismatch for {context}: expected {expected}, got {actual}")]
    DimensionMismatch {
        context: String,
        expected: usize,
        actual: usize,
    },

    #[error("Singular matrix: {0}")]
    SingularMatrix(String),

    #[error("Matrix not positive definite: {0}")]
    NotPositiveDefinite(String),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),
}

/// Result type for smoother operations
pub type Result<T> = std::result::Result<T, SmootherError>;

/// Invert a matrix or report which one was singular
pub(crate) fn try_inverse(matrix: &nalgebra::DMatrix<f64>, context: &str) -> Result<nalgebra::DMatrix<f64>> {
    matrix
        .clone()
        .try_inverse()
        .ok_or_else(|| SmootherError::SingularMatrix(context.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::DMatrix;

    #[test]
    fn test_display() {
        let err = SmootherError::DimensionMismatch {
            context: "measurement".to_string(),
            expected: 2,
            actual: 3,
        };
        assert_eq!(err.to_string(), "Dimension mismatch for measurement: expected 2, got 3");
    }

    #[test]
    fn test_try_inverse_singular() {
        let m = DMatrix::<f64>::zeros(2, 2);
        assert_eq!(
            try_inverse(&m, "innovation covariance"),
            Err(SmootherError::SingularMatrix("innovation covariance".to_string()))
        );
    }
}
