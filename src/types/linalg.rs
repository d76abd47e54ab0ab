//! Linear algebra type system for the smoothers
//!
//! State and measurement dimensions are only known at run time (they come
//! from the models), so everything is built on nalgebra's dynamic types.

use nalgebra::{DMatrix, DVector};

/// State or measurement vector
pub type Vector = DVector<f64>;

/// Covariance, Jacobian or gain matrix
pub type Matrix = DMatrix<f64>;

/// Force symmetry of a covariance matrix: `(P + P^T) / 2`
pub fn symmetrize(cov: &Matrix) -> Matrix {
    (cov + cov.transpose()) * 0.5
}

/// A measurement is missing when any of its components is NaN
pub fn is_missing(measurement: &Vector) -> bool {
    measurement.iter().any(|v| v.is_nan())
}

/// Quadratic form `r^T W r`
pub fn weighted_sq_norm(residual: &Vector, weight: &Matrix) -> f64 {
    residual.dot(&(weight * residual))
}
