//! Sigma point generation
//!
//! Points are spread along the columns of the lower Cholesky factor `L` of
//! the covariance, `P = L L^T`.

use crate::error::{Result, SmootherError};
use crate::types::{Matrix, Vector};

/// Weighted point set representing `N(mean, cov)`
#[derive(Clone, Debug)]
pub struct SigmaPoints {
    pub points: Vec<Vector>,
    pub mean_weights: Vec<f64>,
    pub cov_weights: Vec<f64>,
}

pub trait SigmaPointMethod {
    fn sigma_points(&self, mean: &Vector, cov: &Matrix) -> Result<SigmaPoints>;
}

/// Third degree spherical cubature rule
///
/// `2n` points `mean +- sqrt(n) L e_i`, all with weight `1 / (2n)`.
#[derive(Clone, Copy, Debug, Default)]
pub struct SphericalCubature;

impl SigmaPointMethod for SphericalCubature {
    fn sigma_points(&self, mean: &Vector, cov: &Matrix) -> Result<SigmaPoints> {
        let dim = mean.len();
        let sqrt_cov = lower_cholesky(cov)? * (dim as f64).sqrt();
        let points = symmetric_points(mean, &sqrt_cov);
        let weight = 1.0 / (2 * dim) as f64;
        Ok(SigmaPoints {
            mean_weights: vec![weight; points.len()],
            cov_weights: vec![weight; points.len()],
            points,
        })
    }
}

/// Scaled unscented transform with `2n + 1` points
#[derive(Clone, Copy, Debug)]
pub struct UnscentedTransform {
    /// Spread of the points around the mean
    pub alpha: f64,
    /// Prior knowledge of the distribution (2 is optimal for Gaussians)
    pub beta: f64,
    pub kappa: f64,
}

impl UnscentedTransform {
    pub fn new(alpha: f64, beta: f64, kappa: f64) -> Self {
        Self { alpha, beta, kappa }
    }

    fn lambda(&self, dim: usize) -> f64 {
        self.alpha * self.alpha * (dim as f64 + self.kappa) - dim as f64
    }
}

impl Default for UnscentedTransform {
    fn default() -> Self {
        Self::new(1.0, 0.0, 0.0)
    }
}

impl SigmaPointMethod for UnscentedTransform {
    fn sigma_points(&self, mean: &Vector, cov: &Matrix) -> Result<SigmaPoints> {
        let dim = mean.len();
        let lambda = self.lambda(dim);
        let scale = dim as f64 + lambda;
        if scale <= 0.0 {
            return Err(SmootherError::InvalidParameters(format!(
                "unscented transform scale n + lambda = {scale} must be positive"
            )));
        }
        let sqrt_cov = lower_cholesky(cov)? * scale.sqrt();

        let mut points = Vec::with_capacity(2 * dim + 1);
        points.push(mean.clone());
        points.extend(symmetric_points(mean, &sqrt_cov));

        let side_weight = 1.0 / (2.0 * scale);
        let mut mean_weights = vec![side_weight; 2 * dim + 1];
        let mut cov_weights = mean_weights.clone();
        mean_weights[0] = lambda / scale;
        cov_weights[0] = lambda / scale + (1.0 - self.alpha * self.alpha + self.beta);

        Ok(SigmaPoints {
            points,
            mean_weights,
            cov_weights,
        })
    }
}

/// Lower triangular `L` with `cov = L L^T`
pub fn lower_cholesky(cov: &Matrix) -> Result<Matrix> {
    cov.clone()
        .cholesky()
        .map(|chol| chol.l())
        .ok_or_else(|| SmootherError::NotPositiveDefinite(format!("{}x{} sigma point covariance", cov.nrows(), cov.ncols())))
}

// mean + column i, then mean - column i
fn symmetric_points(mean: &Vector, sqrt_cov: &Matrix) -> Vec<Vector> {
    let plus = sqrt_cov.column_iter().map(|col| mean + col);
    let minus = sqrt_cov.column_iter().map(|col| mean - col);
    plus.chain(minus).collect()
}
