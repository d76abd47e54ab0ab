//! Statistical linear regression
//!
//! For `z = f(x)`, `x ~ N(mean, cov)` the SLR moments are
//!
//! ```text
//! z_bar = E[z],  Psi = Cov[x, z],  Phi = Cov[z, z]
//! ```
//!
//! and the best affine fit in the mean square sense is
//! `A = Psi^T cov^-1`, `b = z_bar - A mean`, `Omega = Phi - A cov A^T`.

use super::sigma_points::{SigmaPointMethod, SphericalCubature};
use super::{LinearParams, Linearizer};
use crate::error::{try_inverse, Result};
use crate::models::Model;
use crate::types::{symmetrize, Matrix, Vector};

/// SLR moments of a mapping
#[derive(Clone, Debug)]
pub struct SlrMoments {
    pub z_bar: Vector,
    /// `Cov[x, z]`, `D_x x D_z`
    pub psi: Matrix,
    /// `Cov[z, z]`, `D_z x D_z`
    pub phi: Matrix,
}

/// Estimator of SLR moments
pub trait Slr {
    fn slr<M: Model + ?Sized>(&self, model: &M, mean: &Vector, cov: &Matrix, time_step: usize) -> Result<SlrMoments>;

    /// Same `z_bar` as `slr` but without the covariances
    fn calc_z_bar<M: Model + ?Sized>(&self, model: &M, mean: &Vector, cov: &Matrix, time_step: usize) -> Result<Vector>;
}

/// Affine parameters from SLR moments
pub fn linear_params_from_slr(mean: &Vector, cov: &Matrix, moments: &SlrMoments) -> Result<LinearParams> {
    let cov_inv = try_inverse(cov, "SLR prior covariance")?;
    let a = moments.psi.transpose() * cov_inv;
    let b = &moments.z_bar - &a * mean;
    let omega = symmetrize(&(&moments.phi - &a * cov * a.transpose()));
    Ok(LinearParams { a, b, omega })
}

/// Linearize with any SLR estimator
pub(crate) fn slr_linearize<S, M>(
    estimator: &S,
    model: &M,
    mean: &Vector,
    cov: &Matrix,
    time_step: usize,
) -> Result<(Vector, LinearParams)>
where
    S: Slr + ?Sized,
    M: Model + ?Sized,
{
    let moments = estimator.slr(model, mean, cov, time_step)?;
    let params = linear_params_from_slr(mean, cov, &moments)?;
    Ok((moments.z_bar, params))
}

/// SLR with moments estimated from a sigma point rule
#[derive(Clone, Copy, Debug, Default)]
pub struct SigmaPointSlr<S = SphericalCubature> {
    method: S,
}

impl SigmaPointSlr<SphericalCubature> {
    pub fn cubature() -> Self {
        Self::new(SphericalCubature)
    }
}

impl<S: SigmaPointMethod> SigmaPointSlr<S> {
    pub fn new(method: S) -> Self {
        Self { method }
    }

    pub fn method(&self) -> &S {
        &self.method
    }
}

impl<S: SigmaPointMethod> Slr for SigmaPointSlr<S> {
    fn slr<M: Model + ?Sized>(&self, model: &M, mean: &Vector, cov: &Matrix, time_step: usize) -> Result<SlrMoments> {
        let sp = self.method.sigma_points(mean, cov)?;
        let mapped = model.map_set(&sp.points, time_step);
        let z_bar = weighted_mean(&mapped, &sp.mean_weights);

        let (dim_x, dim_z) = (mean.len(), z_bar.len());
        let mut psi = Matrix::zeros(dim_x, dim_z);
        let mut phi = Matrix::zeros(dim_z, dim_z);
        for ((x, z), w) in sp.points.iter().zip(&mapped).zip(&sp.cov_weights) {
            let x_diff = x - mean;
            let z_diff = z - &z_bar;
            psi += &x_diff * z_diff.transpose() * *w;
            phi += &z_diff * z_diff.transpose() * *w;
        }
        Ok(SlrMoments { z_bar, psi, phi })
    }

    fn calc_z_bar<M: Model + ?Sized>(&self, model: &M, mean: &Vector, cov: &Matrix, time_step: usize) -> Result<Vector> {
        let sp = self.method.sigma_points(mean, cov)?;
        Ok(weighted_mean(&model.map_set(&sp.points, time_step), &sp.mean_weights))
    }
}

impl<M: Model + ?Sized, S: SigmaPointMethod> Linearizer<M> for SigmaPointSlr<S> {
    fn linearize(&self, model: &M, mean: &Vector, cov: &Matrix, time_step: usize) -> Result<(Vector, LinearParams)> {
        slr_linearize(self, model, mean, cov, time_step)
    }

    fn mapped_mean(&self, model: &M, mean: &Vector, cov: &Matrix, time_step: usize) -> Result<Vector> {
        self.calc_z_bar(model, mean, cov, time_step)
    }
}

pub(crate) fn weighted_mean(points: &[Vector], weights: &[f64]) -> Vector {
    let dim = points.first().map_or(0, |p| p.len());
    points
        .iter()
        .zip(weights)
        .fold(Vector::zeros(dim), |acc, (p, w)| acc + p * *w)
}
