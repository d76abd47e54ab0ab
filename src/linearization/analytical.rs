/// Extended (first order Taylor) linearization
use super::{LinearParams, Linearizer};
use crate::error::Result;
use crate::models::Differentiable;
use crate::types::{Matrix, Vector};

/// `A = J(mean)`, `b = f(mean) - A mean`, `Omega = 0`
#[derive(Clone, Copy, Debug, Default)]
pub struct Analytical;

impl<M: Differentiable + ?Sized> Linearizer<M> for Analytical {
    fn linearize(&self, model: &M, mean: &Vector, _cov: &Matrix, time_step: usize) -> Result<(Vector, LinearParams)> {
        let z_bar = model.mapping(mean, time_step);
        let a = model.jacobian(mean, time_step);
        let b = &z_bar - &a * mean;
        let omega = Matrix::zeros(z_bar.len(), z_bar.len());
        Ok((z_bar, LinearParams { a, b, omega }))
    }

    fn mapped_mean(&self, model: &M, mean: &Vector, _cov: &Matrix, time_step: usize) -> Result<Vector> {
        Ok(model.mapping(mean, time_step))
    }

    fn uses_covariance(&self) -> bool {
        false
    }
}
