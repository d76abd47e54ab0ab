//! Linearization strategies
//!
//! Every strategy approximates a model around a Gaussian `N(mean, cov)` by an
//! affine map with an error covariance:
//!
//! ```text
//! z = f(x) ~= A x + b + e,  e ~ N(0, Omega)
//! ```
//!
//! The analytical (extended) strategy ignores the covariance and sets
//! `Omega = 0`. The statistical linear regression (SLR) strategies fit the
//! affine map to moments of `f(x)` with `x ~ N(mean, cov)`.

pub mod analytical;
pub mod cache;
pub mod monte_carlo;
pub mod sigma_points;
pub mod slr;

pub use analytical::Analytical;
pub use cache::LinearizationCache;
pub use monte_carlo::MonteCarloSlr;
pub use sigma_points::{SigmaPointMethod, SigmaPoints, SphericalCubature, UnscentedTransform};
pub use slr::{linear_params_from_slr, SigmaPointSlr, Slr, SlrMoments};

use crate::error::Result;
use crate::models::Model;
use crate::types::{Matrix, Vector};

/// Affine approximation `(A, b, Omega)` of a model at one time step
#[derive(Clone, Debug, PartialEq)]
pub struct LinearParams {
    pub a: Matrix,
    pub b: Vector,
    pub omega: Matrix,
}

impl LinearParams {
    /// Evaluate the affine part `A x + b`
    pub fn apply(&self, state: &Vector) -> Vector {
        &self.a * state + &self.b
    }
}

/// A way of linearizing model `M`
pub trait Linearizer<M: Model + ?Sized> {
    /// Mapped mean `z_bar` together with the affine approximation
    fn linearize(&self, model: &M, mean: &Vector, cov: &Matrix, time_step: usize) -> Result<(Vector, LinearParams)>;

    /// Mapped mean `z_bar` only
    ///
    /// Analytical: `f(mean)`. SLR: `E[f(x)]`.
    fn mapped_mean(&self, model: &M, mean: &Vector, cov: &Matrix, time_step: usize) -> Result<Vector>;

    fn linear_params(&self, model: &M, mean: &Vector, cov: &Matrix, time_step: usize) -> Result<LinearParams> {
        self.linearize(model, mean, cov, time_step).map(|(_, params)| params)
    }

    /// Whether the strategy reads the covariance it linearizes around
    fn uses_covariance(&self) -> bool {
        true
    }
}

impl<M: Model + ?Sized, L: Linearizer<M> + ?Sized> Linearizer<M> for &L {
    fn linearize(&self, model: &M, mean: &Vector, cov: &Matrix, time_step: usize) -> Result<(Vector, LinearParams)> {
        (**self).linearize(model, mean, cov, time_step)
    }

    fn mapped_mean(&self, model: &M, mean: &Vector, cov: &Matrix, time_step: usize) -> Result<Vector> {
        (**self).mapped_mean(model, mean, cov, time_step)
    }

    fn uses_covariance(&self) -> bool {
        (**self).uses_covariance()
    }
}
