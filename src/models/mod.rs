//! Motion and measurement models
//!
//! Models are assumed to be on the form
//!
//! ```text
//! x_{k+1} = f_k(x_k) + q_k,  q_k ~ N(0, Q_k),  k = 1, ..., K-1
//! y_k     = h_k(x_k) + r_k,  r_k ~ N(0, R_k),  k = 1, ..., K
//! ```
//!
//! A transition is parameterised by the time step of its source state.
//! Models are pure: calling them never mutates anything.

pub mod affine;
pub mod coord_turn;
pub mod nonstationary_growth;
pub mod polynomial;
pub mod range_bearing;

pub use affine::AffineModel;
pub use coord_turn::CoordTurn;
pub use nonstationary_growth::NonStationaryGrowth;
pub use polynomial::{Cubic, Quadratic};
pub use range_bearing::{to_cartesian_coords, MultiSensorBearings, MultiSensorRange, RangeBearing};

use crate::types::{Matrix, Vector};

/// A (possibly time dependent) nonlinear mapping
pub trait Model {
    /// Map a single state
    fn mapping(&self, state: &Vector, time_step: usize) -> Vector;

    /// Map a set of states at the same time step
    fn map_set(&self, states: &[Vector], time_step: usize) -> Vec<Vector> {
        states.iter().map(|s| self.mapping(s, time_step)).collect()
    }
}

/// Model with an analytical Jacobian, required by the extended (analytical) linearization
pub trait Differentiable: Model {
    fn jacobian(&self, state: &Vector, time_step: usize) -> Matrix;
}

pub trait MotionModel: Model {
    /// Process noise covariance Q_k
    fn proc_noise(&self, time_step: usize) -> Matrix;
}

pub trait MeasModel: Model {
    /// Measurement noise covariance R_k
    fn meas_noise(&self, time_step: usize) -> Matrix;
}

impl<T: Model + ?Sized> Model for &T {
    fn mapping(&self, state: &Vector, time_step: usize) -> Vector {
        (**self).mapping(state, time_step)
    }
}

impl<T: Differentiable + ?Sized> Differentiable for &T {
    fn jacobian(&self, state: &Vector, time_step: usize) -> Matrix {
        (**self).jacobian(state, time_step)
    }
}

impl<T: MotionModel + ?Sized> MotionModel for &T {
    fn proc_noise(&self, time_step: usize) -> Matrix {
        (**self).proc_noise(time_step)
    }
}

impl<T: MeasModel + ?Sized> MeasModel for &T {
    fn meas_noise(&self, time_step: usize) -> Matrix {
        (**self).meas_noise(time_step)
    }
}

/// Central finite difference Jacobian, used to check analytical Jacobians in tests
#[cfg(test)]
pub(crate) fn numerical_jacobian<M: Model>(model: &M, state: &Vector, time_step: usize) -> Matrix {
    let eps = 1e-6;
    let out_dim = model.mapping(state, time_step).len();
    let mut jac = Matrix::zeros(out_dim, state.len());
    for j in 0..state.len() {
        let mut plus = state.clone();
        let mut minus = state.clone();
        plus[j] += eps;
        minus[j] -= eps;
        let diff = (model.mapping(&plus, time_step) - model.mapping(&minus, time_step)) / (2.0 * eps);
        jac.set_column(j, &diff);
    }
    jac
}
