//! Element-wise polynomial measurement models

use super::{Differentiable, MeasModel, Model};
use crate::types::{Matrix, Vector};

/// `y = c x^2`, element-wise
#[derive(Clone, Debug)]
pub struct Quadratic {
    coeff: f64,
    meas_noise: Matrix,
}

impl Quadratic {
    pub fn new(coeff: f64, meas_noise: Matrix) -> Self {
        Self { coeff, meas_noise }
    }
}

impl Model for Quadratic {
    fn mapping(&self, state: &Vector, _time_step: usize) -> Vector {
        state.map(|x| self.coeff * x * x)
    }
}

impl MeasModel for Quadratic {
    fn meas_noise(&self, _time_step: usize) -> Matrix {
        self.meas_noise.clone()
    }
}

impl Differentiable for Quadratic {
    fn jacobian(&self, state: &Vector, _time_step: usize) -> Matrix {
        Matrix::from_diagonal(&state.map(|x| 2.0 * self.coeff * x))
    }
}

/// `y = c x^3`, element-wise
#[derive(Clone, Debug)]
pub struct Cubic {
    coeff: f64,
    meas_noise: Matrix,
}

impl Cubic {
    pub fn new(coeff: f64, meas_noise: Matrix) -> Self {
        Self { coeff, meas_noise }
    }
}

impl Model for Cubic {
    fn mapping(&self, state: &Vector, _time_step: usize) -> Vector {
        state.map(|x| self.coeff * x.powi(3))
    }
}

impl MeasModel for Cubic {
    fn meas_noise(&self, _time_step: usize) -> Matrix {
        self.meas_noise.clone()
    }
}

impl Differentiable for Cubic {
    fn jacobian(&self, state: &Vector, _time_step: usize) -> Matrix {
        Matrix::from_diagonal(&state.map(|x| 3.0 * self.coeff * x * x))
    }
}
