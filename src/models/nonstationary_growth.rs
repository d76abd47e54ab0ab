/// Univariate non-stationary growth model
///
/// `x_{k+1} = alpha x_k + beta x_k / (1 + x_k^2) + gamma cos(delta k)`
use super::{Differentiable, Model, MotionModel};
use crate::types::{Matrix, Vector};

#[derive(Clone, Debug)]
pub struct NonStationaryGrowth {
    alpha: f64,
    beta: f64,
    gamma: f64,
    delta: f64,
    proc_noise: Matrix,
}

impl NonStationaryGrowth {
    pub fn new(alpha: f64, beta: f64, gamma: f64, delta: f64, proc_noise: f64) -> Self {
        Self {
            alpha,
            beta,
            gamma,
            delta,
            proc_noise: Matrix::from_element(1, 1, proc_noise),
        }
    }
}

impl Model for NonStationaryGrowth {
    fn mapping(&self, state: &Vector, time_step: usize) -> Vector {
        let forcing = self.gamma * (self.delta * time_step as f64).cos();
        state.map(|x| self.alpha * x + self.beta * x / (1.0 + x * x) + forcing)
    }
}

impl MotionModel for NonStationaryGrowth {
    fn proc_noise(&self, _time_step: usize) -> Matrix {
        self.proc_noise.clone()
    }
}

impl Differentiable for NonStationaryGrowth {
    fn jacobian(&self, state: &Vector, _time_step: usize) -> Matrix {
        let diag = state.map(|x| {
            let x_sq = x * x;
            self.alpha + self.beta * (1.0 - x_sq) / (1.0 + x_sq).powi(2)
        });
        Matrix::from_diagonal(&diag)
    }
}
