/// Coordinated turn motion model
///
/// State vector: [x, y, x' (dx/dt), y' (dy/dt), omega (turn rate)]
///
/// The transition is the exact discretisation of constant speed motion along
/// a circle with turn rate omega. The omega -> 0 limit (straight line) is
/// handled explicitly.
use super::{Differentiable, Model, MotionModel};
use crate::types::{Matrix, Vector};

pub const COORD_TURN_DIM: usize = 5;

#[derive(Clone, Debug)]
pub struct CoordTurn {
    /// Sampling period [s]
    dt: f64,
    proc_noise: Matrix,
}

impl CoordTurn {
    pub fn new(sampling_period: f64, proc_noise: Matrix) -> Self {
        Self {
            dt: sampling_period,
            proc_noise,
        }
    }

    /// Process noise used in the LM-IEKS paper experiments
    ///
    /// `qc` is the spectral density of the velocity noise, `qw` of the turn rate.
    pub fn paper_proc_noise(dt: f64, qc: f64, qw: f64) -> Matrix {
        let dt2 = dt * dt;
        let dt3 = dt2 * dt;
        #[rustfmt::skip]
        let q = Matrix::from_row_slice(5, 5, &[
            qc * dt3 / 3.0, 0.0,            qc * dt2 / 2.0, 0.0,            0.0,
            0.0,            qc * dt3 / 3.0, 0.0,            qc * dt2 / 2.0, 0.0,
            qc * dt2 / 2.0, 0.0,            qc * dt,        0.0,            0.0,
            0.0,            qc * dt2 / 2.0, 0.0,            qc * dt,        0.0,
            0.0,            0.0,            0.0,            0.0,            dt * qw,
        ]);
        q
    }

    pub fn sampling_period(&self) -> f64 {
        self.dt
    }
}

impl Model for CoordTurn {
    fn mapping(&self, state: &Vector, _time_step: usize) -> Vector {
        let dt = self.dt;
        let w = state[4];
        let (cos_wt, sin_wt) = ((w * dt).cos(), (w * dt).sin());
        // (cos(wt) - 1) / w and sin(wt) / w, with their w -> 0 limits
        let (cos_over_w, sin_over_w) = if w == 0.0 {
            (0.0, dt)
        } else {
            ((cos_wt - 1.0) / w, sin_wt / w)
        };

        #[rustfmt::skip]
        let f = Matrix::from_row_slice(5, 5, &[
            1.0, 0.0, sin_over_w, -cos_over_w, 0.0,
            0.0, 1.0, cos_over_w,  sin_over_w, 0.0,
            0.0, 0.0, cos_wt,      sin_wt,     0.0,
            0.0, 0.0, -sin_wt,     cos_wt,     0.0,
            0.0, 0.0, 0.0,         0.0,        1.0,
        ]);
        f * state
    }
}

impl MotionModel for CoordTurn {
    fn proc_noise(&self, _time_step: usize) -> Matrix {
        self.proc_noise.clone()
    }
}

impl Differentiable for CoordTurn {
    fn jacobian(&self, state: &Vector, _time_step: usize) -> Matrix {
        let dt = self.dt;
        let w = state[4];
        let (vx, vy) = (state[2], state[3]);

        let (cos_wt, sin_wt, cos_over_w, sin_over_w, d_sin_over_w, d_cos_over_w) = if w == 0.0 {
            (1.0, 0.0, 0.0, dt, 0.0, -0.5 * dt * dt)
        } else {
            let cos_wt = (w * dt).cos();
            let sin_wt = (w * dt).sin();
            let cos_m1 = cos_wt - 1.0;
            (
                cos_wt,
                sin_wt,
                cos_m1 / w,
                sin_wt / w,
                (w * dt * cos_wt - sin_wt) / (w * w),
                (-w * dt * sin_wt - cos_m1) / (w * w),
            )
        };

        let mut jac = Matrix::zeros(5, 5);
        jac[(0, 0)] = 1.0;
        jac[(0, 2)] = sin_over_w;
        jac[(0, 3)] = -cos_over_w;
        jac[(0, 4)] = d_sin_over_w * vx - d_cos_over_w * vy;
        jac[(1, 1)] = 1.0;
        jac[(1, 2)] = cos_over_w;
        jac[(1, 3)] = sin_over_w;
        jac[(1, 4)] = d_cos_over_w * vx + d_sin_over_w * vy;
        jac[(2, 2)] = cos_wt;
        jac[(2, 3)] = sin_wt;
        jac[(2, 4)] = -dt * sin_wt * vx + dt * cos_wt * vy;
        jac[(3, 2)] = -sin_wt;
        jac[(3, 3)] = cos_wt;
        jac[(3, 4)] = -dt * cos_wt * vx - dt * sin_wt * vy;
        jac[(4, 4)] = 1.0;
        jac
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::numerical_jacobian;
    use approx::assert_relative_eq;

    fn model() -> CoordTurn {
        CoordTurn::new(0.1, CoordTurn::paper_proc_noise(0.1, 0.01, 10.0))
    }

    #[test]
    fn test_straight_line_when_not_turning() {
        let state = Vector::from_vec(vec![0.0, 0.0, 1.0, 2.0, 0.0]);
        let next = model().mapping(&state, 1);
        assert_relative_eq!(next[0], 0.1, epsilon = 1e-12);
        assert_relative_eq!(next[1], 0.2, epsilon = 1e-12);
        assert_relative_eq!(next[2], 1.0, epsilon = 1e-12);
        assert_relative_eq!(next[3], 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_turn_preserves_speed() {
        let state = Vector::from_vec(vec![1.0, -1.0, 3.0, 4.0, 0.7]);
        let next = model().mapping(&state, 1);
        let speed = (next[2] * next[2] + next[3] * next[3]).sqrt();
        assert_relative_eq!(speed, 5.0, epsilon = 1e-12);
        assert_eq!(next[4], 0.7);
    }

    #[test]
    fn test_jacobian_matches_finite_differences() {
        let m = model();
        let state = Vector::from_vec(vec![0.5, -0.2, 1.3, 0.4, 0.9]);
        let analytical = m.jacobian(&state, 1);
        let numerical = numerical_jacobian(&m, &state, 1);
        assert_relative_eq!(analytical, numerical, epsilon = 1e-6);
    }

    #[test]
    fn test_jacobian_zero_turn_rate() {
        let m = model();
        let state = Vector::from_vec(vec![0.5, -0.2, 1.3, 0.4, 0.0]);
        let analytical = m.jacobian(&state, 1);
        let numerical = numerical_jacobian(&m, &state, 1);
        // (cos(wt) - 1) / w loses digits for tiny w
        assert_relative_eq!(analytical, numerical, epsilon = 1e-3);
    }

    #[test]
    fn test_paper_proc_noise_is_symmetric() {
        let q = CoordTurn::paper_proc_noise(0.01, 0.01, 10.0);
        assert_relative_eq!(q.clone(), q.transpose());
        assert_relative_eq!(q[(4, 4)], 0.1, epsilon = 1e-15);
    }
}
