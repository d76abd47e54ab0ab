//! Linearization of a whole trajectory
//!
//! Iterated smoothers re-linearize both models around the previous iterate.
//! The cache holds everything derived from that linearization: the affine
//! parameters driving the next filter pass, plus the mapped means and
//! inverse inflated noise covariances which the cost function reuses.

use super::{LinearParams, Linearizer};
use crate::error::{try_inverse, Result, SmootherError};
use crate::models::{MeasModel, MotionModel};
use crate::types::{Matrix, Trajectory, Vector};

#[derive(Clone, Debug)]
pub struct LinearizationCache {
    /// Means the cache was computed at
    pub means: Vec<Vector>,
    /// Covariances the cache was computed at
    pub covs: Vec<Matrix>,
    /// Motion linearization of `f_k` at `x_k`, `k = 1..K-1`
    pub motion: Vec<LinearParams>,
    /// Measurement linearization of `h_k` at `x_k`, `k = 1..K`
    pub meas: Vec<LinearParams>,
    pub motion_bar: Vec<Vector>,
    pub meas_bar: Vec<Vector>,
    /// `(Q_k + Omega_k)^-1`
    pub motion_cov_inv: Vec<Matrix>,
    /// `(R_k + Lambda_k)^-1`
    pub meas_cov_inv: Vec<Matrix>,
}

impl LinearizationCache {
    /// Linearize both models around every state of `traj`
    pub fn compute<Mo, Me, L>(motion_model: &Mo, meas_model: &Me, linearizer: &L, traj: &Trajectory) -> Result<Self>
    where
        Mo: MotionModel + ?Sized,
        Me: MeasModel + ?Sized,
        L: Linearizer<Mo> + Linearizer<Me> + ?Sized,
    {
        if traj.is_empty() {
            return Err(SmootherError::InvalidParameters(
                "cannot linearize around an empty trajectory".to_string(),
            ));
        }
        let num_steps = traj.len();

        let mut motion = Vec::with_capacity(num_steps - 1);
        let mut motion_bar = Vec::with_capacity(num_steps - 1);
        let mut motion_cov_inv = Vec::with_capacity(num_steps - 1);
        for (idx, (mean, cov)) in traj.means.iter().zip(&traj.covs).take(num_steps - 1).enumerate() {
            let time_step = idx + 1;
            let (z_bar, params) = <L as Linearizer<Mo>>::linearize(linearizer, motion_model, mean, cov, time_step)?;
            let inflated = motion_model.proc_noise(time_step) + &params.omega;
            motion_cov_inv.push(try_inverse(&inflated, &format!("inflated process noise at step {time_step}"))?);
            motion_bar.push(z_bar);
            motion.push(params);
        }

        let mut meas = Vec::with_capacity(num_steps);
        let mut meas_bar = Vec::with_capacity(num_steps);
        let mut meas_cov_inv = Vec::with_capacity(num_steps);
        for (idx, (mean, cov)) in traj.means.iter().zip(&traj.covs).enumerate() {
            let time_step = idx + 1;
            let (z_bar, params) = <L as Linearizer<Me>>::linearize(linearizer, meas_model, mean, cov, time_step)?;
            let inflated = meas_model.meas_noise(time_step) + &params.omega;
            meas_cov_inv.push(try_inverse(&inflated, &format!("inflated measurement noise at step {time_step}"))?);
            meas_bar.push(z_bar);
            meas.push(params);
        }

        Ok(Self {
            means: traj.means.clone(),
            covs: traj.covs.clone(),
            motion,
            meas,
            motion_bar,
            meas_bar,
            motion_cov_inv,
            meas_cov_inv,
        })
    }

    pub fn len(&self) -> usize {
        self.means.len()
    }

    pub fn is_empty(&self) -> bool {
        self.means.is_empty()
    }

    /// Whether `means` are exactly the means this cache was computed at
    pub fn computed_at(&self, means: &[Vector]) -> bool {
        self.means.as_slice() == means
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linearization::{Analytical, SigmaPointSlr, UnscentedTransform};
    use crate::models::{AffineModel, Quadratic};
    use approx::assert_relative_eq;

    fn models() -> (AffineModel, Quadratic) {
        let motion = AffineModel::linear(Matrix::identity(1, 1) * 0.9, Matrix::identity(1, 1) * 0.5).unwrap();
        let meas = Quadratic::new(1.0, Matrix::identity(1, 1) * 0.1);
        (motion, meas)
    }

    fn traj() -> Trajectory {
        let means = vec![1.0, 2.0, 3.0].into_iter().map(|x| Vector::from_vec(vec![x])).collect();
        Trajectory::from_means(means, &Matrix::identity(1, 1)).unwrap()
    }

    #[test]
    fn test_lengths() {
        let (motion, meas) = models();
        let cache = LinearizationCache::compute(&motion, &meas, &Analytical, &traj()).unwrap();
        assert_eq!(cache.len(), 3);
        assert_eq!(cache.motion.len(), 2);
        assert_eq!(cache.meas.len(), 3);
        assert_eq!(cache.motion_cov_inv.len(), 2);
        assert!(cache.computed_at(&traj().means));
    }

    #[test]
    fn test_analytical_values() {
        let (motion, meas) = models();
        let cache = LinearizationCache::compute(&motion, &meas, &Analytical, &traj()).unwrap();
        assert_relative_eq!(cache.motion_bar[1][0], 1.8);
        assert_relative_eq!(cache.meas_bar[2][0], 9.0);
        assert_relative_eq!(cache.meas[2].a[(0, 0)], 6.0);
        assert_relative_eq!(cache.motion_cov_inv[0][(0, 0)], 2.0);
        assert_relative_eq!(cache.meas_cov_inv[0][(0, 0)], 10.0, epsilon = 1e-12);
    }

    #[test]
    fn test_slr_inflates_noise() {
        let (motion, meas) = models();
        let slr = SigmaPointSlr::new(UnscentedTransform::new(1.0, 2.0, 2.0));
        let cache = LinearizationCache::compute(&motion, &meas, &slr, &traj()).unwrap();
        // quadratic measurement has a positive linearization error
        assert!(cache.meas_cov_inv[0][(0, 0)] < 10.0);
    }

    #[test]
    fn test_empty_trajectory() {
        let (motion, meas) = models();
        let empty = Trajectory::zeros(0, &Matrix::identity(1, 1));
        assert!(LinearizationCache::compute(&motion, &meas, &Analytical, &empty).is_err());
    }
}
