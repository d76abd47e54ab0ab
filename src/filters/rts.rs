/// Rauch-Tung-Striebel backward pass
use super::kalman::FilterOutput;
use crate::error::{try_inverse, Result, SmootherError};
use crate::types::{symmetrize, Trajectory};

/// Smooth a filtered sequence, starting from the last filter estimate
///
/// ```text
/// G_k       = P_{k-1|k-1} A^T P_{k|k-1}^-1
/// m_{k-1|K} = m_{k-1|k-1} + G_k (m_{k|K} - m_{k|k-1})
/// P_{k-1|K} = P_{k-1|k-1} + G_k (P_{k|K} - P_{k|k-1}) G_k^T
/// ```
pub fn rts_smooth(filter: &FilterOutput) -> Result<Trajectory> {
    let num_steps = filter.len();
    if num_steps == 0 {
        return Err(SmootherError::InvalidParameters("nothing to smooth".to_string()));
    }
    if filter.motion_lin.len() + 1 != num_steps {
        return Err(SmootherError::DimensionMismatch {
            context: "motion linearizations".to_string(),
            expected: num_steps - 1,
            actual: filter.motion_lin.len(),
        });
    }

    let mut means = filter.filter_means.clone();
    let mut covs = filter.filter_covs.clone();
    for idx in (1..num_steps).rev() {
        let a = &filter.motion_lin[idx - 1].a;
        let pred_cov_inv = try_inverse(&filter.pred_covs[idx], &format!("predicted covariance at time step {}", idx + 1))?;
        let gain = &filter.filter_covs[idx - 1] * a.transpose() * pred_cov_inv;

        let mean = &filter.filter_means[idx - 1] + &gain * (&means[idx] - &filter.pred_means[idx]);
        let cov = &filter.filter_covs[idx - 1] + &gain * (&covs[idx] - &filter.pred_covs[idx]) * gain.transpose();
        means[idx - 1] = mean;
        covs[idx - 1] = symmetrize(&cov);
    }
    Trajectory::new(means, covs)
}
