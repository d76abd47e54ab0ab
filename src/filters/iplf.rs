//! Iterated posterior linearization filter (IPLF)
//!
//! A filter pass whose motion and measurement models are SLR-linearized
//! around a fixed set of posterior estimates, typically the output of the
//! previous pass, instead of the running prediction.

use log::{debug, info};

use super::kalman::{FilterOutput, KalmanFilter, LinearizationSource};
use crate::error::{Result, SmootherError};
use crate::linearization::{LinearizationCache, Linearizer, Slr};
use crate::models::{MeasModel, MotionModel};
use crate::types::{Matrix, Trajectory, Vector};

pub struct Iplf<'a, Mo: ?Sized, Me: ?Sized, S> {
    motion_model: &'a Mo,
    meas_model: &'a Me,
    slr: S,
}

impl<'a, Mo, Me, S> Iplf<'a, Mo, Me, S>
where
    Mo: MotionModel + ?Sized,
    Me: MeasModel + ?Sized,
    S: Slr + Linearizer<Mo> + Linearizer<Me>,
{
    pub fn new(motion_model: &'a Mo, meas_model: &'a Me, slr: S) -> Self {
        Self {
            motion_model,
            meas_model,
            slr,
        }
    }

    /// One filter pass linearized around `posterior`
    ///
    /// Motion step `k` is linearized at the estimate of `x_k`, the
    /// measurement at `k` at the estimate of `x_k`.
    pub fn filter_seq(
        &self,
        measurements: &[Vector],
        m1: &Vector,
        p1: &Matrix,
        posterior: &Trajectory,
    ) -> Result<FilterOutput> {
        if posterior.len() != measurements.len() {
            return Err(SmootherError::DimensionMismatch {
                context: "posterior estimates".to_string(),
                expected: measurements.len(),
                actual: posterior.len(),
            });
        }
        let kf = KalmanFilter::new(self.motion_model, self.meas_model, &self.slr);
        kf.check_inputs(measurements, m1, p1)?;
        if posterior.state_dim() != m1.len() {
            return Err(SmootherError::DimensionMismatch {
                context: "posterior estimate state dimension".to_string(),
                expected: m1.len(),
                actual: posterior.state_dim(),
            });
        }
        let lin = LinearizationCache::compute(self.motion_model, self.meas_model, &self.slr, posterior)?;
        kf.filter_seq_with(measurements, m1, p1, LinearizationSource::Fixed(&lin), None)
    }

    /// Prior linearization filter followed by `num_iter - 1` posterior passes
    ///
    /// Each pass re-linearizes around the filter estimates of the one before.
    pub fn filter_iterated(
        &self,
        measurements: &[Vector],
        m1: &Vector,
        p1: &Matrix,
        num_iter: usize,
    ) -> Result<FilterOutput> {
        if num_iter == 0 {
            return Err(SmootherError::InvalidParameters("num_iter must be at least 1".to_string()));
        }
        info!("IPLF iter: 1/{num_iter}");
        let kf = KalmanFilter::new(self.motion_model, self.meas_model, &self.slr);
        let mut out = kf.filter_seq(measurements, m1, p1)?;
        for iter in 2..=num_iter {
            info!("IPLF iter: {iter}/{num_iter}");
            let posterior = Trajectory {
                means: out.filter_means,
                covs: out.filter_covs,
            };
            out = self.filter_seq(measurements, m1, p1, &posterior)?;
            debug!("IPLF pass {iter} done");
        }
        Ok(out)
    }
}
