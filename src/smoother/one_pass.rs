/// Non-iterated smoothers: filter linearizing at the running estimate, then RTS
use crate::error::Result;
use crate::filters::{rts_smooth, KalmanFilter};
use crate::linearization::{Analytical, Linearizer, SigmaPointSlr};
use crate::models::{MeasModel, MotionModel};
use crate::types::{Matrix, Trajectory, Vector};

/// Filter and smoother estimates of a single pass
#[derive(Clone, Debug)]
pub struct PassOutput {
    pub filtered: Trajectory,
    pub smoothed: Trajectory,
}

pub struct OnePassSmoother<'a, Mo: ?Sized, Me: ?Sized, L> {
    motion_model: &'a Mo,
    meas_model: &'a Me,
    linearizer: L,
}

/// Extended Kalman smoother
pub type Eks<'a, Mo, Me> = OnePassSmoother<'a, Mo, Me, Analytical>;

/// Prior linearization smoother: SLR with respect to the filter predictions
pub type PrLs<'a, Mo, Me, S = SigmaPointSlr> = OnePassSmoother<'a, Mo, Me, S>;

impl<'a, Mo, Me, L> OnePassSmoother<'a, Mo, Me, L>
where
    Mo: MotionModel + ?Sized,
    Me: MeasModel + ?Sized,
    L: Linearizer<Mo> + Linearizer<Me>,
{
    pub fn new(motion_model: &'a Mo, meas_model: &'a Me, linearizer: L) -> Self {
        Self {
            motion_model,
            meas_model,
            linearizer,
        }
    }

    pub fn filter_and_smooth(&self, measurements: &[Vector], m1: &Vector, p1: &Matrix) -> Result<PassOutput> {
        let kf = KalmanFilter::new(self.motion_model, self.meas_model, &self.linearizer);
        let filter_out = kf.filter_seq(measurements, m1, p1)?;
        let smoothed = rts_smooth(&filter_out)?;
        Ok(PassOutput {
            filtered: Trajectory {
                means: filter_out.filter_means,
                covs: filter_out.filter_covs,
            },
            smoothed,
        })
    }
}

impl<'a, Mo, Me> OnePassSmoother<'a, Mo, Me, Analytical>
where
    Mo: MotionModel + ?Sized,
    Me: MeasModel + ?Sized,
{
    pub fn eks(motion_model: &'a Mo, meas_model: &'a Me) -> Self {
        Self {
            motion_model,
            meas_model,
            linearizer: Analytical,
        }
    }
}
