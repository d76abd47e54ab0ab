//! Forward Kalman filter and backward RTS smoother
//!
//! Both passes work on affine approximations of the models, so the same
//! code runs the extended, prior linearization and iterated variants,
//! including the iterated posterior linearization filter. Only
//! the source of the linearizations differs.

pub mod iplf;
pub mod kalman;
pub mod rts;

pub use iplf::Iplf;
pub use kalman::{FilterOutput, KalmanFilter, LinearizationSource, LmDamping};
pub use rts::rts_smooth;
