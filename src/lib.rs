//! Iterated nonlinear Kalman smoothers
//!
//! Gauss-Newton, Levenberg-Marquardt and line search variants of the
//! iterated extended Kalman smoother (IEKS) and the iterated posterior
//! linearization smoother (IPLS).

pub mod analytics;
pub mod config;
pub mod cost;
pub mod error;
pub mod filters;
pub mod linearization;
pub mod models;
pub mod runner;
pub mod scenario;
pub mod smoother;
pub mod types;

pub use cost::{CostFunction, CostTerms, LmRegularizedCost, NoopCost, SmoothingCost};
pub use error::{Result, SmootherError};
pub use linearization::{Analytical, LinearizationCache, Linearizer, MonteCarloSlr, SigmaPointSlr};
pub use smoother::{ArmijoLineSearch, Eks, IterationControl, IteratedSmoother, LmParams, PrLs, SmoothingOutput};
pub use types::{Matrix, Trajectory, Vector};
