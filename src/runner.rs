//! Run a configured smoother on a scenario

use log::info;
use serde::{Deserialize, Serialize};

use crate::analytics::{anees, rmse};
use crate::config::{AnyMeasModel, AnyMotionModel, Method, SmootherConfig};
use crate::error::Result;
use crate::linearization::{Analytical, Linearizer};
use crate::scenario::Scenario;
use crate::smoother::{IteratedSmoother, SmoothingOutput};
use crate::types::TrajectoryRecord;

/// JSON summary of one run
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunReport {
    pub method: Method,
    pub num_iter: usize,
    pub cost_trace: Vec<f64>,
    pub final_lambda: Option<f64>,
    pub filtered: TrajectoryRecord,
    pub smoothed: TrajectoryRecord,
    /// Present when the scenario has ground truth
    pub rmse: Option<f64>,
    pub anees: Option<f64>,
}

pub fn run_scenario(scenario: &Scenario, config: &SmootherConfig) -> Result<RunReport> {
    info!(
        "Running {} for {} iterations on {} time steps ({} missing)",
        config.method.name(),
        config.num_iter,
        scenario.num_steps(),
        scenario.num_missing()
    );
    let output = if config.method.uses_slr() {
        run_with(scenario, config, config.slr_estimator()?)?
    } else {
        run_with(scenario, config, Analytical)?
    };

    let (rmse, anees) = match &scenario.states {
        Some(states) => (Some(rmse(&output.smoothed.means, states)?), Some(anees(&output.smoothed, states)?)),
        None => (None, None),
    };
    Ok(RunReport {
        method: config.method,
        num_iter: config.num_iter,
        cost_trace: output.cost_trace.clone(),
        final_lambda: output.lambda,
        filtered: TrajectoryRecord::from(&output.filtered),
        smoothed: TrajectoryRecord::from(&output.smoothed),
        rmse,
        anees,
    })
}

fn run_with<L>(scenario: &Scenario, config: &SmootherConfig, linearizer: L) -> Result<SmoothingOutput>
where
    L: Linearizer<AnyMotionModel> + Linearizer<AnyMeasModel>,
{
    let smoother = IteratedSmoother::new(
        &scenario.motion_model,
        &scenario.meas_model,
        linearizer,
        config.control(),
        config.num_iter,
    )?;
    let cost = smoother.smoothing_cost(&scenario.measurements, &scenario.prior_mean, &scenario.prior_cov)?;
    smoother.filter_and_smooth(&scenario.measurements, &scenario.prior_mean, &scenario.prior_cov, &cost)
}
