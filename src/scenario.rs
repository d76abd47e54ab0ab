//! Scenario description: models, prior and measurements
//!
//! Scenario files are JSON. Missing measurements are written as `null`
//! (any null component marks the whole measurement as missing) and
//! become NaN vectors in memory.

use serde::{Deserialize, Serialize};

use crate::config::{matrix_from_rows, AnyMeasModel, AnyMotionModel, MeasConfig, MotionConfig};
use crate::error::{Result, SmootherError};
use crate::models::{MeasModel, MotionModel};
use crate::types::{Matrix, Vector};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScenarioFile {
    pub motion_model: MotionConfig,
    pub meas_model: MeasConfig,
    pub prior_mean: Vec<f64>,
    pub prior_cov: Vec<Vec<f64>>,
    pub measurements: Vec<Vec<Option<f64>>>,
    /// Ground truth states, if known
    #[serde(default)]
    pub states: Option<Vec<Vec<f64>>>,
}

#[derive(Clone, Debug)]
pub struct Scenario {
    pub motion_model: AnyMotionModel,
    pub meas_model: AnyMeasModel,
    pub prior_mean: Vector,
    pub prior_cov: Matrix,
    pub measurements: Vec<Vector>,
    pub states: Option<Vec<Vector>>,
}

impl ScenarioFile {
    pub fn into_scenario(self) -> Result<Scenario> {
        let motion_model = self.motion_model.build()?;
        let meas_model = self.meas_model.build()?;
        let prior_mean = Vector::from_vec(self.prior_mean);
        let prior_cov = matrix_from_rows(&self.prior_cov, "prior covariance")?;
        if prior_cov.nrows() != prior_mean.len() || prior_cov.ncols() != prior_mean.len() {
            return Err(SmootherError::DimensionMismatch {
                context: "prior covariance".to_string(),
                expected: prior_mean.len(),
                actual: prior_cov.nrows(),
            });
        }

        let state_dim = motion_model.proc_noise(1).nrows();
        if prior_mean.len() != state_dim {
            return Err(SmootherError::DimensionMismatch {
                context: "prior mean".to_string(),
                expected: state_dim,
                actual: prior_mean.len(),
            });
        }

        let meas_dim = meas_model.meas_noise(1).nrows();
        let measurements = self
            .measurements
            .iter()
            .map(|row| measurement_from_row(row, meas_dim))
            .collect();

        let states = match self.states {
            Some(rows) => {
                if rows.len() != self.measurements.len() {
                    return Err(SmootherError::DimensionMismatch {
                        context: "ground truth states".to_string(),
                        expected: self.measurements.len(),
                        actual: rows.len(),
                    });
                }
                if let Some((idx, bad)) = rows.iter().enumerate().find(|(_, row)| row.len() != state_dim) {
                    return Err(SmootherError::DimensionMismatch {
                        context: format!("ground truth state at time step {}", idx + 1),
                        expected: state_dim,
                        actual: bad.len(),
                    });
                }
                Some(rows.into_iter().map(Vector::from_vec).collect())
            }
            None => None,
        };

        Ok(Scenario {
            motion_model,
            meas_model,
            prior_mean,
            prior_cov,
            measurements,
            states,
        })
    }
}

fn measurement_from_row(row: &[Option<f64>], meas_dim: usize) -> Vector {
    if row.is_empty() || row.iter().any(Option::is_none) {
        return Vector::from_element(meas_dim, f64::NAN);
    }
    Vector::from_iterator(row.len(), row.iter().map(|v| v.unwrap_or(f64::NAN)))
}

impl Scenario {
    pub fn num_steps(&self) -> usize {
        self.measurements.len()
    }

    pub fn num_missing(&self) -> usize {
        self.measurements.iter().filter(|y| crate::types::is_missing(y)).count()
    }
}
