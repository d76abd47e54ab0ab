//! Accuracy metrics for smoother output
//!
//! Metrics are tabulated with ndarray: one row per time step, Monte Carlo
//! run or iteration depending on the table.

use ndarray::{Array1, Array2, Axis};

use crate::error::{try_inverse, Result, SmootherError};
use crate::smoother::SmoothingOutput;
use crate::types::{Matrix, Trajectory, Vector};

/// `K x D` array of means, all vectors must share one dimension
pub fn to_array2(vectors: &[Vector]) -> Result<Array2<f64>> {
    let dim = vectors.first().map_or(0, |v| v.len());
    if let Some((idx, bad)) = vectors.iter().enumerate().find(|(_, v)| v.len() != dim) {
        return Err(SmootherError::DimensionMismatch {
            context: format!("vector at time step {}", idx + 1),
            expected: dim,
            actual: bad.len(),
        });
    }
    Ok(Array2::from_shape_fn((vectors.len(), dim), |(row, col)| vectors[row][col]))
}

/// Root mean square error over all time steps and components
pub fn rmse(means: &[Vector], truth: &[Vector]) -> Result<f64> {
    check_truth(means, truth)?;
    if means.is_empty() {
        return Err(SmootherError::InvalidParameters("RMSE of an empty trajectory".to_string()));
    }
    let err = to_array2(means)? - to_array2(truth)?;
    let sq_norms = err.mapv(|e| e * e).sum_axis(Axis(1));
    Ok(sq_norms.mean().unwrap_or(f64::NAN).sqrt())
}

/// Normalised estimation error squared `e_k^T P_k^-1 e_k` per time step
pub fn nees(traj: &Trajectory, truth: &[Vector]) -> Result<Array1<f64>> {
    check_truth(&traj.means, truth)?;
    let values = traj
        .means
        .iter()
        .zip(&traj.covs)
        .zip(truth)
        .enumerate()
        .map(|(idx, ((mean, cov), state))| {
            let err = mean - state;
            let cov_inv = try_inverse(cov, &format!("covariance at time step {}", idx + 1))?;
            Ok(err.dot(&(cov_inv * &err)))
        })
        .collect::<Result<Vec<f64>>>()?;
    Ok(Array1::from(values))
}

/// Average NEES over the trajectory
pub fn anees(traj: &Trajectory, truth: &[Vector]) -> Result<f64> {
    nees(traj, truth).map(|values| values.mean().unwrap_or(f64::NAN))
}

/// Symmetric within `tol` and all eigenvalues above `-tol`
pub fn is_symmetric_psd(cov: &Matrix, tol: f64) -> bool {
    if !cov.is_square() || (cov - cov.transpose()).amax() > tol {
        return false;
    }
    cov.clone().symmetric_eigenvalues().iter().all(|&ev| ev > -tol)
}

/// Cost, RMSE and ANEES after every outer iteration
#[derive(Clone, Debug)]
pub struct IterationMetrics {
    pub cost: Array1<f64>,
    pub rmse: Array1<f64>,
    pub anees: Array1<f64>,
}

impl IterationMetrics {
    pub fn from_output(output: &SmoothingOutput, truth: &[Vector]) -> Result<Self> {
        let rmse = output
            .iterations
            .iter()
            .map(|traj| rmse(&traj.means, truth))
            .collect::<Result<Vec<_>>>()?;
        let anees = output
            .iterations
            .iter()
            .map(|traj| anees(traj, truth))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            cost: Array1::from(output.cost_trace.clone()),
            rmse: Array1::from(rmse),
            anees: Array1::from(anees),
        })
    }

    /// Columns: cost, RMSE, ANEES
    pub fn table(&self) -> Array2<f64> {
        let mut table = Array2::zeros((self.cost.len(), 3));
        table.column_mut(0).assign(&self.cost);
        table.column_mut(1).assign(&self.rmse);
        table.column_mut(2).assign(&self.anees);
        table
    }
}

/// Mean and (population) standard deviation over Monte Carlo runs
///
/// `runs` holds one row per run, one column per quantity (e.g. iteration).
#[derive(Clone, Debug)]
pub struct McStats {
    pub mean: Array1<f64>,
    pub std: Array1<f64>,
}

pub fn mc_stats(runs: &Array2<f64>) -> Result<McStats> {
    let mean = runs
        .mean_axis(Axis(0))
        .ok_or_else(|| SmootherError::InvalidParameters("Monte Carlo statistics need at least one run".to_string()))?;
    let std = runs.std_axis(Axis(0), 0.0);
    Ok(McStats { mean, std })
}

fn check_truth(means: &[Vector], truth: &[Vector]) -> Result<()> {
    if means.len() != truth.len() {
        return Err(SmootherError::DimensionMismatch {
            context: "ground truth length".to_string(),
            expected: means.len(),
            actual: truth.len(),
        });
    }
    for (idx, (mean, state)) in means.iter().zip(truth).enumerate() {
        if mean.len() != state.len() {
            return Err(SmootherError::DimensionMismatch {
                context: format!("ground truth state at time step {}", idx + 1),
                expected: mean.len(),
                actual: state.len(),
            });
        }
    }
    Ok(())
}
