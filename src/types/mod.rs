pub mod linalg;

pub use linalg::*;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SmootherError};

/// Sequence of Gaussian state estimates for times 1, ..., K
///
/// Index `k - 1` holds the estimate of `x_k`.
#[derive(Clone, Debug, PartialEq)]
pub struct Trajectory {
    pub means: Vec<Vector>,
    pub covs: Vec<Matrix>,
}

impl Trajectory {
    /// Create a trajectory, checking that means and covariances line up
    pub fn new(means: Vec<Vector>, covs: Vec<Matrix>) -> Result<Self> {
        if means.len() != covs.len() {
            return Err(SmootherError::DimensionMismatch {
                context: "trajectory covariances".to_string(),
                expected: means.len(),
                actual: covs.len(),
            });
        }
        if let Some(first) = means.first() {
            let dim = first.len();
            for (k, (mean, cov)) in means.iter().zip(covs.iter()).enumerate() {
                if mean.len() != dim {
                    return Err(SmootherError::DimensionMismatch {
                        context: format!("trajectory mean at index {k}"),
                        expected: dim,
                        actual: mean.len(),
                    });
                }
                if cov.nrows() != dim || cov.ncols() != dim {
                    return Err(SmootherError::DimensionMismatch {
                        context: format!("trajectory covariance at index {k}"),
                        expected: dim,
                        actual: cov.nrows().max(cov.ncols()),
                    });
                }
            }
        }
        Ok(Self { means, covs })
    }

    /// Means given explicitly, every covariance set to `cov`
    pub fn from_means(means: Vec<Vector>, cov: &Matrix) -> Result<Self> {
        let covs = vec![cov.clone(); means.len()];
        Self::new(means, covs)
    }

    /// All-zero means with a constant covariance
    ///
    /// The usual starting point for `filter_and_smooth_with_init_traj`.
    /// Analytical linearization ignores the covariances.
    pub fn zeros(len: usize, cov: &Matrix) -> Self {
        let dim = cov.nrows();
        Self {
            means: vec![Vector::zeros(dim); len],
            covs: vec![cov.clone(); len],
        }
    }

    pub fn len(&self) -> usize {
        self.means.len()
    }

    pub fn is_empty(&self) -> bool {
        self.means.is_empty()
    }

    /// State dimension (0 for an empty trajectory)
    pub fn state_dim(&self) -> usize {
        self.means.first().map_or(0, |m| m.len())
    }
}

/// Plain-data form of a trajectory for JSON output
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TrajectoryRecord {
    pub means: Vec<Vec<f64>>,
    pub covs: Vec<Vec<Vec<f64>>>,
}

impl From<&Trajectory> for TrajectoryRecord {
    fn from(traj: &Trajectory) -> Self {
        let means = traj.means.iter().map(|m| m.iter().copied().collect()).collect();
        let covs = traj
            .covs
            .iter()
            .map(|p| p.row_iter().map(|row| row.iter().copied().collect()).collect())
            .collect();
        Self { means, covs }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zeros() {
        let cov = Matrix::identity(3, 3);
        let traj = Trajectory::zeros(4, &cov);
        assert_eq!(traj.len(), 4);
        assert_eq!(traj.state_dim(), 3);
        assert!(traj.means.iter().all(|m| m.norm() == 0.0));
    }

    #[test]
    fn test_new_rejects_length_mismatch() {
        let means = vec![Vector::zeros(2); 3];
        let covs = vec![Matrix::identity(2, 2); 2];
        assert!(matches!(
            Trajectory::new(means, covs),
            Err(SmootherError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_new_rejects_bad_cov_shape() {
        let means = vec![Vector::zeros(2); 2];
        let covs = vec![Matrix::identity(2, 2), Matrix::identity(3, 3)];
        assert!(Trajectory::new(means, covs).is_err());
    }

    #[test]
    fn test_record_layout() {
        let cov = Matrix::from_row_slice(2, 2, &[1.0, 2.0, 3.0, 4.0]);
        let traj = Trajectory::from_means(vec![Vector::from_vec(vec![5.0, 6.0])], &cov).unwrap();
        let record = TrajectoryRecord::from(&traj);
        assert_eq!(record.means, vec![vec![5.0, 6.0]]);
        assert_eq!(record.covs[0][0], vec![1.0, 2.0]);
        assert_eq!(record.covs[0][1], vec![3.0, 4.0]);
    }
}
