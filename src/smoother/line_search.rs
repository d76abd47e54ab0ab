/// Backtracking line search with the Armijo (sufficient decrease) condition
///
/// Starts at `alpha = 1` and halves until
/// `J(x + alpha p) <= J(x) + c1 alpha grad J(x) . p`.
use log::{debug, warn};

use crate::cost::CostFunction;
use crate::error::{Result, SmootherError};
use crate::linearization::LinearizationCache;
use crate::types::Vector;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ArmijoLineSearch {
    /// Sufficient decrease constant, in (0, 1)
    pub c1: f64,
    /// Halvings of the step before giving up with `alpha = 0`
    pub max_backtracks: usize,
}

impl Default for ArmijoLineSearch {
    fn default() -> Self {
        Self {
            c1: 0.1,
            max_backtracks: 10,
        }
    }
}

/// Accepted point along the search direction
#[derive(Clone, Debug)]
pub struct LineSearchStep {
    pub alpha: f64,
    pub means: Vec<Vector>,
    pub cost: f64,
}

impl ArmijoLineSearch {
    pub fn new(c1: f64, max_backtracks: usize) -> Result<Self> {
        let search = Self { c1, max_backtracks };
        search.validate()?;
        Ok(search)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.c1 > 0.0 && self.c1 < 1.0) {
            return Err(SmootherError::InvalidParameters(format!(
                "Armijo constant c1 must be in (0, 1), got {}",
                self.c1
            )));
        }
        Ok(())
    }

    /// Search along `direction` from `means`, whose cost is `cost`
    ///
    /// The linearization `lin` of the current iterate is held fixed while
    /// the means vary.
    pub fn search<C: CostFunction + ?Sized>(
        &self,
        cost_fn: &C,
        means: &[Vector],
        cost: f64,
        direction: &[Vector],
        lin: &LinearizationCache,
    ) -> Result<LineSearchStep> {
        let dir_der = cost_fn.dir_der(means, direction, lin)?;
        debug!("Line search: cost {cost:.6e}, directional derivative {dir_der:.6e}");

        let mut alpha = 1.0;
        for backtrack in 0..=self.max_backtracks {
            let candidate: Vec<Vector> = means.iter().zip(direction).map(|(m, p)| m + p * alpha).collect();
            let candidate_cost = cost_fn.cost(&candidate, lin)?;
            if candidate_cost <= cost + self.c1 * alpha * dir_der {
                debug!("Line search: accepted alpha = {alpha} after {backtrack} backtracks");
                return Ok(LineSearchStep {
                    alpha,
                    means: candidate,
                    cost: candidate_cost,
                });
            }
            alpha *= 0.5;
        }

        warn!(
            "Line search: no sufficient decrease after {} backtracks, keeping current iterate",
            self.max_backtracks
        );
        Ok(LineSearchStep {
            alpha: 0.0,
            means: means.to_vec(),
            cost,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Matrix, Trajectory};

    /// `J(x) = sum_k |x_k - target|^2`, ignoring the linearization
    struct Bowl {
        target: f64,
    }

    impl CostFunction for Bowl {
        fn cost(&self, means: &[Vector], _lin: &LinearizationCache) -> Result<f64> {
            Ok(means.iter().map(|m| (m.add_scalar(-self.target)).norm_squared()).sum())
        }

        fn dir_der(&self, means: &[Vector], direction: &[Vector], _lin: &LinearizationCache) -> Result<f64> {
            Ok(means
                .iter()
                .zip(direction)
                .map(|(m, p)| 2.0 * m.add_scalar(-self.target).dot(p))
                .sum())
        }
    }

    fn dummy_cache() -> LinearizationCache {
        use crate::linearization::Analytical;
        use crate::models::AffineModel;
        let model = AffineModel::linear(Matrix::identity(1, 1), Matrix::identity(1, 1)).unwrap();
        let traj = Trajectory::zeros(1, &Matrix::identity(1, 1));
        LinearizationCache::compute(&model, &model, &Analytical, &traj).unwrap()
    }

    fn scalar(x: f64) -> Vector {
        Vector::from_vec(vec![x])
    }

    #[test]
    fn test_full_step_accepted() {
        let bowl = Bowl { target: 1.0 };
        let lin = dummy_cache();
        let means = vec![scalar(0.0)];
        let step = ArmijoLineSearch::default()
            .search(&bowl, &means, 1.0, &[scalar(1.0)], &lin)
            .unwrap();
        assert_eq!(step.alpha, 1.0);
        assert_eq!(step.cost, 0.0);
    }

    #[test]
    fn test_overshoot_is_halved() {
        // step of 3 overshoots the minimum at 1 to cost 4
        let bowl = Bowl { target: 1.0 };
        let lin = dummy_cache();
        let means = vec![scalar(0.0)];
        let search = ArmijoLineSearch::default();
        let step = search.search(&bowl, &means, 1.0, &[scalar(3.0)], &lin).unwrap();
        assert_eq!(step.alpha, 0.5);
        // accepted step satisfies the Armijo condition
        let dir_der = -6.0;
        assert!(step.cost <= 1.0 + search.c1 * step.alpha * dir_der);
    }

    #[test]
    fn test_ascent_direction_gives_zero_step() {
        let bowl = Bowl { target: 1.0 };
        let lin = dummy_cache();
        let means = vec![scalar(0.0)];
        let step = ArmijoLineSearch::new(0.1, 5)
            .unwrap()
            .search(&bowl, &means, 1.0, &[scalar(-1.0)], &lin)
            .unwrap();
        assert_eq!(step.alpha, 0.0);
        assert_eq!(step.means, means);
        assert_eq!(step.cost, 1.0);
    }

    #[test]
    fn test_rejects_bad_c1() {
        assert!(ArmijoLineSearch::new(0.0, 10).is_err());
        assert!(ArmijoLineSearch::new(1.5, 10).is_err());
    }
}
