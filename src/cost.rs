//! Smoothing cost functions
//!
//! The smoothers minimise
//!
//! ```text
//! J(x) = |x_1 - m_{1|0}|^2_{P^-1}
//!      + sum_{k=1}^{K-1} |x_{k+1} - f_bar_k|^2_{(Q_k + Omega_k)^-1}
//!      + sum_{k : y_k present} |y_k - h_bar_k|^2_{(R_k + Lambda_k)^-1}
//! ```
//!
//! where `f_bar_k`, `h_bar_k` are the mapped means of the linearization
//! strategy at `x_k` (analytical: `f(x_k)`, `h(x_k)`). The covariances used
//! by SLR strategies, and `Omega`, `Lambda`, come from the linearization
//! cache and stay fixed while the means vary.

use crate::error::{try_inverse, Result, SmootherError};
use crate::linearization::{LinearizationCache, Linearizer};
use crate::models::{MeasModel, MotionModel};
use crate::types::{is_missing, weighted_sq_norm, Matrix, Vector};

/// Objective evaluated by the Levenberg-Marquardt and line search smoothers
pub trait CostFunction {
    /// Cost of trajectory means, with covariances and noise inflation from `lin`
    fn cost(&self, means: &[Vector], lin: &LinearizationCache) -> Result<f64>;

    /// Directional derivative `grad J(means) . direction`
    fn dir_der(&self, means: &[Vector], direction: &[Vector], lin: &LinearizationCache) -> Result<f64>;

    /// `false` for placeholder costs that do not evaluate anything
    fn evaluates(&self) -> bool {
        true
    }
}

impl<C: CostFunction + ?Sized> CostFunction for &C {
    fn cost(&self, means: &[Vector], lin: &LinearizationCache) -> Result<f64> {
        (**self).cost(means, lin)
    }

    fn dir_der(&self, means: &[Vector], direction: &[Vector], lin: &LinearizationCache) -> Result<f64> {
        (**self).dir_der(means, direction, lin)
    }

    fn evaluates(&self) -> bool {
        (**self).evaluates()
    }
}

/// Per-term breakdown of the smoothing cost
#[derive(Clone, Debug, PartialEq)]
pub struct CostTerms {
    pub prior: f64,
    /// Term `k - 1` penalises `x_{k+1} - f_bar_k`
    pub motion: Vec<f64>,
    /// Zero where the measurement is missing
    pub meas: Vec<f64>,
}

impl CostTerms {
    pub fn total(&self) -> f64 {
        self.prior + self.motion.iter().sum::<f64>() + self.meas.iter().sum::<f64>()
    }
}

pub struct SmoothingCost<'a, Mo: ?Sized, Me: ?Sized, L: ?Sized> {
    motion_model: &'a Mo,
    meas_model: &'a Me,
    linearizer: &'a L,
    measurements: &'a [Vector],
    prior_mean: Vector,
    prior_cov_inv: Matrix,
}

impl<'a, Mo, Me, L> SmoothingCost<'a, Mo, Me, L>
where
    Mo: MotionModel + ?Sized,
    Me: MeasModel + ?Sized,
    L: Linearizer<Mo> + Linearizer<Me> + ?Sized,
{
    pub fn new(
        motion_model: &'a Mo,
        meas_model: &'a Me,
        linearizer: &'a L,
        measurements: &'a [Vector],
        prior_mean: &Vector,
        prior_cov: &Matrix,
    ) -> Result<Self> {
        Ok(Self {
            motion_model,
            meas_model,
            linearizer,
            measurements,
            prior_mean: prior_mean.clone(),
            prior_cov_inv: try_inverse(prior_cov, "prior covariance")?,
        })
    }

    pub fn cost_terms(&self, means: &[Vector], lin: &LinearizationCache) -> Result<CostTerms> {
        self.check_lengths(means, lin)?;
        let (motion_bar, meas_bar) = self.bars(means, lin)?;

        let prior = weighted_sq_norm(&(&means[0] - &self.prior_mean), &self.prior_cov_inv);
        let motion = means[1..]
            .iter()
            .zip(&motion_bar)
            .zip(&lin.motion_cov_inv)
            .map(|((next, bar), weight)| weighted_sq_norm(&(next - bar), weight))
            .collect();
        let meas = self
            .measurements
            .iter()
            .zip(&meas_bar)
            .zip(&lin.meas_cov_inv)
            .map(|((y, bar), weight)| {
                if is_missing(y) {
                    0.0
                } else {
                    weighted_sq_norm(&(y - bar), weight)
                }
            })
            .collect();
        Ok(CostTerms { prior, motion, meas })
    }

    fn check_lengths(&self, means: &[Vector], lin: &LinearizationCache) -> Result<()> {
        for (context, actual) in [("trajectory", means.len()), ("linearization cache", lin.len())] {
            if actual != self.measurements.len() {
                return Err(SmootherError::DimensionMismatch {
                    context: format!("{context} length in cost"),
                    expected: self.measurements.len(),
                    actual,
                });
            }
        }
        if means.is_empty() {
            return Err(SmootherError::InvalidParameters("cost of an empty trajectory".to_string()));
        }
        Ok(())
    }

    /// Mapped means at `means`, reusing the cache when it was computed there
    fn bars(&self, means: &[Vector], lin: &LinearizationCache) -> Result<(Vec<Vector>, Vec<Vector>)> {
        if lin.computed_at(means) {
            return Ok((lin.motion_bar.clone(), lin.meas_bar.clone()));
        }
        let motion_bar = means[..means.len() - 1]
            .iter()
            .zip(&lin.covs)
            .enumerate()
            .map(|(idx, (mean, cov))| {
                <L as Linearizer<Mo>>::mapped_mean(self.linearizer, self.motion_model, mean, cov, idx + 1)
            })
            .collect::<Result<Vec<_>>>()?;
        let meas_bar = means
            .iter()
            .zip(&lin.covs)
            .enumerate()
            .map(|(idx, (mean, cov))| {
                <L as Linearizer<Me>>::mapped_mean(self.linearizer, self.meas_model, mean, cov, idx + 1)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok((motion_bar, meas_bar))
    }
}

impl<'a, Mo, Me, L> CostFunction for SmoothingCost<'a, Mo, Me, L>
where
    Mo: MotionModel + ?Sized,
    Me: MeasModel + ?Sized,
    L: Linearizer<Mo> + Linearizer<Me> + ?Sized,
{
    fn cost(&self, means: &[Vector], lin: &LinearizationCache) -> Result<f64> {
        self.cost_terms(means, lin).map(|terms| terms.total())
    }

    fn dir_der(&self, means: &[Vector], direction: &[Vector], lin: &LinearizationCache) -> Result<f64> {
        self.check_lengths(means, lin)?;
        if direction.len() != means.len() {
            return Err(SmootherError::DimensionMismatch {
                context: "search direction length".to_string(),
                expected: means.len(),
                actual: direction.len(),
            });
        }
        let (motion_bar, meas_bar) = self.bars(means, lin)?;

        let mut grad: Vec<Vector> = means.iter().map(|m| Vector::zeros(m.len())).collect();
        grad[0] += &self.prior_cov_inv * (&means[0] - &self.prior_mean) * 2.0;
        for idx in 0..means.len() - 1 {
            let weighted = &lin.motion_cov_inv[idx] * (&means[idx + 1] - &motion_bar[idx]) * 2.0;
            grad[idx] -= lin.motion[idx].a.transpose() * &weighted;
            grad[idx + 1] += weighted;
        }
        for (idx, y) in self.measurements.iter().enumerate() {
            if is_missing(y) {
                continue;
            }
            let weighted = &lin.meas_cov_inv[idx] * (y - &meas_bar[idx]) * 2.0;
            grad[idx] -= lin.meas[idx].a.transpose() * weighted;
        }
        Ok(grad.iter().zip(direction).map(|(g, p)| g.dot(p)).sum())
    }
}

/// Cost augmented with the Levenberg-Marquardt penalty `lambda |x - x_prev|^2`
pub struct LmRegularizedCost<'a, C: ?Sized> {
    inner: &'a C,
    lambda: f64,
    prev_means: &'a [Vector],
}

impl<'a, C: CostFunction + ?Sized> LmRegularizedCost<'a, C> {
    pub fn new(inner: &'a C, lambda: f64, prev_means: &'a [Vector]) -> Self {
        Self {
            inner,
            lambda,
            prev_means,
        }
    }

    /// The damping term `lambda |x - x_prev|^2` alone
    pub fn penalty(&self, means: &[Vector]) -> f64 {
        let dist: f64 = means.iter().zip(self.prev_means).map(|(m, prev)| (m - prev).norm_squared()).sum();
        self.lambda * dist
    }
}

impl<C: CostFunction + ?Sized> CostFunction for LmRegularizedCost<'_, C> {
    fn cost(&self, means: &[Vector], lin: &LinearizationCache) -> Result<f64> {
        Ok(self.inner.cost(means, lin)? + self.penalty(means))
    }

    fn dir_der(&self, means: &[Vector], direction: &[Vector], lin: &LinearizationCache) -> Result<f64> {
        let penalty_der: f64 = means
            .iter()
            .zip(self.prev_means)
            .zip(direction)
            .map(|((m, prev), p)| 2.0 * self.lambda * (m - prev).dot(p))
            .sum();
        Ok(self.inner.dir_der(means, direction, lin)? + penalty_der)
    }
}

/// Cost that is never evaluated, for plain Gauss-Newton runs
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopCost;

impl CostFunction for NoopCost {
    fn cost(&self, _means: &[Vector], _lin: &LinearizationCache) -> Result<f64> {
        Ok(0.0)
    }

    fn dir_der(&self, _means: &[Vector], _direction: &[Vector], _lin: &LinearizationCache) -> Result<f64> {
        Ok(0.0)
    }

    fn evaluates(&self) -> bool {
        false
    }
}
