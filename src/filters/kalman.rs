/// Kalman filter over linearized models
///
/// Time steps are 1-based. The prior is on `x_1`, so the first step is an
/// update without prediction. The prediction of `x_k` uses motion step `k-1`.
use log::trace;

use crate::error::{try_inverse, Result, SmootherError};
use crate::linearization::{LinearParams, LinearizationCache, Linearizer};
use crate::models::{MeasModel, MotionModel};
use crate::types::{is_missing, symmetrize, Matrix, Vector};

/// Where the filter gets its linearizations from
#[derive(Clone, Copy, Debug)]
pub enum LinearizationSource<'c> {
    /// Linearize at the running estimate: motion at `m_{k-1|k-1}`,
    /// measurement at `m_{k|k-1}` (EKF / prior linearization filter)
    Adaptive,
    /// Use a precomputed linearization of a previous iterate
    Fixed(&'c LinearizationCache),
}

/// Levenberg-Marquardt damping towards the previous iterate
///
/// Implemented as an extra measurement `prev_means[k]` of `x_k` with noise
/// covariance `I / lambda` after every regular update.
#[derive(Clone, Copy, Debug)]
pub struct LmDamping<'p> {
    pub lambda: f64,
    pub prev_means: &'p [Vector],
}

#[derive(Clone, Debug)]
pub struct FilterOutput {
    pub filter_means: Vec<Vector>,
    pub filter_covs: Vec<Matrix>,
    pub pred_means: Vec<Vector>,
    pub pred_covs: Vec<Matrix>,
    /// Motion linearization used for each prediction, `K - 1` entries.
    /// Entry `k - 1` maps `x_k` to `x_{k+1}`.
    pub motion_lin: Vec<LinearParams>,
}

impl FilterOutput {
    pub fn len(&self) -> usize {
        self.filter_means.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filter_means.is_empty()
    }
}

pub struct KalmanFilter<'a, Mo: ?Sized, Me: ?Sized, L: ?Sized> {
    motion_model: &'a Mo,
    meas_model: &'a Me,
    linearizer: &'a L,
}

impl<'a, Mo, Me, L> KalmanFilter<'a, Mo, Me, L>
where
    Mo: MotionModel + ?Sized,
    Me: MeasModel + ?Sized,
    L: Linearizer<Mo> + Linearizer<Me> + ?Sized,
{
    pub fn new(motion_model: &'a Mo, meas_model: &'a Me, linearizer: &'a L) -> Self {
        Self {
            motion_model,
            meas_model,
            linearizer,
        }
    }

    /// Filter linearizing at the running estimate
    pub fn filter_seq(&self, measurements: &[Vector], m1: &Vector, p1: &Matrix) -> Result<FilterOutput> {
        self.filter_seq_with(measurements, m1, p1, LinearizationSource::Adaptive, None)
    }

    pub fn filter_seq_with(
        &self,
        measurements: &[Vector],
        m1: &Vector,
        p1: &Matrix,
        source: LinearizationSource<'_>,
        damping: Option<LmDamping<'_>>,
    ) -> Result<FilterOutput> {
        self.check_inputs(measurements, m1, p1)?;
        let num_steps = measurements.len();
        if let LinearizationSource::Fixed(cache) = source {
            check_len("linearization cache", num_steps, cache.len())?;
        }
        if let Some(damping) = damping {
            if damping.lambda.is_nan() || damping.lambda <= 0.0 {
                return Err(SmootherError::InvalidParameters(format!(
                    "LM damping must be positive, got {}",
                    damping.lambda
                )));
            }
            check_len("LM previous means", num_steps, damping.prev_means.len())?;
        }

        let mut out = FilterOutput {
            filter_means: Vec::with_capacity(num_steps),
            filter_covs: Vec::with_capacity(num_steps),
            pred_means: Vec::with_capacity(num_steps),
            pred_covs: Vec::with_capacity(num_steps),
            motion_lin: Vec::with_capacity(num_steps.saturating_sub(1)),
        };

        for (idx, meas) in measurements.iter().enumerate() {
            let time_step = idx + 1;
            let (m_pred, p_pred) = match (out.filter_means.last(), out.filter_covs.last()) {
                (Some(m_prev), Some(p_prev)) => {
                    let motion = match source {
                        LinearizationSource::Adaptive => <L as Linearizer<Mo>>::linear_params(
                            self.linearizer,
                            self.motion_model,
                            m_prev,
                            p_prev,
                            time_step - 1,
                        )?,
                        LinearizationSource::Fixed(cache) => cache.motion[idx - 1].clone(),
                    };
                    let pred = predict(m_prev, p_prev, &motion, &self.motion_model.proc_noise(time_step - 1));
                    out.motion_lin.push(motion);
                    pred
                }
                _ => (m1.clone(), p1.clone()),
            };

            let (mut m, mut p) = (m_pred.clone(), p_pred.clone());
            if is_missing(meas) {
                trace!("step {time_step}: missing measurement, skipping update");
            } else {
                let meas_lin = match source {
                    LinearizationSource::Adaptive => <L as Linearizer<Me>>::linear_params(
                        self.linearizer,
                        self.meas_model,
                        &m_pred,
                        &p_pred,
                        time_step,
                    )?,
                    LinearizationSource::Fixed(cache) => cache.meas[idx].clone(),
                };
                (m, p) = update(meas, &m, &p, &meas_lin, &self.meas_model.meas_noise(time_step), time_step)?;
            }

            if let Some(damping) = damping {
                (m, p) = damping_update(&damping.prev_means[idx], &m, &p, damping.lambda, time_step)?;
            }

            out.pred_means.push(m_pred);
            out.pred_covs.push(p_pred);
            out.filter_means.push(m);
            out.filter_covs.push(p);
        }
        Ok(out)
    }

    pub(crate) fn check_inputs(&self, measurements: &[Vector], m1: &Vector, p1: &Matrix) -> Result<()> {
        if measurements.is_empty() {
            return Err(SmootherError::InvalidParameters("empty measurement sequence".to_string()));
        }
        let state_dim = self.motion_model.proc_noise(1).nrows();
        if m1.len() != state_dim {
            return Err(SmootherError::DimensionMismatch {
                context: "prior mean".to_string(),
                expected: state_dim,
                actual: m1.len(),
            });
        }
        if p1.nrows() != m1.len() || p1.ncols() != m1.len() {
            return Err(SmootherError::DimensionMismatch {
                context: "prior covariance".to_string(),
                expected: m1.len(),
                actual: p1.nrows().max(p1.ncols()),
            });
        }
        for (idx, meas) in measurements.iter().enumerate() {
            let expected = self.meas_model.meas_noise(idx + 1).nrows();
            if meas.len() != expected {
                return Err(SmootherError::DimensionMismatch {
                    context: format!("measurement at time step {}", idx + 1),
                    expected,
                    actual: meas.len(),
                });
            }
        }
        Ok(())
    }
}

/// `m = A m + b`, `P = A P A^T + Q + Omega`
pub fn predict(mean: &Vector, cov: &Matrix, lin: &LinearParams, proc_noise: &Matrix) -> (Vector, Matrix) {
    let pred_mean = lin.apply(mean);
    let pred_cov = &lin.a * cov * lin.a.transpose() + proc_noise + &lin.omega;
    (pred_mean, symmetrize(&pred_cov))
}

/// Measurement update with linearization `(H, c, Lambda)`
///
/// Uses the Joseph form `(I - KH) P (I - KH)^T + K (R + Lambda) K^T`.
pub fn update(
    meas: &Vector,
    mean: &Vector,
    cov: &Matrix,
    lin: &LinearParams,
    meas_noise: &Matrix,
    time_step: usize,
) -> Result<(Vector, Matrix)> {
    let h = &lin.a;
    let noise = meas_noise + &lin.omega;
    let innov_cov = h * cov * h.transpose() + &noise;
    let innov_cov_inv = try_inverse(&innov_cov, &format!("innovation covariance at time step {time_step}"))?;
    let gain = cov * h.transpose() * innov_cov_inv;

    let residual = meas - lin.apply(mean);
    let upd_mean = mean + &gain * residual;

    let i_kh = Matrix::identity(mean.len(), mean.len()) - &gain * h;
    let upd_cov = &i_kh * cov * i_kh.transpose() + &gain * noise * gain.transpose();
    Ok((upd_mean, symmetrize(&upd_cov)))
}

fn damping_update(prev_mean: &Vector, mean: &Vector, cov: &Matrix, lambda: f64, time_step: usize) -> Result<(Vector, Matrix)> {
    let dim = mean.len();
    let identity = LinearParams {
        a: Matrix::identity(dim, dim),
        b: Vector::zeros(dim),
        omega: Matrix::zeros(dim, dim),
    };
    update(prev_mean, mean, cov, &identity, &(Matrix::identity(dim, dim) / lambda), time_step)
}

fn check_len(context: &str, expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(SmootherError::DimensionMismatch {
            context: context.to_string(),
            expected,
            actual,
        });
    }
    Ok(())
}
