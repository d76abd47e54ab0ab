//! Iterated smoothers
//!
//! Each outer iteration linearizes both models around the current
//! trajectory, runs the Kalman filter and RTS smoother on the linearized
//! system and decides whether (and how far) to move to the result.
//!
//! - Gauss-Newton (IEKS / IPLS) always moves to the new smoothed estimate.
//! - Levenberg-Marquardt (LM-IEKS / LM-IPLS) damps the filter towards the
//!   current iterate and only accepts candidates that lower the cost.
//! - Line search (LS-IEKS / LS-IPLS) moves a fraction of the way, chosen by
//!   Armijo backtracking.

use log::{debug, info, trace, warn};

use super::line_search::ArmijoLineSearch;
use super::one_pass::OnePassSmoother;
use crate::cost::{CostFunction, LmRegularizedCost, SmoothingCost};
use crate::error::{Result, SmootherError};
use crate::filters::{rts_smooth, KalmanFilter, LinearizationSource, LmDamping};
use crate::linearization::{Analytical, LinearizationCache, Linearizer, Slr};
use crate::models::{MeasModel, MotionModel};
use crate::types::{Matrix, Trajectory, Vector};

/// Levenberg-Marquardt settings
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LmParams {
    /// Initial damping
    pub lambda: f64,
    /// Damping is divided by `nu` on success and multiplied on failure
    pub nu: f64,
    /// Candidates tried per outer iteration before giving up
    pub cost_improv_iter_lim: usize,
}

impl Default for LmParams {
    fn default() -> Self {
        Self {
            lambda: 1e-2,
            nu: 10.0,
            cost_improv_iter_lim: 10,
        }
    }
}

impl LmParams {
    pub fn validate(&self) -> Result<()> {
        if self.lambda.is_nan() || self.lambda <= 0.0 {
            return Err(SmootherError::InvalidParameters(format!(
                "LM damping must be positive, got {}",
                self.lambda
            )));
        }
        if self.nu.is_nan() || self.nu <= 1.0 {
            return Err(SmootherError::InvalidParameters(format!(
                "LM damping factor nu must be > 1, got {}",
                self.nu
            )));
        }
        if self.cost_improv_iter_lim == 0 {
            return Err(SmootherError::InvalidParameters(
                "LM needs at least one candidate per iteration".to_string(),
            ));
        }
        Ok(())
    }
}

/// How an outer iteration moves from the current trajectory
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum IterationControl {
    GaussNewton,
    LevenbergMarquardt(LmParams),
    LineSearch(ArmijoLineSearch),
}

impl IterationControl {
    fn validate(&self) -> Result<()> {
        match self {
            IterationControl::GaussNewton => Ok(()),
            IterationControl::LevenbergMarquardt(params) => params.validate(),
            IterationControl::LineSearch(search) => search.validate(),
        }
    }

    fn needs_cost(&self) -> bool {
        !matches!(self, IterationControl::GaussNewton)
    }
}

/// Result of an iterated smoother run
#[derive(Clone, Debug)]
pub struct SmoothingOutput {
    /// Filter estimates of the pass that produced the final iterate
    pub filtered: Trajectory,
    pub smoothed: Trajectory,
    /// Cost after each outer iteration
    pub cost_trace: Vec<f64>,
    /// Smoothed trajectory after each outer iteration, aligned with `cost_trace`
    pub iterations: Vec<Trajectory>,
    /// Damping at the end of the run (LM only)
    pub lambda: Option<f64>,
}

/// State carried between outer iterations of one run
struct IterationContext {
    current: Trajectory,
    filtered: Trajectory,
    lin: LinearizationCache,
    cost: f64,
    lambda: Option<f64>,
    cost_trace: Vec<f64>,
    iterations: Vec<Trajectory>,
}

impl IterationContext {
    fn record(&mut self) {
        self.cost_trace.push(self.cost);
        self.iterations.push(self.current.clone());
    }

    fn into_output(self) -> SmoothingOutput {
        SmoothingOutput {
            filtered: self.filtered,
            smoothed: self.current,
            cost_trace: self.cost_trace,
            iterations: self.iterations,
            lambda: self.lambda,
        }
    }
}

/// Outcome of a single outer iteration
enum Step {
    Continue,
    /// No acceptable candidate, stop and keep the current iterate
    Stalled,
}

pub struct IteratedSmoother<'a, Mo: ?Sized, Me: ?Sized, L> {
    motion_model: &'a Mo,
    meas_model: &'a Me,
    linearizer: L,
    control: IterationControl,
    num_iter: usize,
}

impl<'a, Mo, Me, L> IteratedSmoother<'a, Mo, Me, L>
where
    Mo: MotionModel + ?Sized,
    Me: MeasModel + ?Sized,
    L: Linearizer<Mo> + Linearizer<Me>,
{
    pub fn new(
        motion_model: &'a Mo,
        meas_model: &'a Me,
        linearizer: L,
        control: IterationControl,
        num_iter: usize,
    ) -> Result<Self> {
        if num_iter == 0 {
            return Err(SmootherError::InvalidParameters("num_iter must be at least 1".to_string()));
        }
        control.validate()?;
        Ok(Self {
            motion_model,
            meas_model,
            linearizer,
            control,
            num_iter,
        })
    }

    pub fn num_iter(&self) -> usize {
        self.num_iter
    }

    pub fn control(&self) -> &IterationControl {
        &self.control
    }

    pub fn linearizer(&self) -> &L {
        &self.linearizer
    }

    /// The smoothing cost matching this smoother's models and linearization
    pub fn smoothing_cost<'s>(
        &'s self,
        measurements: &'s [Vector],
        m1: &Vector,
        p1: &Matrix,
    ) -> Result<SmoothingCost<'s, Mo, Me, L>> {
        SmoothingCost::new(self.motion_model, self.meas_model, &self.linearizer, measurements, m1, p1)
    }

    /// Run all iterations
    ///
    /// The first iteration is the one-pass smoother (EKS for analytical,
    /// PrLS for SLR linearization), iterations `2..=num_iter` re-linearize
    /// around the previous iterate.
    pub fn filter_and_smooth<C: CostFunction + ?Sized>(
        &self,
        measurements: &[Vector],
        m1: &Vector,
        p1: &Matrix,
        cost_fn: &C,
    ) -> Result<SmoothingOutput> {
        self.check_cost_fn(cost_fn)?;
        info!("Iter: 1/{}", self.num_iter);
        let first = OnePassSmoother::new(self.motion_model, self.meas_model, &self.linearizer)
            .filter_and_smooth(measurements, m1, p1)?;
        let lin = self.linearize(&first.smoothed)?;
        let cost = cost_fn.cost(&first.smoothed.means, &lin)?;
        debug!("Cost: {cost:.6e}");

        let mut ctx = IterationContext {
            current: first.smoothed,
            filtered: first.filtered,
            lin,
            cost,
            lambda: self.initial_lambda(),
            cost_trace: Vec::with_capacity(self.num_iter),
            iterations: Vec::with_capacity(self.num_iter),
        };
        ctx.record();
        self.run(measurements, m1, p1, cost_fn, ctx, 2)
    }

    /// Run iterations `start_iter..=num_iter`, starting by linearizing around `init_traj`
    ///
    /// SLR linearizations read the covariances of `init_traj`, which must
    /// then be positive definite.
    pub fn filter_and_smooth_with_init_traj<C: CostFunction + ?Sized>(
        &self,
        measurements: &[Vector],
        m1: &Vector,
        p1: &Matrix,
        init_traj: &Trajectory,
        start_iter: usize,
        cost_fn: &C,
    ) -> Result<SmoothingOutput> {
        self.check_cost_fn(cost_fn)?;
        if start_iter == 0 || start_iter > self.num_iter {
            return Err(SmootherError::InvalidParameters(format!(
                "start_iter must be in 1..={}, got {start_iter}",
                self.num_iter
            )));
        }
        if init_traj.len() != measurements.len() {
            return Err(SmootherError::DimensionMismatch {
                context: "initial trajectory length".to_string(),
                expected: measurements.len(),
                actual: init_traj.len(),
            });
        }
        KalmanFilter::new(self.motion_model, self.meas_model, &self.linearizer).check_inputs(measurements, m1, p1)?;
        if init_traj.state_dim() != m1.len() {
            return Err(SmootherError::DimensionMismatch {
                context: "initial trajectory state dimension".to_string(),
                expected: m1.len(),
                actual: init_traj.state_dim(),
            });
        }

        if <L as Linearizer<Mo>>::uses_covariance(&self.linearizer)
            && init_traj.covs.iter().any(|cov| cov.clone().cholesky().is_none())
        {
            return Err(SmootherError::InvalidParameters(
                "SLR linearization needs positive definite covariances in the initial trajectory".to_string(),
            ));
        }

        let lin = self.linearize(init_traj)?;
        let cost = cost_fn.cost(&init_traj.means, &lin)?;
        debug!("Initial cost: {cost:.6e}");
        let num_recorded = self.num_iter - start_iter + 1;
        let ctx = IterationContext {
            current: init_traj.clone(),
            filtered: init_traj.clone(),
            lin,
            cost,
            lambda: self.initial_lambda(),
            cost_trace: Vec::with_capacity(num_recorded),
            iterations: Vec::with_capacity(num_recorded),
        };
        self.run(measurements, m1, p1, cost_fn, ctx, start_iter)
    }

    fn run<C: CostFunction + ?Sized>(
        &self,
        measurements: &[Vector],
        m1: &Vector,
        p1: &Matrix,
        cost_fn: &C,
        mut ctx: IterationContext,
        start_iter: usize,
    ) -> Result<SmoothingOutput> {
        for iter in start_iter..=self.num_iter {
            info!("Iter: {iter}/{}", self.num_iter);
            let step = match self.control {
                IterationControl::GaussNewton => self.gauss_newton_step(measurements, m1, p1, cost_fn, &mut ctx)?,
                IterationControl::LevenbergMarquardt(params) => {
                    self.lm_step(measurements, m1, p1, cost_fn, &params, &mut ctx)?
                }
                IterationControl::LineSearch(search) => {
                    self.line_search_step(measurements, m1, p1, cost_fn, &search, &mut ctx)?
                }
            };
            match step {
                Step::Continue => {
                    debug!("Cost: {:.6e}", ctx.cost);
                    ctx.record();
                }
                Step::Stalled => {
                    warn!("Terminating at iteration {iter}: no cost improvement, returning best iterate");
                    for _ in iter..=self.num_iter {
                        ctx.record();
                    }
                    break;
                }
            }
        }
        Ok(ctx.into_output())
    }

    fn gauss_newton_step<C: CostFunction + ?Sized>(
        &self,
        measurements: &[Vector],
        m1: &Vector,
        p1: &Matrix,
        cost_fn: &C,
        ctx: &mut IterationContext,
    ) -> Result<Step> {
        let (filtered, smoothed) = self.linearized_pass(measurements, m1, p1, &ctx.lin, None)?;
        let lin = self.linearize(&smoothed)?;
        ctx.cost = cost_fn.cost(&smoothed.means, &lin)?;
        ctx.current = smoothed;
        ctx.filtered = filtered;
        ctx.lin = lin;
        Ok(Step::Continue)
    }

    fn lm_step<C: CostFunction + ?Sized>(
        &self,
        measurements: &[Vector],
        m1: &Vector,
        p1: &Matrix,
        cost_fn: &C,
        params: &LmParams,
        ctx: &mut IterationContext,
    ) -> Result<Step> {
        let mut lambda = ctx.lambda.unwrap_or(params.lambda);
        for attempt in 1..=params.cost_improv_iter_lim {
            let damping = LmDamping {
                lambda,
                prev_means: &ctx.current.means,
            };
            let (filtered, smoothed) = self.linearized_pass(measurements, m1, p1, &ctx.lin, Some(damping))?;
            let lin = self.linearize(&smoothed)?;
            let cost = cost_fn.cost(&smoothed.means, &lin)?;
            let damped = cost + LmRegularizedCost::new(cost_fn, lambda, &ctx.current.means).penalty(&smoothed.means);
            trace!("LM: candidate {attempt} damped cost {damped:.6e}");

            if cost < ctx.cost {
                lambda /= params.nu;
                debug!("LM: accepted candidate {attempt}, cost {cost:.6e}, lambda -> {lambda:.3e}");
                ctx.lambda = Some(lambda);
                ctx.cost = cost;
                ctx.current = smoothed;
                ctx.filtered = filtered;
                ctx.lin = lin;
                return Ok(Step::Continue);
            }
            lambda *= params.nu;
            debug!("LM: rejected candidate {attempt}, cost {cost:.6e} >= {:.6e}, lambda -> {lambda:.3e}", ctx.cost);
        }
        ctx.lambda = Some(lambda);
        warn!("LM: no cost improvement after {} candidates", params.cost_improv_iter_lim);
        Ok(Step::Stalled)
    }

    fn line_search_step<C: CostFunction + ?Sized>(
        &self,
        measurements: &[Vector],
        m1: &Vector,
        p1: &Matrix,
        cost_fn: &C,
        search: &ArmijoLineSearch,
        ctx: &mut IterationContext,
    ) -> Result<Step> {
        let (filtered, candidate) = self.linearized_pass(measurements, m1, p1, &ctx.lin, None)?;
        let direction: Vec<Vector> = candidate.means.iter().zip(&ctx.current.means).map(|(c, x)| c - x).collect();
        let step = search.search(cost_fn, &ctx.current.means, ctx.cost, &direction, &ctx.lin)?;
        if step.alpha == 0.0 {
            return Ok(Step::Continue);
        }

        let next = Trajectory {
            means: step.means,
            covs: candidate.covs,
        };
        let lin = self.linearize(&next)?;
        ctx.cost = cost_fn.cost(&next.means, &lin)?;
        ctx.current = next;
        ctx.filtered = filtered;
        ctx.lin = lin;
        Ok(Step::Continue)
    }

    /// Filter and smooth with the models linearized in `lin`
    fn linearized_pass(
        &self,
        measurements: &[Vector],
        m1: &Vector,
        p1: &Matrix,
        lin: &LinearizationCache,
        damping: Option<LmDamping<'_>>,
    ) -> Result<(Trajectory, Trajectory)> {
        let kf = KalmanFilter::new(self.motion_model, self.meas_model, &self.linearizer);
        let filter_out = kf.filter_seq_with(measurements, m1, p1, LinearizationSource::Fixed(lin), damping)?;
        let smoothed = rts_smooth(&filter_out)?;
        let filtered = Trajectory {
            means: filter_out.filter_means,
            covs: filter_out.filter_covs,
        };
        Ok((filtered, smoothed))
    }

    fn linearize(&self, traj: &Trajectory) -> Result<LinearizationCache> {
        LinearizationCache::compute(self.motion_model, self.meas_model, &self.linearizer, traj)
    }

    fn initial_lambda(&self) -> Option<f64> {
        match self.control {
            IterationControl::LevenbergMarquardt(params) => Some(params.lambda),
            _ => None,
        }
    }

    fn check_cost_fn<C: CostFunction + ?Sized>(&self, cost_fn: &C) -> Result<()> {
        if self.control.needs_cost() && !cost_fn.evaluates() {
            return Err(SmootherError::InvalidParameters(
                "Levenberg-Marquardt and line search need an evaluated cost function".to_string(),
            ));
        }
        Ok(())
    }
}

impl<'a, Mo, Me> IteratedSmoother<'a, Mo, Me, Analytical>
where
    Mo: MotionModel + ?Sized,
    Me: MeasModel + ?Sized,
    Analytical: Linearizer<Mo> + Linearizer<Me>,
{
    /// Iterated extended Kalman smoother
    pub fn ieks(motion_model: &'a Mo, meas_model: &'a Me, num_iter: usize) -> Result<Self> {
        Self::new(motion_model, meas_model, Analytical, IterationControl::GaussNewton, num_iter)
    }

    pub fn lm_ieks(motion_model: &'a Mo, meas_model: &'a Me, num_iter: usize, params: LmParams) -> Result<Self> {
        Self::new(
            motion_model,
            meas_model,
            Analytical,
            IterationControl::LevenbergMarquardt(params),
            num_iter,
        )
    }

    pub fn ls_ieks(
        motion_model: &'a Mo,
        meas_model: &'a Me,
        num_iter: usize,
        search: ArmijoLineSearch,
    ) -> Result<Self> {
        Self::new(motion_model, meas_model, Analytical, IterationControl::LineSearch(search), num_iter)
    }
}

impl<'a, Mo, Me, S> IteratedSmoother<'a, Mo, Me, S>
where
    Mo: MotionModel + ?Sized,
    Me: MeasModel + ?Sized,
    S: Slr + Linearizer<Mo> + Linearizer<Me>,
{
    /// Iterated posterior linearization smoother
    pub fn ipls(motion_model: &'a Mo, meas_model: &'a Me, slr: S, num_iter: usize) -> Result<Self> {
        Self::new(motion_model, meas_model, slr, IterationControl::GaussNewton, num_iter)
    }

    pub fn lm_ipls(motion_model: &'a Mo, meas_model: &'a Me, slr: S, num_iter: usize, params: LmParams) -> Result<Self> {
        Self::new(
            motion_model,
            meas_model,
            slr,
            IterationControl::LevenbergMarquardt(params),
            num_iter,
        )
    }

    pub fn ls_ipls(
        motion_model: &'a Mo,
        meas_model: &'a Me,
        slr: S,
        num_iter: usize,
        search: ArmijoLineSearch,
    ) -> Result<Self> {
        Self::new(motion_model, meas_model, slr, IterationControl::LineSearch(search), num_iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cost::NoopCost;
    use crate::linearization::SigmaPointSlr;
    use crate::models::{AffineModel, CoordTurn, MultiSensorRange};
    use approx::assert_relative_eq;

    fn scalar(x: f64) -> Vector {
        Vector::from_vec(vec![x])
    }

    fn linear_setup() -> (AffineModel, AffineModel, Vec<Vector>) {
        let motion = AffineModel::linear(Matrix::identity(1, 1) * 0.95, Matrix::identity(1, 1) * 0.2).unwrap();
        let meas = AffineModel::linear(Matrix::identity(1, 1), Matrix::identity(1, 1) * 0.5).unwrap();
        let measurements = [0.2, 0.1, f64::NAN, -0.3, 0.4].iter().map(|&y| scalar(y)).collect();
        (motion, meas, measurements)
    }

    fn ct_setup() -> (CoordTurn, MultiSensorRange, Vec<Vector>, Vector, Matrix) {
        let dt = 0.1;
        let motion = CoordTurn::new(dt, CoordTurn::paper_proc_noise(dt, 0.01, 10.0));
        let meas = MultiSensorRange::new(vec![[-1.5, 0.5], [1.0, 1.0]], Matrix::identity(2, 2) * 0.25);
        // constant turn rate ground truth, noise-free ranges
        let mut state = Vector::from_vec(vec![0.0, 0.0, 1.0, 0.0, 0.5]);
        let mut measurements = Vec::new();
        for k in 1..=20 {
            measurements.push(crate::models::Model::mapping(&meas, &state, k));
            state = crate::models::Model::mapping(&motion, &state, k);
        }
        let m1 = Vector::from_vec(vec![0.0, 0.0, 1.0, 0.0, 0.0]);
        let p1 = Matrix::from_diagonal(&Vector::from_vec(vec![0.1, 0.1, 1.0, 1.0, 1.0]));
        (motion, meas, measurements, m1, p1)
    }

    #[test]
    fn test_rejects_zero_iterations() {
        let (motion, meas, _) = linear_setup();
        assert!(IteratedSmoother::ieks(&motion, &meas, 0).is_err());
    }

    #[test]
    fn test_rejects_bad_lm_params() {
        let (motion, meas, _) = linear_setup();
        let params = LmParams {
            nu: 1.0,
            ..LmParams::default()
        };
        assert!(IteratedSmoother::lm_ieks(&motion, &meas, 3, params).is_err());
    }

    #[test]
    fn test_lm_needs_real_cost() {
        let (motion, meas, measurements) = linear_setup();
        let smoother = IteratedSmoother::lm_ieks(&motion, &meas, 3, LmParams::default()).unwrap();
        let res = smoother.filter_and_smooth(&measurements, &scalar(0.0), &Matrix::identity(1, 1), &NoopCost);
        assert!(matches!(res, Err(SmootherError::InvalidParameters(_))));
    }

    #[test]
    fn test_ieks_linear_converges_in_one_iteration() {
        let (motion, meas, measurements) = linear_setup();
        let smoother = IteratedSmoother::ieks(&motion, &meas, 3).unwrap();
        let m1 = scalar(0.0);
        let p1 = Matrix::identity(1, 1);
        let out = smoother.filter_and_smooth(&measurements, &m1, &p1, &NoopCost).unwrap();
        assert_eq!(out.cost_trace.len(), 3);
        assert_eq!(out.iterations.len(), 3);
        for (a, b) in out.iterations[0].means.iter().zip(&out.iterations[2].means) {
            assert!((a - b).norm() < 1e-10);
        }
        assert!(out.lambda.is_none());
    }

    #[test]
    fn test_init_traj_trace_length() {
        let (motion, meas, measurements) = linear_setup();
        let smoother = IteratedSmoother::ieks(&motion, &meas, 4).unwrap();
        let p1 = Matrix::identity(1, 1);
        let init = Trajectory::zeros(measurements.len(), &p1);
        let cost = smoother.smoothing_cost(&measurements, &scalar(0.0), &p1).unwrap();
        let out = smoother
            .filter_and_smooth_with_init_traj(&measurements, &scalar(0.0), &p1, &init, 2, &cost)
            .unwrap();
        assert_eq!(out.cost_trace.len(), 3);
    }

    #[test]
    fn test_init_traj_rejects_bad_start() {
        let (motion, meas, measurements) = linear_setup();
        let smoother = IteratedSmoother::ieks(&motion, &meas, 2).unwrap();
        let p1 = Matrix::identity(1, 1);
        let init = Trajectory::zeros(measurements.len(), &p1);
        let res = smoother.filter_and_smooth_with_init_traj(&measurements, &scalar(0.0), &p1, &init, 3, &NoopCost);
        assert!(res.is_err());
        let short = Trajectory::zeros(2, &p1);
        let res = smoother.filter_and_smooth_with_init_traj(&measurements, &scalar(0.0), &p1, &short, 1, &NoopCost);
        assert!(matches!(res, Err(SmootherError::DimensionMismatch { .. })));
    }

    #[test]
    fn test_ipls_init_traj_needs_covariances() {
        let (motion, meas, measurements) = linear_setup();
        let smoother = IteratedSmoother::ipls(&motion, &meas, SigmaPointSlr::cubature(), 2).unwrap();
        let init = Trajectory::zeros(measurements.len(), &Matrix::zeros(1, 1));
        let res = smoother.filter_and_smooth_with_init_traj(
            &measurements,
            &scalar(0.0),
            &Matrix::identity(1, 1),
            &init,
            1,
            &NoopCost,
        );
        assert!(matches!(res, Err(SmootherError::InvalidParameters(_))));
    }

    /// Cost that no candidate can improve on
    struct FlatCost;

    impl CostFunction for FlatCost {
        fn cost(&self, _means: &[Vector], _lin: &LinearizationCache) -> Result<f64> {
            Ok(1.0)
        }

        fn dir_der(&self, _means: &[Vector], _direction: &[Vector], _lin: &LinearizationCache) -> Result<f64> {
            Ok(0.0)
        }
    }

    #[test]
    fn test_lm_stall_pads_trace_and_snapshots() {
        let (motion, meas, measurements) = linear_setup();
        let params = LmParams {
            cost_improv_iter_lim: 2,
            ..LmParams::default()
        };
        let smoother = IteratedSmoother::lm_ieks(&motion, &meas, 6, params).unwrap();
        let out = smoother
            .filter_and_smooth(&measurements, &scalar(0.0), &Matrix::identity(1, 1), &FlatCost)
            .unwrap();

        assert_eq!(out.cost_trace, vec![1.0; 6]);
        assert_eq!(out.iterations.len(), 6);
        for snapshot in &out.iterations[1..] {
            assert_eq!(snapshot, &out.iterations[0]);
        }
        assert_eq!(out.smoothed, out.iterations[0]);
        // both candidates of iteration 2 rejected: 1e-2 * 10 * 10
        assert_relative_eq!(out.lambda.unwrap(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_prior_dimension_checked_before_models_run() {
        let (motion, meas, measurements, _, _) = ct_setup();
        let smoother = IteratedSmoother::ieks(&motion, &meas, 2).unwrap();
        let m1 = Vector::from_vec(vec![0.0, 0.0, 1.0]);
        let p1 = Matrix::identity(3, 3);
        let cost = smoother.smoothing_cost(&measurements, &m1, &p1).unwrap();

        let res = smoother.filter_and_smooth(&measurements, &m1, &p1, &cost);
        assert!(matches!(res, Err(SmootherError::DimensionMismatch { .. })));

        let init = Trajectory::zeros(measurements.len(), &p1);
        let res = smoother.filter_and_smooth_with_init_traj(&measurements, &m1, &p1, &init, 1, &cost);
        assert!(matches!(res, Err(SmootherError::DimensionMismatch { .. })));
    }

    #[test]
    fn test_lm_ieks_cost_non_increasing() {
        let (motion, meas, measurements, m1, p1) = ct_setup();
        let smoother = IteratedSmoother::lm_ieks(&motion, &meas, 8, LmParams::default()).unwrap();
        let cost = smoother.smoothing_cost(&measurements, &m1, &p1).unwrap();
        let out = smoother.filter_and_smooth(&measurements, &m1, &p1, &cost).unwrap();
        assert_eq!(out.cost_trace.len(), 8);
        for pair in out.cost_trace.windows(2) {
            assert!(pair[1] <= pair[0]);
        }
        assert!(out.lambda.is_some());
    }

    #[test]
    fn test_ls_ieks_cost_non_increasing() {
        let (motion, meas, measurements, m1, p1) = ct_setup();
        let smoother = IteratedSmoother::ls_ieks(&motion, &meas, 6, ArmijoLineSearch::default()).unwrap();
        let cost = smoother.smoothing_cost(&measurements, &m1, &p1).unwrap();
        let out = smoother.filter_and_smooth(&measurements, &m1, &p1, &cost).unwrap();
        // analytical cost does not depend on the linearization, so accepted steps decrease it
        for pair in out.cost_trace.windows(2) {
            assert!(pair[1] <= pair[0] + 1e-9);
        }
    }

    #[test]
    fn test_ipls_runs() {
        let (motion, meas, measurements, m1, p1) = ct_setup();
        let smoother = IteratedSmoother::ipls(&motion, &meas, SigmaPointSlr::cubature(), 3).unwrap();
        let cost = smoother.smoothing_cost(&measurements, &m1, &p1).unwrap();
        let out = smoother.filter_and_smooth(&measurements, &m1, &p1, &cost).unwrap();
        assert_eq!(out.smoothed.len(), measurements.len());
        assert!(out.cost_trace.iter().all(|c| c.is_finite()));
    }
}
