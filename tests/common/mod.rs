#![allow(dead_code)]

use post_lin_smooth::models::{CoordTurn, MeasModel, Model, MotionModel, MultiSensorRange};
use post_lin_smooth::{Matrix, Vector};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::StandardNormal;

pub fn sample_gaussian<R: Rng>(mean: &Vector, cov: &Matrix, rng: &mut R) -> Vector {
    let chol = cov.clone().cholesky().expect("covariance must be positive definite").l();
    let z = Vector::from_fn(mean.len(), |_, _| rng.sample::<f64, _>(StandardNormal));
    mean + chol * z
}

/// Simulate `num_steps` measurements along a trajectory starting at `x1`
///
/// With `proc_noise` false the states follow the noise-free motion model.
pub fn simulate<Mo, Me, R>(
    motion: &Mo,
    meas: &Me,
    x1: &Vector,
    num_steps: usize,
    proc_noise: bool,
    rng: &mut R,
) -> (Vec<Vector>, Vec<Vector>)
where
    Mo: MotionModel,
    Me: MeasModel,
    R: Rng,
{
    let mut states = Vec::with_capacity(num_steps);
    let mut measurements = Vec::with_capacity(num_steps);
    let mut state = x1.clone();
    for k in 1..=num_steps {
        let z = meas.mapping(&state, k);
        measurements.push(sample_gaussian(&z, &meas.meas_noise(k), rng));
        states.push(state.clone());
        let next = motion.mapping(&state, k);
        state = if proc_noise {
            sample_gaussian(&next, &motion.proc_noise(k), rng)
        } else {
            next
        };
    }
    (states, measurements)
}

pub struct CoordTurnSetup {
    pub motion: CoordTurn,
    pub meas: MultiSensorRange,
    pub states: Vec<Vector>,
    pub measurements: Vec<Vector>,
    pub m1: Vector,
    pub p1: Matrix,
}

/// Two range sensors tracking a coordinated turn, as in the LM-IEKS experiments
///
/// The ground truth turns at a constant rate so that every smoother run
/// stays well conditioned.
pub fn coord_turn_setup(num_steps: usize, seed: u64) -> CoordTurnSetup {
    let dt = 0.01;
    let motion = CoordTurn::new(dt, CoordTurn::paper_proc_noise(dt, 0.01, 10.0));
    let meas = MultiSensorRange::new(vec![[-1.5, 0.5], [1.0, 1.0]], Matrix::identity(2, 2) * 0.25);
    let m1 = Vector::from_vec(vec![0.0, 0.0, 1.0, 0.0, 0.0]);
    let p1 = Matrix::from_diagonal(&Vector::from_vec(vec![0.1, 0.1, 1.0, 1.0, 1.0]));
    let x1 = Vector::from_vec(vec![0.0, 0.0, 1.0, 0.0, 0.5]);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let (states, measurements) = simulate(&motion, &meas, &x1, num_steps, false, &mut rng);
    CoordTurnSetup {
        motion,
        meas,
        states,
        measurements,
        m1,
        p1,
    }
}

pub fn assert_non_increasing(trace: &[f64], tol: f64) {
    for (idx, pair) in trace.windows(2).enumerate() {
        assert!(
            pair[1] <= pair[0] + tol,
            "cost increased at iteration {}: {} -> {}",
            idx + 2,
            pair[0],
            pair[1]
        );
    }
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
