mod common;

use common::simulate;
use post_lin_smooth::models::AffineModel;
use post_lin_smooth::{IteratedSmoother, LmParams, Matrix, NoopCost, SigmaPointSlr, Trajectory, Vector};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

struct LinearSetup {
    a: Matrix,
    q: Matrix,
    h: Matrix,
    r: Matrix,
    motion: AffineModel,
    meas: AffineModel,
    measurements: Vec<Vector>,
    m1: Vector,
    p1: Matrix,
}

/// Constant velocity model with position measurements, two of them missing
fn setup() -> LinearSetup {
    let dt = 0.1;
    let a = Matrix::from_row_slice(2, 2, &[1.0, dt, 0.0, 1.0]);
    let q = Matrix::from_row_slice(2, 2, &[dt.powi(3) / 3.0, dt.powi(2) / 2.0, dt.powi(2) / 2.0, dt]) * 0.5;
    let h = Matrix::from_row_slice(1, 2, &[1.0, 0.0]);
    let r = Matrix::from_element(1, 1, 0.04);
    let motion = AffineModel::linear(a.clone(), q.clone()).unwrap();
    let meas = AffineModel::linear(h.clone(), r.clone()).unwrap();
    let m1 = Vector::from_vec(vec![0.0, 1.0]);
    let p1 = Matrix::identity(2, 2);

    let mut rng = ChaCha8Rng::seed_from_u64(11);
    let (_, mut measurements) = simulate(&motion, &meas, &m1, 40, true, &mut rng);
    measurements[7] = Vector::from_element(1, f64::NAN);
    measurements[39] = Vector::from_element(1, f64::NAN);
    LinearSetup {
        a,
        q,
        h,
        r,
        motion,
        meas,
        measurements,
        m1,
        p1,
    }
}

/// Textbook Kalman filter and RTS smoother
fn kf_rts(s: &LinearSetup) -> Trajectory {
    let num_steps = s.measurements.len();
    let mut pred_means = Vec::new();
    let mut pred_covs = Vec::new();
    let mut filt_means: Vec<Vector> = Vec::new();
    let mut filt_covs: Vec<Matrix> = Vec::new();
    let (mut m, mut p) = (s.m1.clone(), s.p1.clone());
    for (k, y) in s.measurements.iter().enumerate() {
        if k > 0 {
            m = &s.a * &m;
            p = &s.a * &p * s.a.transpose() + &s.q;
        }
        pred_means.push(m.clone());
        pred_covs.push(p.clone());
        if !y[0].is_nan() {
            let innov_cov = &s.h * &p * s.h.transpose() + &s.r;
            let gain = &p * s.h.transpose() * innov_cov.clone().try_inverse().unwrap();
            m = &m + &gain * (y - &s.h * &m);
            p = &p - &gain * innov_cov * gain.transpose();
        }
        filt_means.push(m.clone());
        filt_covs.push(p.clone());
    }

    let mut means = filt_means.clone();
    let mut covs = filt_covs.clone();
    for k in (0..num_steps - 1).rev() {
        let gain = &filt_covs[k] * s.a.transpose() * pred_covs[k + 1].clone().try_inverse().unwrap();
        means[k] = &filt_means[k] + &gain * (&means[k + 1] - &pred_means[k + 1]);
        covs[k] = &filt_covs[k] + &gain * (&covs[k + 1] - &pred_covs[k + 1]) * gain.transpose();
    }
    Trajectory { means, covs }
}

fn assert_traj_close(actual: &Trajectory, expected: &Trajectory, tol: f64) {
    assert_eq!(actual.len(), expected.len());
    for (k, (a, e)) in actual.means.iter().zip(&expected.means).enumerate() {
        assert!((a - e).amax() < tol, "mean mismatch at step {}: {a} vs {e}", k + 1);
    }
    for (k, (a, e)) in actual.covs.iter().zip(&expected.covs).enumerate() {
        assert!((a - e).amax() < tol, "covariance mismatch at step {}", k + 1);
    }
}

#[test]
fn ieks_matches_rts_smoother() {
    let s = setup();
    let expected = kf_rts(&s);
    let smoother = IteratedSmoother::ieks(&s.motion, &s.meas, 3).unwrap();
    let out = smoother.filter_and_smooth(&s.measurements, &s.m1, &s.p1, &NoopCost).unwrap();
    for iterate in &out.iterations {
        assert_traj_close(iterate, &expected, 1e-9);
    }
}

#[test]
fn ipls_matches_rts_smoother() {
    let s = setup();
    let expected = kf_rts(&s);
    let smoother = IteratedSmoother::ipls(&s.motion, &s.meas, SigmaPointSlr::cubature(), 3).unwrap();
    let out = smoother.filter_and_smooth(&s.measurements, &s.m1, &s.p1, &NoopCost).unwrap();
    assert_traj_close(&out.smoothed, &expected, 1e-7);
}

#[test]
fn lm_ieks_stays_at_linear_optimum() {
    let s = setup();
    let expected = kf_rts(&s);
    let smoother = IteratedSmoother::lm_ieks(&s.motion, &s.meas, 4, LmParams::default()).unwrap();
    let cost = smoother.smoothing_cost(&s.measurements, &s.m1, &s.p1).unwrap();
    let out = smoother.filter_and_smooth(&s.measurements, &s.m1, &s.p1, &cost).unwrap();
    // iteration 1 is already the minimiser, so every later candidate is rejected
    assert_traj_close(&out.iterations[0], &expected, 1e-9);
    for (k, pair) in out.cost_trace.windows(2).enumerate() {
        assert!(pair[1] <= pair[0], "cost increased at iteration {}", k + 2);
    }
    for (a, e) in out.smoothed.means.iter().zip(&expected.means) {
        assert!((a - e).amax() < 1e-6);
    }
}
