/// Monte Carlo SLR
///
/// Moments are sample moments (normalised by `1/N`) of `z = f(x)` with
/// `x ~ N(mean, cov)`. Each call draws from a `ChaCha8Rng` seeded with the
/// configured seed on the stream given by the time step, so the same
/// `(mean, cov, time_step)` always gives the same estimate and nearby
/// trajectories are compared with common random numbers.
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::StandardNormal;

use super::sigma_points::lower_cholesky;
use super::slr::{slr_linearize, weighted_mean, Slr, SlrMoments};
use super::{LinearParams, Linearizer};
use crate::error::{Result, SmootherError};
use crate::models::Model;
use crate::types::{Matrix, Vector};

#[derive(Clone, Copy, Debug)]
pub struct MonteCarloSlr {
    num_samples: usize,
    seed: u64,
}

impl MonteCarloSlr {
    pub fn new(num_samples: usize, seed: u64) -> Result<Self> {
        if num_samples < 2 {
            return Err(SmootherError::InvalidParameters(format!(
                "Monte Carlo SLR needs at least 2 samples, got {num_samples}"
            )));
        }
        Ok(Self { num_samples, seed })
    }

    pub fn num_samples(&self) -> usize {
        self.num_samples
    }

    fn sample(&self, mean: &Vector, cov: &Matrix, time_step: usize) -> Result<Vec<Vector>> {
        let sqrt_cov = lower_cholesky(cov)?;
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        rng.set_stream(time_step as u64);
        let samples = (0..self.num_samples)
            .map(|_| {
                let std_normal = Vector::from_fn(mean.len(), |_, _| rng.sample(StandardNormal));
                mean + &sqrt_cov * std_normal
            })
            .collect();
        Ok(samples)
    }
}

impl Slr for MonteCarloSlr {
    fn slr<M: Model + ?Sized>(&self, model: &M, mean: &Vector, cov: &Matrix, time_step: usize) -> Result<SlrMoments> {
        let x_sample = self.sample(mean, cov, time_step)?;
        let z_sample = model.map_set(&x_sample, time_step);
        let weights = vec![1.0 / self.num_samples as f64; self.num_samples];
        let z_bar = weighted_mean(&z_sample, &weights);

        let (dim_x, dim_z) = (mean.len(), z_bar.len());
        let mut psi = Matrix::zeros(dim_x, dim_z);
        let mut phi = Matrix::zeros(dim_z, dim_z);
        for (x, z) in x_sample.iter().zip(&z_sample) {
            let x_diff = x - mean;
            let z_diff = z - &z_bar;
            psi += &x_diff * z_diff.transpose();
            phi += &z_diff * z_diff.transpose();
        }
        let n = self.num_samples as f64;
        Ok(SlrMoments {
            z_bar,
            psi: psi / n,
            phi: phi / n,
        })
    }

    fn calc_z_bar<M: Model + ?Sized>(&self, model: &M, mean: &Vector, cov: &Matrix, time_step: usize) -> Result<Vector> {
        let z_sample = model.map_set(&self.sample(mean, cov, time_step)?, time_step);
        let weights = vec![1.0 / self.num_samples as f64; self.num_samples];
        Ok(weighted_mean(&z_sample, &weights))
    }
}

impl<M: Model + ?Sized> Linearizer<M> for MonteCarloSlr {
    fn linearize(&self, model: &M, mean: &Vector, cov: &Matrix, time_step: usize) -> Result<(Vector, LinearParams)> {
        slr_linearize(self, model, mean, cov, time_step)
    }

    fn mapped_mean(&self, model: &M, mean: &Vector, cov: &Matrix, time_step: usize) -> Result<Vector> {
        self.calc_z_bar(model, mean, cov, time_step)
    }
}
