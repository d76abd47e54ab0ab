//! Run configuration
//!
//! Models and smoother settings as serde types, plus enum wrappers that let
//! the runner pick models and the SLR estimator at run time.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SmootherError};
use crate::linearization::{
    slr::slr_linearize, LinearParams, Linearizer, MonteCarloSlr, SigmaPointSlr, Slr, SlrMoments, SphericalCubature,
    UnscentedTransform,
};
use crate::models::{
    AffineModel, CoordTurn, Cubic, Differentiable, MeasModel, Model, MotionModel, MultiSensorBearings,
    MultiSensorRange, NonStationaryGrowth, Quadratic, RangeBearing,
};
use crate::smoother::{ArmijoLineSearch, IterationControl, LmParams};
use crate::types::{Matrix, Vector};

/// Smoother family member
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Method {
    Ieks,
    LmIeks,
    LsIeks,
    Ipls,
    LmIpls,
    LsIpls,
}

impl Method {
    pub fn uses_slr(&self) -> bool {
        matches!(self, Method::Ipls | Method::LmIpls | Method::LsIpls)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Method::Ieks => "IEKS",
            Method::LmIeks => "LM-IEKS",
            Method::LsIeks => "LS-IEKS",
            Method::Ipls => "IPLS",
            Method::LmIpls => "LM-IPLS",
            Method::LsIpls => "LS-IPLS",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum SlrMethod {
    Cubature,
    Unscented,
    MonteCarlo,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LmConfig {
    pub lambda: f64,
    pub nu: f64,
    pub cost_improv_iter_lim: usize,
}

impl Default for LmConfig {
    fn default() -> Self {
        let params = LmParams::default();
        Self {
            lambda: params.lambda,
            nu: params.nu,
            cost_improv_iter_lim: params.cost_improv_iter_lim,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LineSearchConfig {
    pub c1: f64,
    pub max_backtracks: usize,
}

impl Default for LineSearchConfig {
    fn default() -> Self {
        let search = ArmijoLineSearch::default();
        Self {
            c1: search.c1,
            max_backtracks: search.max_backtracks,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SlrConfig {
    pub method: SlrMethod,
    /// Unscented transform spread
    pub alpha: f64,
    pub beta: f64,
    pub kappa: f64,
    pub num_samples: usize,
    pub seed: u64,
}

impl Default for SlrConfig {
    fn default() -> Self {
        Self {
            method: SlrMethod::Cubature,
            alpha: 1.0,
            beta: 0.0,
            kappa: 0.0,
            num_samples: 1000,
            seed: 0,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SmootherConfig {
    pub method: Method,
    pub num_iter: usize,
    pub lm: LmConfig,
    pub line_search: LineSearchConfig,
    pub slr: SlrConfig,
}

impl Default for SmootherConfig {
    fn default() -> Self {
        Self {
            method: Method::Ieks,
            num_iter: 10,
            lm: LmConfig::default(),
            line_search: LineSearchConfig::default(),
            slr: SlrConfig::default(),
        }
    }
}

impl SmootherConfig {
    pub fn control(&self) -> IterationControl {
        match self.method {
            Method::Ieks | Method::Ipls => IterationControl::GaussNewton,
            Method::LmIeks | Method::LmIpls => IterationControl::LevenbergMarquardt(LmParams {
                lambda: self.lm.lambda,
                nu: self.lm.nu,
                cost_improv_iter_lim: self.lm.cost_improv_iter_lim,
            }),
            Method::LsIeks | Method::LsIpls => IterationControl::LineSearch(ArmijoLineSearch {
                c1: self.line_search.c1,
                max_backtracks: self.line_search.max_backtracks,
            }),
        }
    }

    pub fn slr_estimator(&self) -> Result<AnySlr> {
        let slr = &self.slr;
        Ok(match slr.method {
            SlrMethod::Cubature => AnySlr::Cubature(SigmaPointSlr::cubature()),
            SlrMethod::Unscented => {
                AnySlr::Unscented(SigmaPointSlr::new(UnscentedTransform::new(slr.alpha, slr.beta, slr.kappa)))
            }
            SlrMethod::MonteCarlo => AnySlr::MonteCarlo(MonteCarloSlr::new(slr.num_samples, slr.seed)?),
        })
    }
}

/// SLR estimator chosen at run time
#[derive(Clone, Debug)]
pub enum AnySlr {
    Cubature(SigmaPointSlr<SphericalCubature>),
    Unscented(SigmaPointSlr<UnscentedTransform>),
    MonteCarlo(MonteCarloSlr),
}

impl Slr for AnySlr {
    fn slr<M: Model + ?Sized>(&self, model: &M, mean: &Vector, cov: &Matrix, time_step: usize) -> Result<SlrMoments> {
        match self {
            AnySlr::Cubature(s) => s.slr(model, mean, cov, time_step),
            AnySlr::Unscented(s) => s.slr(model, mean, cov, time_step),
            AnySlr::MonteCarlo(s) => s.slr(model, mean, cov, time_step),
        }
    }

    fn calc_z_bar<M: Model + ?Sized>(&self, model: &M, mean: &Vector, cov: &Matrix, time_step: usize) -> Result<Vector> {
        match self {
            AnySlr::Cubature(s) => s.calc_z_bar(model, mean, cov, time_step),
            AnySlr::Unscented(s) => s.calc_z_bar(model, mean, cov, time_step),
            AnySlr::MonteCarlo(s) => s.calc_z_bar(model, mean, cov, time_step),
        }
    }
}

impl<M: Model + ?Sized> Linearizer<M> for AnySlr {
    fn linearize(&self, model: &M, mean: &Vector, cov: &Matrix, time_step: usize) -> Result<(Vector, LinearParams)> {
        slr_linearize(self, model, mean, cov, time_step)
    }

    fn mapped_mean(&self, model: &M, mean: &Vector, cov: &Matrix, time_step: usize) -> Result<Vector> {
        self.calc_z_bar(model, mean, cov, time_step)
    }
}

/// Row-major nested vectors to a matrix
pub fn matrix_from_rows(rows: &[Vec<f64>], context: &str) -> Result<Matrix> {
    let ncols = rows.first().map_or(0, |r| r.len());
    if let Some(bad) = rows.iter().find(|r| r.len() != ncols) {
        return Err(SmootherError::DimensionMismatch {
            context: format!("{context} row length"),
            expected: ncols,
            actual: bad.len(),
        });
    }
    let flat: Vec<f64> = rows.iter().flatten().copied().collect();
    Ok(Matrix::from_row_slice(rows.len(), ncols, &flat))
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MotionConfig {
    /// Coordinated turn with the `(qc, qw)` process noise parametrisation
    CoordTurn { sampling_period: f64, qc: f64, qw: f64 },
    Affine {
        a: Vec<Vec<f64>>,
        #[serde(default)]
        b: Option<Vec<f64>>,
        noise: Vec<Vec<f64>>,
    },
    NonStationaryGrowth {
        alpha: f64,
        beta: f64,
        gamma: f64,
        delta: f64,
        proc_noise: f64,
    },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MeasConfig {
    MultiSensorRange { sensors: Vec<[f64; 2]>, std: f64 },
    MultiSensorBearings { sensors: Vec<[f64; 2]>, std: f64 },
    RangeBearing { pos: [f64; 2], range_std: f64, bearing_std: f64 },
    Affine {
        a: Vec<Vec<f64>>,
        #[serde(default)]
        b: Option<Vec<f64>>,
        noise: Vec<Vec<f64>>,
    },
    Quadratic { coeff: f64, noise: f64 },
    Cubic { coeff: f64, noise: f64 },
}

fn affine_from_config(a: &[Vec<f64>], b: &Option<Vec<f64>>, noise: &[Vec<f64>]) -> Result<AffineModel> {
    let linear_map = matrix_from_rows(a, "affine map")?;
    let translation = match b {
        Some(b) => Vector::from_vec(b.clone()),
        None => Vector::zeros(linear_map.nrows()),
    };
    AffineModel::new(linear_map, translation, matrix_from_rows(noise, "affine noise")?)
}

impl MotionConfig {
    pub fn build(&self) -> Result<AnyMotionModel> {
        Ok(match self {
            MotionConfig::CoordTurn { sampling_period, qc, qw } => AnyMotionModel::CoordTurn(CoordTurn::new(
                *sampling_period,
                CoordTurn::paper_proc_noise(*sampling_period, *qc, *qw),
            )),
            MotionConfig::Affine { a, b, noise } => AnyMotionModel::Affine(affine_from_config(a, b, noise)?),
            MotionConfig::NonStationaryGrowth {
                alpha,
                beta,
                gamma,
                delta,
                proc_noise,
            } => AnyMotionModel::NonStationaryGrowth(NonStationaryGrowth::new(*alpha, *beta, *gamma, *delta, *proc_noise)),
        })
    }
}

impl MeasConfig {
    pub fn build(&self) -> Result<AnyMeasModel> {
        Ok(match self {
            MeasConfig::MultiSensorRange { sensors, std } => AnyMeasModel::MultiSensorRange(MultiSensorRange::new(
                sensors.clone(),
                Matrix::identity(sensors.len(), sensors.len()) * std.powi(2),
            )),
            MeasConfig::MultiSensorBearings { sensors, std } => {
                AnyMeasModel::MultiSensorBearings(MultiSensorBearings::new(
                    sensors.clone(),
                    Matrix::identity(sensors.len(), sensors.len()) * std.powi(2),
                ))
            }
            MeasConfig::RangeBearing {
                pos,
                range_std,
                bearing_std,
            } => AnyMeasModel::RangeBearing(RangeBearing::new(
                *pos,
                Matrix::from_diagonal(&Vector::from_vec(vec![range_std.powi(2), bearing_std.powi(2)])),
            )),
            MeasConfig::Affine { a, b, noise } => AnyMeasModel::Affine(affine_from_config(a, b, noise)?),
            MeasConfig::Quadratic { coeff, noise } => {
                AnyMeasModel::Quadratic(Quadratic::new(*coeff, Matrix::from_element(1, 1, *noise)))
            }
            MeasConfig::Cubic { coeff, noise } => {
                AnyMeasModel::Cubic(Cubic::new(*coeff, Matrix::from_element(1, 1, *noise)))
            }
        })
    }
}

/// Motion model chosen at run time
#[derive(Clone, Debug)]
pub enum AnyMotionModel {
    CoordTurn(CoordTurn),
    Affine(AffineModel),
    NonStationaryGrowth(NonStationaryGrowth),
}

impl AnyMotionModel {
    fn inner(&self) -> &dyn DiffMotion {
        match self {
            AnyMotionModel::CoordTurn(m) => m,
            AnyMotionModel::Affine(m) => m,
            AnyMotionModel::NonStationaryGrowth(m) => m,
        }
    }
}

trait DiffMotion: MotionModel + Differentiable {}

impl<T: MotionModel + Differentiable> DiffMotion for T {}

impl Model for AnyMotionModel {
    fn mapping(&self, state: &Vector, time_step: usize) -> Vector {
        self.inner().mapping(state, time_step)
    }
}

impl Differentiable for AnyMotionModel {
    fn jacobian(&self, state: &Vector, time_step: usize) -> Matrix {
        self.inner().jacobian(state, time_step)
    }
}

impl MotionModel for AnyMotionModel {
    fn proc_noise(&self, time_step: usize) -> Matrix {
        self.inner().proc_noise(time_step)
    }
}

/// Measurement model chosen at run time
#[derive(Clone, Debug)]
pub enum AnyMeasModel {
    MultiSensorRange(MultiSensorRange),
    MultiSensorBearings(MultiSensorBearings),
    RangeBearing(RangeBearing),
    Affine(AffineModel),
    Quadratic(Quadratic),
    Cubic(Cubic),
}

impl AnyMeasModel {
    fn inner(&self) -> &dyn DiffMeas {
        match self {
            AnyMeasModel::MultiSensorRange(m) => m,
            AnyMeasModel::MultiSensorBearings(m) => m,
            AnyMeasModel::RangeBearing(m) => m,
            AnyMeasModel::Affine(m) => m,
            AnyMeasModel::Quadratic(m) => m,
            AnyMeasModel::Cubic(m) => m,
        }
    }
}

trait DiffMeas: MeasModel + Differentiable {}

impl<T: MeasModel + Differentiable> DiffMeas for T {}

impl Model for AnyMeasModel {
    fn mapping(&self, state: &Vector, time_step: usize) -> Vector {
        self.inner().mapping(state, time_step)
    }
}

impl Differentiable for AnyMeasModel {
    fn jacobian(&self, state: &Vector, time_step: usize) -> Matrix {
        self.inner().jacobian(state, time_step)
    }
}

impl MeasModel for AnyMeasModel {
    fn meas_noise(&self, time_step: usize) -> Matrix {
        self.inner().meas_noise(time_step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_json() {
        let config: SmootherConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.method, Method::Ieks);
        assert_eq!(config.num_iter, 10);
        assert_eq!(config.lm.nu, 10.0);
        assert_eq!(config.line_search.c1, 0.1);
        assert_eq!(config.slr.method, SlrMethod::Cubature);
    }

    #[test]
    fn test_method_names() {
        let config: SmootherConfig = serde_json::from_str(r#"{"method": "lm-ipls", "num_iter": 3}"#).unwrap();
        assert_eq!(config.method, Method::LmIpls);
        assert!(config.method.uses_slr());
        assert_eq!(config.method.name(), "LM-IPLS");
        assert!(matches!(config.control(), IterationControl::LevenbergMarquardt(_)));
    }

    #[test]
    fn test_build_models() {
        let motion: MotionConfig =
            serde_json::from_str(r#"{"type": "coord_turn", "sampling_period": 0.01, "qc": 0.01, "qw": 10.0}"#).unwrap();
        let meas: MeasConfig =
            serde_json::from_str(r#"{"type": "multi_sensor_range", "sensors": [[-1.5, 0.5], [1.0, 1.0]], "std": 0.5}"#)
                .unwrap();
        let motion = motion.build().unwrap();
        let meas = meas.build().unwrap();
        assert_eq!(motion.proc_noise(1).nrows(), 5);
        assert_eq!(meas.meas_noise(1), Matrix::identity(2, 2) * 0.25);
        let state = Vector::from_vec(vec![0.0, 0.0, 1.0, 0.0, 0.0]);
        assert_eq!(meas.jacobian(&state, 1).shape(), (2, 5));
    }

    #[test]
    fn test_affine_config_checks_shapes() {
        let meas: MeasConfig =
            serde_json::from_str(r#"{"type": "affine", "a": [[1.0, 0.0], [0.0]], "noise": [[1.0]]}"#).unwrap();
        assert!(matches!(meas.build(), Err(SmootherError::DimensionMismatch { .. })));
    }

    #[test]
    fn test_monte_carlo_estimator() {
        let config = SmootherConfig {
            slr: SlrConfig {
                method: SlrMethod::MonteCarlo,
                num_samples: 1,
                ..SlrConfig::default()
            },
            ..SmootherConfig::default()
        };
        assert!(config.slr_estimator().is_err());
    }
}
