/// Range and bearing measurement models
///
/// Sensors observe the position part (first two components) of the state.
use super::{Differentiable, MeasModel, Model};
use crate::types::{Matrix, Vector};

/// Single sensor measuring [range, bearing] to the target
#[derive(Clone, Debug)]
pub struct RangeBearing {
    pos: [f64; 2],
    meas_noise: Matrix,
}

impl RangeBearing {
    pub fn new(pos: [f64; 2], meas_noise: Matrix) -> Self {
        Self { pos, meas_noise }
    }
}

impl Model for RangeBearing {
    fn mapping(&self, state: &Vector, _time_step: usize) -> Vector {
        Vector::from_vec(vec![euclid_dist(state, self.pos), angle(state, self.pos)])
    }
}

impl MeasModel for RangeBearing {
    fn meas_noise(&self, _time_step: usize) -> Matrix {
        self.meas_noise.clone()
    }
}

impl Differentiable for RangeBearing {
    fn jacobian(&self, state: &Vector, _time_step: usize) -> Matrix {
        let (dx, dy) = (state[0] - self.pos[0], state[1] - self.pos[1]);
        let mut jac = Matrix::zeros(2, state.len());
        let range_row = euclid_dist_jacobian(dx, dy);
        let bearing_row = angle_jacobian(dx, dy);
        jac[(0, 0)] = range_row[0];
        jac[(0, 1)] = range_row[1];
        jac[(1, 0)] = bearing_row[0];
        jac[(1, 1)] = bearing_row[1];
        jac
    }
}

/// N range-only sensors, measurement dimension N
#[derive(Clone, Debug)]
pub struct MultiSensorRange {
    sensors: Vec<[f64; 2]>,
    meas_noise: Matrix,
}

impl MultiSensorRange {
    pub fn new(sensors: Vec<[f64; 2]>, meas_noise: Matrix) -> Self {
        Self { sensors, meas_noise }
    }

    pub fn sensors(&self) -> &[[f64; 2]] {
        &self.sensors
    }
}

impl Model for MultiSensorRange {
    fn mapping(&self, state: &Vector, _time_step: usize) -> Vector {
        Vector::from_iterator(self.sensors.len(), self.sensors.iter().map(|&pos| euclid_dist(state, pos)))
    }
}

impl MeasModel for MultiSensorRange {
    fn meas_noise(&self, _time_step: usize) -> Matrix {
        self.meas_noise.clone()
    }
}

impl Differentiable for MultiSensorRange {
    fn jacobian(&self, state: &Vector, _time_step: usize) -> Matrix {
        let mut jac = Matrix::zeros(self.sensors.len(), state.len());
        for (i, pos) in self.sensors.iter().enumerate() {
            let row = euclid_dist_jacobian(state[0] - pos[0], state[1] - pos[1]);
            jac[(i, 0)] = row[0];
            jac[(i, 1)] = row[1];
        }
        jac
    }
}

/// N bearings-only sensors, measurement dimension N
#[derive(Clone, Debug)]
pub struct MultiSensorBearings {
    sensors: Vec<[f64; 2]>,
    meas_noise: Matrix,
}

impl MultiSensorBearings {
    pub fn new(sensors: Vec<[f64; 2]>, meas_noise: Matrix) -> Self {
        Self { sensors, meas_noise }
    }
}

impl Model for MultiSensorBearings {
    fn mapping(&self, state: &Vector, _time_step: usize) -> Vector {
        Vector::from_iterator(self.sensors.len(), self.sensors.iter().map(|&pos| angle(state, pos)))
    }
}

impl MeasModel for MultiSensorBearings {
    fn meas_noise(&self, _time_step: usize) -> Matrix {
        self.meas_noise.clone()
    }
}

impl Differentiable for MultiSensorBearings {
    fn jacobian(&self, state: &Vector, _time_step: usize) -> Matrix {
        let mut jac = Matrix::zeros(self.sensors.len(), state.len());
        for (i, pos) in self.sensors.iter().enumerate() {
            let row = angle_jacobian(state[0] - pos[0], state[1] - pos[1]);
            jac[(i, 0)] = row[0];
            jac[(i, 1)] = row[1];
        }
        jac
    }
}

/// Map a [range, bearing] measurement from a sensor at `pos` to cartesian coordinates
pub fn to_cartesian_coords(meas: &Vector, pos: [f64; 2]) -> [f64; 2] {
    [pos[0] + meas[0] * meas[1].cos(), pos[1] + meas[0] * meas[1].sin()]
}

fn euclid_dist(state: &Vector, pos: [f64; 2]) -> f64 {
    ((state[0] - pos[0]).powi(2) + (state[1] - pos[1]).powi(2)).sqrt()
}

fn euclid_dist_jacobian(dx: f64, dy: f64) -> [f64; 2] {
    let den = (dx * dx + dy * dy).sqrt();
    [dx / den, dy / den]
}

fn angle(state: &Vector, pos: [f64; 2]) -> f64 {
    (state[1] - pos[1]).atan2(state[0] - pos[0])
}

fn angle_jacobian(dx: f64, dy: f64) -> [f64; 2] {
    let den = dx * dx + dy * dy;
    [-dy / den, dx / den]
}
