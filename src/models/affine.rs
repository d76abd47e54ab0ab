/// Linear Gaussian model `z = A x + b`
///
/// Usable as both motion and measurement model. With affine models the
/// smoothers reduce to the ordinary Kalman filter and RTS smoother.
use super::{Differentiable, MeasModel, Model, MotionModel};
use crate::error::{Result, SmootherError};
use crate::types::{Matrix, Vector};

#[derive(Clone, Debug)]
pub struct AffineModel {
    linear_map: Matrix,
    translation: Vector,
    noise: Matrix,
}

impl AffineModel {
    pub fn new(linear_map: Matrix, translation: Vector, noise: Matrix) -> Result<Self> {
        if translation.len() != linear_map.nrows() {
            return Err(SmootherError::DimensionMismatch {
                context: "affine translation".to_string(),
                expected: linear_map.nrows(),
                actual: translation.len(),
            });
        }
        if noise.nrows() != linear_map.nrows() || noise.ncols() != linear_map.nrows() {
            return Err(SmootherError::DimensionMismatch {
                context: "affine noise covariance".to_string(),
                expected: linear_map.nrows(),
                actual: noise.nrows(),
            });
        }
        Ok(Self {
            linear_map,
            translation,
            noise,
        })
    }

    /// `z = A x` with zero translation
    pub fn linear(linear_map: Matrix, noise: Matrix) -> Result<Self> {
        let translation = Vector::zeros(linear_map.nrows());
        Self::new(linear_map, translation, noise)
    }

    pub fn linear_map(&self) -> &Matrix {
        &self.linear_map
    }

    pub fn translation(&self) -> &Vector {
        &self.translation
    }
}

impl Model for AffineModel {
    fn mapping(&self, state: &Vector, _time_step: usize) -> Vector {
        &self.linear_map * state + &self.translation
    }
}

impl Differentiable for AffineModel {
    fn jacobian(&self, _state: &Vector, _time_step: usize) -> Matrix {
        self.linear_map.clone()
    }
}

impl MotionModel for AffineModel {
    fn proc_noise(&self, _time_step: usize) -> Matrix {
        self.noise.clone()
    }
}

impl MeasModel for AffineModel {
    fn meas_noise(&self, _time_step: usize) -> Matrix {
        self.noise.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_mapping() {
        let model = AffineModel::new(
            Matrix::from_row_slice(1, 2, &[1.0, 2.0]),
            Vector::from_vec(vec![0.5]),
            Matrix::identity(1, 1),
        )
        .unwrap();
        let z = model.mapping(&Vector::from_vec(vec![1.0, 1.0]), 3);
        assert_relative_eq!(z[0], 3.5);
        assert_eq!(model.jacobian(&Vector::zeros(2), 3), *model.linear_map());
    }

    #[test]
    fn test_rejects_bad_translation() {
        let res = AffineModel::new(Matrix::identity(2, 2), Vector::zeros(3), Matrix::identity(2, 2));
        assert!(matches!(res, Err(SmootherError::DimensionMismatch { .. })));
    }

    #[test]
    fn test_rejects_bad_noise() {
        let res = AffineModel::linear(Matrix::identity(2, 2), Matrix::identity(1, 1));
        assert!(res.is_err());
    }
}
