use crate::rotation::{matrix_to_rodrigues, rodrigues_to_matrix};
use nalgebra::{Matrix3, Point3, Vector3};
use serde::{Deserialize, Serialize};

/// Rigid transform from pattern coordinates to camera coordinates,
/// `X_cam = R(rvec) * X_pattern + tvec`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// Axis-angle rotation (radians).
    pub rvec: Vector3<f64>,
    pub tvec: Vector3<f64>,
}

impl Pose {
    pub fn new(rvec: Vector3<f64>, tvec: Vector3<f64>) -> Self {
        Self { rvec, tvec }
    }

    pub fn from_rotation(r: &Matrix3<f64>, tvec: Vector3<f64>) -> Self {
        Self {
            rvec: matrix_to_rodrigues(r),
            tvec,
        }
    }

    pub fn rotation_matrix(&self) -> Matrix3<f64> {
        rodrigues_to_matrix(&self.rvec)
    }

    #[inline]
    pub fn transform_point(&self, p: &Point3<f64>) -> Point3<f64> {
        Point3::from(self.rotation_matrix() * p.coords + self.tvec)
    }

    /// Camera center in pattern coordinates, `-Rᵀ t`.
    pub fn camera_position(&self) -> Vector3<f64> {
        -(self.rotation_matrix().transpose() * self.tvec)
    }

    pub fn is_finite(&self) -> bool {
        self.rvec.iter().chain(self.tvec.iter()).all(|v| v.is_finite())
    }
}
