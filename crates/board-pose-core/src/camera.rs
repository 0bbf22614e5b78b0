//! Pinhole camera with Brown–Conrady lens distortion.
//!
//! Pixel coordinates follow the usual convention: `u = fx * x + skew * y + cx`,
//! `v = fy * y + cy`, where `(x, y)` are *distorted* normalized coordinates.

use nalgebra::{Matrix3, Point2, Point3, Vector2};
use serde::{Deserialize, Serialize};

/// Fixed-point iterations used when inverting the distortion model.
const UNDISTORT_ITERS: usize = 20;

/// Errors raised while building a camera model from raw parameters.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum CameraError {
    #[error("camera matrix contains non-finite values")]
    NonFiniteMatrix,
    #[error("camera matrix last row must be [0, 0, 1], got {0:?}")]
    InvalidLastRow([f64; 3]),
    #[error("camera matrix must be upper triangular, got K[1][0] = {0}")]
    NotUpperTriangular(f64),
    #[error("focal lengths must be positive (fx={fx}, fy={fy})")]
    NonPositiveFocal { fx: f64, fy: f64 },
    #[error("distortion coefficients contain non-finite values")]
    NonFiniteDistortion,
}

/// Pinhole intrinsics with optional skew.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CameraIntrinsics {
    /// Focal length in pixels along X.
    pub fx: f64,
    /// Focal length in pixels along Y.
    pub fy: f64,
    /// Principal point X coordinate in pixels.
    pub cx: f64,
    /// Principal point Y coordinate in pixels.
    pub cy: f64,
    /// Skew term (typically 0).
    pub skew: f64,
}

impl CameraIntrinsics {
    pub fn new(fx: f64, fy: f64, cx: f64, cy: f64) -> Self {
        Self {
            fx,
            fy,
            cx,
            cy,
            skew: 0.0,
        }
    }

    /// Build intrinsics from a row-major 3x3 camera matrix.
    pub fn from_matrix(k: &[[f64; 3]; 3]) -> Result<Self, CameraError> {
        if k.iter().flatten().any(|v| !v.is_finite()) {
            return Err(CameraError::NonFiniteMatrix);
        }
        if k[2] != [0.0, 0.0, 1.0] {
            return Err(CameraError::InvalidLastRow(k[2]));
        }
        if k[1][0] != 0.0 {
            return Err(CameraError::NotUpperTriangular(k[1][0]));
        }
        let (fx, fy) = (k[0][0], k[1][1]);
        if fx <= 0.0 || fy <= 0.0 {
            return Err(CameraError::NonPositiveFocal { fx, fy });
        }
        Ok(Self {
            fx,
            fy,
            cx: k[0][2],
            cy: k[1][2],
            skew: k[0][1],
        })
    }

    /// Return the 3x3 camera intrinsics matrix K.
    pub fn k_matrix(&self) -> Matrix3<f64> {
        Matrix3::new(
            self.fx, self.skew, self.cx, //
            0.0, self.fy, self.cy, //
            0.0, 0.0, 1.0,
        )
    }

    /// Normalized (sensor-plane) coordinates to pixels.
    #[inline]
    pub fn to_pixel(&self, n: &Vector2<f64>) -> Point2<f64> {
        Point2::new(
            self.fx * n.x + self.skew * n.y + self.cx,
            self.fy * n.y + self.cy,
        )
    }

    /// Pixels to normalized (sensor-plane) coordinates.
    #[inline]
    pub fn to_normalized(&self, p: &Point2<f64>) -> Vector2<f64> {
        let y = (p.y - self.cy) / self.fy;
        let x = (p.x - self.cx - self.skew * y) / self.fx;
        Vector2::new(x, y)
    }
}

/// Five-coefficient radial + tangential distortion.
///
/// Coefficient order on the wire is `[k1, k2, p1, p2, k3]`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BrownConrady5 {
    pub k1: f64,
    pub k2: f64,
    pub p1: f64,
    pub p2: f64,
    pub k3: f64,
}

impl BrownConrady5 {
    pub const NONE: BrownConrady5 = BrownConrady5 {
        k1: 0.0,
        k2: 0.0,
        p1: 0.0,
        p2: 0.0,
        k3: 0.0,
    };

    pub fn from_coeffs(c: [f64; 5]) -> Result<Self, CameraError> {
        if c.iter().any(|v| !v.is_finite()) {
            return Err(CameraError::NonFiniteDistortion);
        }
        Ok(Self {
            k1: c[0],
            k2: c[1],
            p1: c[2],
            p2: c[3],
            k3: c[4],
        })
    }

    pub fn coeffs(&self) -> [f64; 5] {
        [self.k1, self.k2, self.p1, self.p2, self.k3]
    }

    pub fn is_zero(&self) -> bool {
        self.coeffs().iter().all(|&c| c == 0.0)
    }

    #[inline]
    fn radial(&self, r2: f64) -> f64 {
        1.0 + r2 * (self.k1 + r2 * (self.k2 + r2 * self.k3))
    }

    #[inline]
    fn tangential(&self, x: f64, y: f64, r2: f64) -> Vector2<f64> {
        let xy = x * y;
        Vector2::new(
            2.0 * self.p1 * xy + self.p2 * (r2 + 2.0 * x * x),
            self.p1 * (r2 + 2.0 * y * y) + 2.0 * self.p2 * xy,
        )
    }

    /// Apply distortion to undistorted normalized coordinates.
    pub fn distort(&self, n: &Vector2<f64>) -> Vector2<f64> {
        let r2 = n.norm_squared();
        n * self.radial(r2) + self.tangential(n.x, n.y, r2)
    }

    /// Invert [`Self::distort`] by fixed-point iteration.
    ///
    /// Converges for the moderate distortion found on ordinary lenses; it is
    /// not meant for strong fisheye optics.
    pub fn undistort(&self, nd: &Vector2<f64>) -> Vector2<f64> {
        if self.is_zero() {
            return *nd;
        }
        let mut n = *nd;
        for _ in 0..UNDISTORT_ITERS {
            let r2 = n.norm_squared();
            let radial = self.radial(r2);
            if radial.abs() < f64::EPSILON {
                break;
            }
            n = (nd - self.tangential(n.x, n.y, r2)) / radial;
        }
        n
    }
}

/// Intrinsics plus distortion: the full image formation model.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CameraModel {
    pub intrinsics: CameraIntrinsics,
    pub distortion: BrownConrady5,
}

impl CameraModel {
    pub fn new(intrinsics: CameraIntrinsics, distortion: BrownConrady5) -> Self {
        Self {
            intrinsics,
            distortion,
        }
    }

    /// Camera without lens distortion.
    pub fn pinhole(intrinsics: CameraIntrinsics) -> Self {
        Self::new(intrinsics, BrownConrady5::NONE)
    }

    /// Build and validate a model from a 3x3 matrix and five coefficients.
    pub fn from_raw(k: &[[f64; 3]; 3], dist: [f64; 5]) -> Result<Self, CameraError> {
        Ok(Self::new(
            CameraIntrinsics::from_matrix(k)?,
            BrownConrady5::from_coeffs(dist)?,
        ))
    }

    /// Project a point given in the camera frame to pixels.
    ///
    /// A point on the `z = 0` plane is projected with `1/z` replaced by 1
    /// instead of producing infinities.
    pub fn project(&self, pc: &Point3<f64>) -> Point2<f64> {
        let inv_z = if pc.z != 0.0 { 1.0 / pc.z } else { 1.0 };
        let n = Vector2::new(pc.x * inv_z, pc.y * inv_z);
        self.intrinsics.to_pixel(&self.distortion.distort(&n))
    }

    /// Map an observed (distorted) pixel to undistorted normalized coordinates.
    pub fn undistort_pixel(&self, p: &Point2<f64>) -> Vector2<f64> {
        self.distortion
            .undistort(&self.intrinsics.to_normalized(p))
    }
}
