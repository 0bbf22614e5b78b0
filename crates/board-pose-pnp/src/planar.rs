//! Initial pose of a planar target from a homography.

use crate::pose::Pose;
use crate::rotation::project_to_so3;
use crate::solver::PnpError;
use board_pose_core::estimate_homography;
use nalgebra::{Matrix3, Point2, Point3, Vector3};

/// Pose of points lying on the plane `z = plane_z` from undistorted
/// normalized image coordinates.
///
/// With `H ~ [r1 r2 t]` (pattern plane to normalized image), the scale is
/// the mean norm of the first two columns and the sign is chosen so the
/// plane origin lies in front of the camera.
pub fn planar_pose(
    object: &[Point3<f64>],
    normalized: &[Point2<f64>],
    plane_z: f64,
) -> Result<Pose, PnpError> {
    let src: Vec<Point2<f64>> = object.iter().map(|p| Point2::new(p.x, p.y)).collect();
    let h = estimate_homography(&src, normalized)
        .ok_or(PnpError::Degenerate("homography has no unique solution"))?
        .h;

    let h1: Vector3<f64> = h.column(0).into_owned();
    let h2: Vector3<f64> = h.column(1).into_owned();
    let h3: Vector3<f64> = h.column(2).into_owned();

    let scale = 0.5 * (h1.norm() + h2.norm());
    if !scale.is_finite() || scale < 1e-12 {
        return Err(PnpError::Degenerate("homography scale vanishes"));
    }
    let sign = if h3.z < 0.0 { -1.0 } else { 1.0 };
    let lambda = sign / scale;

    let r1 = h1 * lambda;
    let r2 = h2 * lambda;
    let t = h3 * lambda;
    let r3 = r1.cross(&r2);

    let r = project_to_so3(&Matrix3::from_columns(&[r1, r2, r3]))
        .ok_or(PnpError::Degenerate("rotation is not finite"))?;

    // Move from the shifted plane back to the original pattern frame.
    let t = t - r.column(2) * plane_z;
    Ok(Pose::from_rotation(&r, t))
}
