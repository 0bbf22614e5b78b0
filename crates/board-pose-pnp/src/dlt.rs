//! Linear pose of a non-planar point set.

use crate::pose::Pose;
use crate::rotation::project_to_so3;
use crate::solver::PnpError;
use nalgebra::{DMatrix, Matrix3, Point2, Point3, Vector3};

/// Direct linear transform on `[R | t]` from `N >= 6` correspondences with
/// undistorted normalized image coordinates.
///
/// Object points are centred and scaled before the solve; the 3x4 null
/// vector is then split into a rotation (closest orthogonal matrix) and a
/// translation.
pub fn dlt_pose(object: &[Point3<f64>], normalized: &[Point2<f64>]) -> Result<Pose, PnpError> {
    let n = object.len();
    let centroid = object.iter().fold(Vector3::zeros(), |acc, p| acc + p.coords) / n as f64;
    let mean_dist = object
        .iter()
        .map(|p| (p.coords - centroid).norm())
        .sum::<f64>()
        / n as f64;
    if mean_dist < 1e-12 {
        return Err(PnpError::Degenerate("object points coincide"));
    }
    let s = 3.0_f64.sqrt() / mean_dist;

    let mut a = DMatrix::<f64>::zeros(2 * n, 12);
    for (i, (obj, img)) in object.iter().zip(normalized).enumerate() {
        let x = (obj.coords - centroid) * s;
        let (xn, yn) = (img.x, img.y);

        let r0 = 2 * i;
        let r1 = r0 + 1;

        a[(r0, 0)] = x.x;
        a[(r0, 1)] = x.y;
        a[(r0, 2)] = x.z;
        a[(r0, 3)] = 1.0;
        a[(r0, 8)] = -xn * x.x;
        a[(r0, 9)] = -xn * x.y;
        a[(r0, 10)] = -xn * x.z;
        a[(r0, 11)] = -xn;

        a[(r1, 4)] = x.x;
        a[(r1, 5)] = x.y;
        a[(r1, 6)] = x.z;
        a[(r1, 7)] = 1.0;
        a[(r1, 8)] = -yn * x.x;
        a[(r1, 9)] = -yn * x.y;
        a[(r1, 10)] = -yn * x.z;
        a[(r1, 11)] = -yn;
    }

    // Thin SVD of a 2N x 12 matrix only has 12 right singular vectors when
    // 2N >= 12, which the caller guarantees.
    let svd = a.svd(false, true);
    let vt = svd.v_t.ok_or(PnpError::Degenerate("SVD failed"))?;
    let (min_idx, _) = svd
        .singular_values
        .iter()
        .copied()
        .enumerate()
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .ok_or(PnpError::Degenerate("SVD failed"))?;
    let p = vt.row(min_idx);

    let mut m = Matrix3::new(
        p[0], p[1], p[2], //
        p[4], p[5], p[6], //
        p[8], p[9], p[10],
    );
    let mut t = Vector3::new(p[3], p[7], p[11]);

    // `t` is the camera-frame centroid up to scale; it must be in front.
    if t.z < 0.0 {
        m = -m;
        t = -t;
    }

    let sv = m.singular_values();
    let scale = (sv[0] + sv[1] + sv[2]) / 3.0;
    if !scale.is_finite() || scale < 1e-12 {
        return Err(PnpError::Degenerate("DLT scale vanishes"));
    }
    let r = project_to_so3(&m).ok_or(PnpError::Degenerate("rotation is not finite"))?;

    // x ~ scale * (R * s * (X - c)) + t  =>  X_cam = R X + (t / (scale * s) - R c)
    let t = t / (scale * s) - r * centroid;
    Ok(Pose::from_rotation(&r, t))
}
