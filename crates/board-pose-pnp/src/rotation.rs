//! Axis-angle (Rodrigues) conversions and orthogonalization.

use nalgebra::{Matrix3, Rotation3, Vector3};

/// Rotation matrix of an axis-angle vector (axis times angle in radians).
pub fn rodrigues_to_matrix(rvec: &Vector3<f64>) -> Matrix3<f64> {
    Rotation3::from_scaled_axis(*rvec).into_inner()
}

/// Axis-angle vector of a rotation matrix. The input is re-orthogonalized
/// first, so small numerical drift is tolerated.
pub fn matrix_to_rodrigues(r: &Matrix3<f64>) -> Vector3<f64> {
    let r = project_to_so3(r).unwrap_or(*r);
    Rotation3::from_matrix_unchecked(r).scaled_axis()
}

/// Closest rotation to `m` in the Frobenius sense, `U diag(1, 1, ±1) Vᵀ`.
pub fn project_to_so3(m: &Matrix3<f64>) -> Option<Matrix3<f64>> {
    if m.iter().any(|v| !v.is_finite()) {
        return None;
    }
    let svd = m.svd(true, true);
    let mut u = svd.u?;
    let vt = svd.v_t?;
    if (u * vt).determinant() < 0.0 {
        let c = -u.column(2).into_owned();
        u.set_column(2, &c);
    }
    Some(u * vt)
}
