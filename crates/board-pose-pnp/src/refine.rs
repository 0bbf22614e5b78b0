//! Levenberg–Marquardt refinement of a pose over pixel reprojection error.

use crate::pose::Pose;
use crate::project::project_points;
use board_pose_core::CameraModel;
use nalgebra::{DMatrix, DVector, Matrix6, Point2, Point3, Vector3, Vector6};

/// Outcome of a refinement run.
#[derive(Clone, Copy, Debug)]
pub struct RefineReport {
    pub pose: Pose,
    /// Sum of squared pixel residuals at `pose`.
    pub cost: f64,
    pub iterations: usize,
    pub converged: bool,
}

#[derive(Clone, Copy, Debug)]
pub struct LmParams {
    pub max_iters: usize,
    /// Stop once the relative cost decrease falls below this.
    pub cost_tolerance: f64,
    /// Stop once the parameter update norm falls below this.
    pub step_tolerance: f64,
    pub initial_lambda: f64,
}

impl Default for LmParams {
    fn default() -> Self {
        Self {
            max_iters: 50,
            cost_tolerance: 1e-12,
            step_tolerance: 1e-12,
            initial_lambda: 1e-3,
        }
    }
}

fn pack(pose: &Pose) -> Vector6<f64> {
    Vector6::new(
        pose.rvec.x, pose.rvec.y, pose.rvec.z, pose.tvec.x, pose.tvec.y, pose.tvec.z,
    )
}

fn unpack(x: &Vector6<f64>) -> Pose {
    Pose::new(
        Vector3::new(x[0], x[1], x[2]),
        Vector3::new(x[3], x[4], x[5]),
    )
}

fn residuals(
    x: &Vector6<f64>,
    object: &[Point3<f64>],
    image: &[Point2<f64>],
    camera: &CameraModel,
) -> DVector<f64> {
    let projected = project_points(object, &unpack(x), camera);
    let mut r = DVector::zeros(2 * object.len());
    for (k, (p, q)) in projected.iter().zip(image).enumerate() {
        r[2 * k] = p.x - q.x;
        r[2 * k + 1] = p.y - q.y;
    }
    r
}

/// Central-difference Jacobian of the residual vector.
fn jacobian(
    x: &Vector6<f64>,
    object: &[Point3<f64>],
    image: &[Point2<f64>],
    camera: &CameraModel,
) -> DMatrix<f64> {
    let mut j = DMatrix::zeros(2 * object.len(), 6);
    for c in 0..6 {
        let h = 1e-6 * x[c].abs().max(1.0);
        let mut xp = *x;
        let mut xm = *x;
        xp[c] += h;
        xm[c] -= h;
        let d = (residuals(&xp, object, image, camera) - residuals(&xm, object, image, camera))
            / (2.0 * h);
        j.set_column(c, &d);
    }
    j
}

/// Minimise the sum of squared reprojection errors, starting at `initial`.
///
/// The damping is multiplicative on the diagonal of `JᵀJ` (Marquardt).
/// Returns `None` if the cost becomes non-finite.
pub fn refine_pose(
    initial: &Pose,
    object: &[Point3<f64>],
    image: &[Point2<f64>],
    camera: &CameraModel,
    params: &LmParams,
) -> Option<RefineReport> {
    let mut x = pack(initial);
    let mut r = residuals(&x, object, image, camera);
    let mut cost = r.norm_squared();
    if !cost.is_finite() {
        return None;
    }

    let mut lambda = params.initial_lambda;
    let mut converged = false;
    let mut iterations = 0;

    while iterations < params.max_iters {
        iterations += 1;
        if cost == 0.0 {
            converged = true;
            break;
        }

        let j = jacobian(&x, object, image, camera);
        let jt = j.transpose();
        let jtj: Matrix6<f64> = (&jt * &j).fixed_view::<6, 6>(0, 0).into_owned();
        let g: Vector6<f64> = (&jt * &r).fixed_rows::<6>(0).into_owned();

        let mut accepted = false;
        while lambda < 1e12 {
            let mut a = jtj;
            for d in 0..6 {
                a[(d, d)] += lambda * jtj[(d, d)].max(1e-12);
            }
            let Some(chol) = a.cholesky() else {
                lambda *= 10.0;
                continue;
            };
            let step = -chol.solve(&g);
            let candidate = x + step;
            let r_new = residuals(&candidate, object, image, camera);
            let cost_new = r_new.norm_squared();

            if cost_new.is_finite() && cost_new < cost {
                let rel = (cost - cost_new) / cost;
                x = candidate;
                r = r_new;
                cost = cost_new;
                lambda = (lambda * 0.1).max(1e-12);
                accepted = true;
                if rel < params.cost_tolerance || step.norm() < params.step_tolerance {
                    converged = true;
                }
                break;
            }
            lambda *= 10.0;
        }

        if !accepted {
            // No descent direction left: we sit at a minimum.
            converged = true;
            break;
        }
        if converged {
            break;
        }
    }

    let pose = unpack(&x);
    if !pose.is_finite() || !cost.is_finite() {
        return None;
    }
    Some(RefineReport {
        pose,
        cost,
        iterations,
        converged,
    })
}
