use crate::dlt::dlt_pose;
use crate::planar::planar_pose;
use crate::pose::Pose;
use crate::refine::{refine_pose, LmParams};
use board_pose_core::CameraModel;
use log::debug;
use nalgebra::{Point2, Point3};
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Minimum correspondences for a planar target.
pub const MIN_PLANAR_POINTS: usize = 4;
/// Minimum correspondences for a general 3D point set.
pub const MIN_GENERAL_POINTS: usize = 6;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum PnpError {
    #[error("got {object} object points but {image} image points")]
    MismatchedLengths { object: usize, image: usize },
    #[error("need at least {needed} correspondences, got {got}")]
    NotEnoughPoints { got: usize, needed: usize },
    #[error("degenerate configuration: {0}")]
    Degenerate(&'static str),
    #[error("refinement did not produce a finite pose")]
    NotConverged,
}

/// Solver settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PnpParams {
    /// Run Levenberg–Marquardt after the linear initialisation.
    pub refine: bool,
    pub max_iters: usize,
    pub cost_tolerance: f64,
    /// Object points whose z spread is below this fraction of their extent
    /// are treated as planar.
    pub planarity_tolerance: f64,
}

impl Default for PnpParams {
    fn default() -> Self {
        Self {
            refine: true,
            max_iters: 50,
            cost_tolerance: 1e-12,
            planarity_tolerance: 1e-9,
        }
    }
}

/// Estimated pose with fit quality.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct PnpSolution {
    pub pose: Pose,
    /// Root-mean-square reprojection error in pixels.
    pub rmse: f64,
    /// Levenberg–Marquardt iterations (0 without refinement).
    pub iterations: usize,
    pub converged: bool,
}

/// Common `z` of the object points if they lie on a plane `z = const`.
fn common_plane_z(object: &[Point3<f64>], tolerance: f64) -> Option<f64> {
    let (mut lo, mut hi) = (f64::INFINITY, f64::NEG_INFINITY);
    let mut extent = 0.0f64;
    for p in object {
        lo = lo.min(p.z);
        hi = hi.max(p.z);
        extent = extent.max(p.x.abs()).max(p.y.abs());
    }
    (hi - lo <= tolerance * extent.max(1.0)).then_some(0.5 * (lo + hi))
}

/// Estimate the pattern-to-camera pose from 3D/2D correspondences.
///
/// Image points are distorted pixels; they are undistorted for the linear
/// initialisation and the refinement measures error in distorted pixels.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip_all, fields(points = object.len()))
)]
pub fn solve_pnp(
    object: &[Point3<f64>],
    image: &[Point2<f64>],
    camera: &CameraModel,
    params: &PnpParams,
) -> Result<PnpSolution, PnpError> {
    if object.len() != image.len() {
        return Err(PnpError::MismatchedLengths {
            object: object.len(),
            image: image.len(),
        });
    }
    if object.len() < MIN_PLANAR_POINTS {
        return Err(PnpError::NotEnoughPoints {
            got: object.len(),
            needed: MIN_PLANAR_POINTS,
        });
    }
    if object
        .iter()
        .flat_map(|p| p.iter())
        .chain(image.iter().flat_map(|p| p.iter()))
        .any(|v| !v.is_finite())
    {
        return Err(PnpError::Degenerate("non-finite input"));
    }

    let normalized: Vec<Point2<f64>> = image
        .iter()
        .map(|p| Point2::from(camera.undistort_pixel(p)))
        .collect();

    let initial = match common_plane_z(object, params.planarity_tolerance) {
        Some(z) => {
            let shifted: Vec<Point3<f64>> =
                object.iter().map(|p| Point3::new(p.x, p.y, p.z - z)).collect();
            planar_pose(&shifted, &normalized, z)?
        }
        None if object.len() >= MIN_GENERAL_POINTS => dlt_pose(object, &normalized)?,
        None => {
            return Err(PnpError::NotEnoughPoints {
                got: object.len(),
                needed: MIN_GENERAL_POINTS,
            })
        }
    };

    if !initial.is_finite() {
        return Err(PnpError::Degenerate("initial pose is not finite"));
    }
    let centroid = object.iter().fold(nalgebra::Vector3::zeros(), |acc, p| acc + p.coords)
        / object.len() as f64;
    if initial.transform_point(&Point3::from(centroid)).z <= 0.0 {
        return Err(PnpError::Degenerate("pattern is behind the camera"));
    }

    let (pose, iterations, converged) = if params.refine {
        let lm = LmParams {
            max_iters: params.max_iters,
            cost_tolerance: params.cost_tolerance,
            ..LmParams::default()
        };
        let report =
            refine_pose(&initial, object, image, camera, &lm).ok_or(PnpError::NotConverged)?;
        (report.pose, report.iterations, report.converged)
    } else {
        (initial, 0, true)
    };

    let rmse = crate::project::reprojection_rmse(object, image, &pose, camera)
        .ok_or(PnpError::Degenerate("no residuals"))?;
    debug!(
        "pnp: {} points, rmse {:.4}px, {} LM iterations (converged: {})",
        object.len(),
        rmse,
        iterations,
        converged
    );

    Ok(PnpSolution {
        pose,
        rmse,
        iterations,
        converged,
    })
}
