//! Perspective-n-point pose estimation for a calibrated camera.
//!
//! [`solve_pnp`] undistorts the observed pixels, computes a linear initial
//! pose (homography decomposition for planar targets, DLT otherwise) and
//! polishes it with Levenberg–Marquardt on the pixel reprojection error
//! through the full [`board_pose_core::CameraModel`].
//!
//! [`project_points`] is the forward model used both for refinement and for
//! rendering overlays; [`Pose::camera_position`] gives the camera center in
//! pattern coordinates.

mod dlt;
mod planar;
mod pose;
mod project;
mod refine;
mod rotation;
mod solver;

pub use dlt::dlt_pose;
pub use planar::planar_pose;
pub use pose::Pose;
pub use project::{project_points, reprojection_rmse, to_pixel_coords};
pub use refine::{refine_pose, LmParams, RefineReport};
pub use rotation::{matrix_to_rodrigues, project_to_so3, rodrigues_to_matrix};
pub use solver::{
    solve_pnp, PnpError, PnpParams, PnpSolution, MIN_GENERAL_POINTS, MIN_PLANAR_POINTS,
};
