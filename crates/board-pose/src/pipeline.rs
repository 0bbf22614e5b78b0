//! Per-frame pose estimation: detect, solve, project, locate.

use crate::config::{ConfigError, PipelineConfig};
use crate::overlay::OverlayModel;
use crate::render::{draw_camera_position, draw_pyramid, ReadoutFont};
use board_pose_chessboard::{to_gray, ChessboardDetectError, ChessboardDetection, ChessboardDetector};
use board_pose_core::{BoardSpec, CameraModel};
use board_pose_pnp::{
    project_points, solve_pnp, to_pixel_coords, PnpError, PnpParams, PnpSolution, Pose,
};
use image::RgbImage;
use nalgebra::{Point2, Point3, Vector3};
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Why a frame produced no pose. Neither case stops the loop.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum FrameError {
    #[error("pattern not found: {0}")]
    NotDetected(#[from] ChessboardDetectError),
    #[error("pose solve failed on {corners} corners: {source}")]
    Solve {
        corners: usize,
        #[source]
        source: PnpError,
    },
}

/// Everything derived from one successfully posed frame.
#[derive(Clone, Debug)]
pub struct PoseEstimate {
    pub detection: ChessboardDetection,
    pub solution: PnpSolution,
    /// Projected pyramid vertices, sub-pixel.
    pub projected: Vec<Point2<f64>>,
    /// The same vertices truncated for drawing.
    pub overlay_pixels: Vec<Point2<i32>>,
    pub camera_position: Vector3<f64>,
}

impl PoseEstimate {
    pub fn pose(&self) -> &Pose {
        &self.solution.pose
    }
}

/// Stateless per-frame processor built once from the configuration.
#[derive(Clone, Debug)]
pub struct FramePipeline {
    camera: CameraModel,
    board: BoardSpec,
    object_points: Vec<Point3<f64>>,
    overlay: OverlayModel,
    detector: ChessboardDetector,
    solver: PnpParams,
    font: ReadoutFont,
}

impl FramePipeline {
    pub fn new(config: &PipelineConfig) -> Result<Self, ConfigError> {
        let camera = config.camera()?;
        let board = config.board()?;
        Ok(Self {
            camera,
            board,
            object_points: board.object_points(),
            overlay: OverlayModel::new(board.cell_size),
            detector: ChessboardDetector::new(&board, config.detector_params()),
            solver: config.solver_params(),
            font: config.readout_font()?,
        })
    }

    pub fn camera(&self) -> &CameraModel {
        &self.camera
    }

    pub fn board(&self) -> &BoardSpec {
        &self.board
    }

    /// Detect the pattern, solve for the pose and project the overlay.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip_all, fields(width = frame.width(), height = frame.height()))
    )]
    pub fn process(&self, frame: &RgbImage) -> Result<PoseEstimate, FrameError> {
        let gray = to_gray(frame);
        let detection = self.detector.detect(&gray)?;
        let solution = solve_pnp(
            &self.object_points,
            &detection.image_points(),
            &self.camera,
            &self.solver,
        )
        .map_err(|source| FrameError::Solve {
            corners: detection.len(),
            source,
        })?;

        let projected = project_points(self.overlay.points(), &solution.pose, &self.camera);
        let overlay_pixels = to_pixel_coords(&projected);
        let camera_position = solution.pose.camera_position();

        Ok(PoseEstimate {
            detection,
            solution,
            projected,
            overlay_pixels,
            camera_position,
        })
    }

    /// Draw the pyramid and the position readout onto the frame.
    pub fn annotate(&self, frame: &mut RgbImage, estimate: &PoseEstimate) {
        draw_pyramid(frame, &estimate.overlay_pixels);
        draw_camera_position(frame, &estimate.camera_position, &self.font);
    }
}


/// One line of the per-frame JSON report.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FrameReport {
    pub index: usize,
    pub detected: bool,
    pub corners: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pose: Option<Pose>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rmse: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub camera_position: Option<[f64; 3]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FrameReport {
    pub fn new(index: usize, result: &Result<PoseEstimate, FrameError>) -> Self {
        match result {
            Ok(est) => Self {
                index,
                detected: true,
                corners: est.detection.len(),
                pose: Some(est.solution.pose),
                rmse: Some(est.solution.rmse),
                camera_position: Some(est.camera_position.into()),
                error: None,
            },
            Err(err) => Self {
                index,
                detected: matches!(err, FrameError::Solve { .. }),
                corners: match err {
                    FrameError::Solve { corners, .. } => *corners,
                    FrameError::NotDetected(_) => 0,
                },
                pose: None,
                rmse: None,
                camera_position: None,
                error: Some(err.to_string()),
            },
        }
    }
}
