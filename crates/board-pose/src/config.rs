//! JSON configuration read once at startup.

use board_pose_chessboard::{ChessboardParams, DetectorFlags};
use board_pose_core::{BoardError, BoardSpec, CameraError, CameraModel};
use crate::render::{FontError, ReadoutFont};
use board_pose_pnp::PnpParams;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("invalid camera: {0}")]
    Camera(#[from] CameraError),
    #[error("invalid pattern: {0}")]
    Pattern(#[from] BoardError),
    #[error("font {path}: {source}")]
    Font {
        path: PathBuf,
        #[source]
        source: FontError,
    },
}

fn default_window_title() -> String {
    "Pose Estimation (Chessboard)".to_string()
}

fn default_frame_delay_ms() -> u64 {
    10
}

/// Inner-corner grid of the printed pattern.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PatternConfig {
    pub cols: u32,
    pub rows: u32,
    pub cell_size: f64,
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            cols: 10,
            rows: 7,
            cell_size: 0.025,
        }
    }
}

/// Everything the pose loop needs.
///
/// Missing keys fall back to the defaults below, so `{}` is a valid config.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Row-major 3x3 intrinsic matrix.
    #[serde(default = "PipelineConfig::default_camera_matrix")]
    pub camera_matrix: [[f64; 3]; 3],
    /// `[k1, k2, p1, p2, k3]`.
    #[serde(default = "PipelineConfig::default_dist_coeffs")]
    pub dist_coeffs: [f64; 5],
    #[serde(default)]
    pub pattern: PatternConfig,
    #[serde(default)]
    pub flags: DetectorFlags,
    #[serde(default = "default_window_title")]
    pub window_title: String,
    #[serde(default = "default_frame_delay_ms")]
    pub frame_delay_ms: u64,
    /// Detector overrides. `flags` above always wins over `detector.flags`.
    #[serde(default)]
    pub detector: Option<ChessboardParams>,
    #[serde(default)]
    pub solver: Option<PnpParams>,
    /// TrueType font for the position readout; built-in glyphs if unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_path: Option<PathBuf>,
}

impl PipelineConfig {
    fn default_camera_matrix() -> [[f64; 3]; 3] {
        [
            [588.09499804, 0.0, 633.1719751],
            [0.0, 593.84617224, 353.32181687],
            [0.0, 0.0, 1.0],
        ]
    }

    fn default_dist_coeffs() -> [f64; 5] {
        [
            0.10588554,
            -0.19755432,
            -0.00568951,
            -0.00416748,
            0.12764793,
        ]
    }

    /// Load a JSON config from disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Validated camera model.
    pub fn camera(&self) -> Result<CameraModel, ConfigError> {
        Ok(CameraModel::from_raw(&self.camera_matrix, self.dist_coeffs)?)
    }

    /// Validated pattern geometry.
    pub fn board(&self) -> Result<BoardSpec, ConfigError> {
        let board = BoardSpec::new(self.pattern.cols, self.pattern.rows, self.pattern.cell_size);
        board.validate()?;
        Ok(board)
    }

    /// Detector parameters with the top-level flags applied.
    pub fn detector_params(&self) -> ChessboardParams {
        let mut params = self.detector.clone().unwrap_or_default();
        params.flags = self.flags;
        params
    }

    pub fn solver_params(&self) -> PnpParams {
        self.solver.clone().unwrap_or_default()
    }

    /// Readout font, loaded from `font_path` when set.
    pub fn readout_font(&self) -> Result<ReadoutFont, ConfigError> {
        match &self.font_path {
            None => Ok(ReadoutFont::Bitmap),
            Some(path) => ReadoutFont::load(path).map_err(|source| ConfigError::Font {
                path: path.clone(),
                source,
            }),
        }
    }

    /// Check every part of the config at once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.camera()?;
        self.board()?;
        self.readout_font()?;
        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            camera_matrix: Self::default_camera_matrix(),
            dist_coeffs: Self::default_dist_coeffs(),
            pattern: PatternConfig::default(),
            flags: DetectorFlags::default(),
            window_title: default_window_title(),
            frame_delay_ms: default_frame_delay_ms(),
            detector: None,
            solver: None,
            font_path: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_json_gives_defaults() {
        let cfg: PipelineConfig = serde_json::from_str("{}").expect("parse");
        assert_eq!(cfg, PipelineConfig::default());
        assert_eq!(cfg.window_title, "Pose Estimation (Chessboard)");
        assert_eq!(cfg.frame_delay_ms, 10);
        assert!(cfg.flags.adaptive_threshold && cfg.flags.normalize_image && cfg.flags.fast_check);

        let board = cfg.board().expect("board");
        assert_eq!((board.cols, board.rows), (10, 7));
        let cam = cfg.camera().expect("camera");
        assert_eq!(cam.intrinsics.cx, 633.1719751);
        assert_eq!(cam.distortion.coeffs()[4], 0.12764793);
    }

    #[test]
    fn top_level_flags_override_detector_block() {
        let cfg: PipelineConfig = serde_json::from_str(
            r#"{ "flags": { "fast_check": false }, "detector": { "min_strength": 2.0 } }"#,
        )
        .expect("parse");
        let params = cfg.detector_params();
        assert!(!params.flags.fast_check);
        assert_eq!(params.min_strength, 2.0);
    }

    #[test]
    fn malformed_values_fail_fast() {
        let mut cfg = PipelineConfig::default();
        cfg.camera_matrix[2] = [0.0, 0.0, 2.0];
        assert!(matches!(cfg.validate(), Err(ConfigError::Camera(_))));

        let mut cfg = PipelineConfig::default();
        cfg.camera_matrix[0][0] = -1.0;
        assert!(matches!(cfg.camera(), Err(ConfigError::Camera(_))));

        let mut cfg = PipelineConfig::default();
        cfg.dist_coeffs[1] = f64::NAN;
        assert!(matches!(cfg.camera(), Err(ConfigError::Camera(_))));

        let mut cfg = PipelineConfig::default();
        cfg.pattern.rows = 0;
        assert!(matches!(cfg.board(), Err(ConfigError::Pattern(_))));

        let mut cfg = PipelineConfig::default();
        cfg.pattern = PatternConfig {
            cols: 3,
            rows: 1,
            cell_size: 0.02,
        };
        assert!(matches!(cfg.board(), Err(ConfigError::Pattern(_))));

        let mut cfg = PipelineConfig::default();
        cfg.pattern.cell_size = 0.0;
        assert!(matches!(cfg.validate(), Err(ConfigError::Pattern(_))));
    }

    #[test]
    fn json_round_trip_through_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.json");
        let mut cfg = PipelineConfig::default();
        cfg.frame_delay_ms = 33;
        cfg.write_json(&path).expect("write");
        assert_eq!(PipelineConfig::load_json(&path).expect("load"), cfg);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = PipelineConfig::load_json("/nonexistent/board-pose.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
