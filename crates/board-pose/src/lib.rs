//! Per-frame chessboard pose estimation with an augmented-reality overlay.
//!
//! For every frame the [`FramePipeline`] finds the `cols x rows` inner
//! corners of the pattern, solves for the pattern-to-camera pose, projects a
//! square pyramid standing on the board and derives the camera position in
//! pattern coordinates. [`PoseApp`] drives the pipeline over a
//! [`FrameSource`] and hands annotated frames to a [`Display`].
//!
//! ```no_run
//! use board_pose::{open_source, FrameDumpDisplay, PipelineConfig, PoseApp};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = PipelineConfig::load_json("pose.json")?;
//! let app = PoseApp::from_config(&config)?;
//! let mut source = open_source("frames/")?;
//! let mut display = FrameDumpDisplay::new("annotated/")?;
//! let summary = app.run(source.as_mut(), &mut display)?;
//! println!("{} of {} frames posed", summary.posed, summary.frames);
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `board_pose::core`: camera model, board geometry, homography.
//! - `board_pose::chessboard`: the pattern detector.
//! - `board_pose::pnp`: pose solver and projection.
//!
//! Video files are decoded through GStreamer with the `video` feature;
//! without it, inputs are frame directories, single images or `.txt` lists.

pub use board_pose_chessboard as chessboard;
pub use board_pose_core as core;
pub use board_pose_pnp as pnp;

mod app;
mod config;
mod display;
mod overlay;
mod pipeline;
pub mod render;
mod source;
pub mod synthetic;
#[cfg(feature = "video")]
mod video;

pub use app::{AppError, PoseApp, RunSummary};
pub use config::{ConfigError, PatternConfig, PipelineConfig};
pub use display::{Display, DisplayError, FrameDumpDisplay, Key, ScriptedDisplay};
pub use overlay::{OverlayModel, BASE_EDGES, STRUT_EDGES};
pub use pipeline::{FrameError, FramePipeline, FrameReport, PoseEstimate};
pub use render::ReadoutFont;
pub use source::{
    is_video_path, open_source, FrameSource, ImageSequence, InMemoryFrames, SourceError,
};
#[cfg(feature = "video")]
pub use video::VideoFile;
