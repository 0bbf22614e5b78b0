//! Core types and utilities for planar board pose estimation.
//!
//! This crate is intentionally small and purely geometric. It does *not*
//! depend on any concrete corner detector or image decoding crate.
//!
//! - [`CameraModel`]: pinhole intrinsics plus Brown–Conrady distortion.
//! - [`BoardSpec`]: the checkerboard geometry and its row-major object points.
//! - [`Homography`]: normalized DLT estimation between planar point sets.
//! - [`GrayImageView`]: borrowed 8-bit raster with bilinear sampling.

mod board;
mod camera;
mod corner;
mod homography;
mod image;
mod logger;

pub use board::{BoardError, BoardSpec};
pub use camera::{BrownConrady5, CameraError, CameraIntrinsics, CameraModel};
pub use corner::{Corner, GridCoords};
pub use homography::{estimate_homography, Homography};
pub use image::{sample_bilinear, sample_gradient, GrayImageView};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::init_with_level;
