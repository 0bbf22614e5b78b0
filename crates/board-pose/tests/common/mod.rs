#![allow(dead_code)]

use board_pose::core::BoardSpec;
use board_pose::pnp::Pose;
use board_pose::synthetic::{frontal_pose, BoardRenderer};
use board_pose::PipelineConfig;
use image::RgbImage;

pub const WIDTH: u32 = 640;
pub const HEIGHT: u32 = 480;
pub const DISTANCE: f64 = 0.5;

/// Default pattern seen through a 640x480 camera with `f = 600`.
pub fn config(dist_coeffs: [f64; 5]) -> PipelineConfig {
    PipelineConfig {
        camera_matrix: [[600.0, 0.0, 320.0], [0.0, 600.0, 240.0], [0.0, 0.0, 1.0]],
        dist_coeffs,
        ..PipelineConfig::default()
    }
}

pub fn pinhole_config() -> PipelineConfig {
    config([0.0; 5])
}

pub fn render(config: &PipelineConfig, pose: &Pose) -> RgbImage {
    let camera = config.camera().expect("camera");
    let board = config.board().expect("board");
    let mut renderer = BoardRenderer::new(WIDTH, HEIGHT);
    renderer.supersample = 2;
    renderer.render(&camera, &board, pose)
}

pub fn frontal(config: &PipelineConfig) -> Pose {
    let board: BoardSpec = config.board().expect("board");
    frontal_pose(&board, DISTANCE)
}

pub fn blank() -> RgbImage {
    RgbImage::from_pixel(WIDTH, HEIGHT, image::Rgb([200, 200, 200]))
}
