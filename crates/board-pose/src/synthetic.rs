//! Synthetic frames of a checkerboard seen by a calibrated camera.
//!
//! Each output pixel is supersampled: sample positions are undistorted,
//! cast as rays and intersected with the board plane `z = 0`, and the
//! checker colour at the hit point is averaged.

use board_pose_core::{BoardSpec, CameraModel};
use board_pose_pnp::Pose;
use image::{Rgb, RgbImage};
use nalgebra::{Matrix3, Point2, Vector3};

const BLACK: f64 = 25.0;
const WHITE: f64 = 235.0;

/// Offscreen renderer for a board under a known pose.
#[derive(Clone, Debug)]
pub struct BoardRenderer {
    pub width: u32,
    pub height: u32,
    /// Samples per pixel along each axis.
    pub supersample: u32,
    /// White border around the outer squares, in cells.
    pub margin_cells: f64,
    /// Gray level outside the board.
    pub background: u8,
}

impl BoardRenderer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            supersample: 3,
            margin_cells: 1.0,
            background: 120,
        }
    }

    /// Board of `(cols + 1) x (rows + 1)` squares whose inner corner
    /// `(c, r)` sits at `(c * s, r * s, 0)`.
    pub fn render(&self, camera: &CameraModel, board: &BoardSpec, pose: &Pose) -> RgbImage {
        let r = pose.rotation_matrix();
        let plane = Matrix3::from_columns(&[
            r.column(0).into_owned(),
            r.column(1).into_owned(),
            pose.tvec,
        ]);
        let Some(to_board) = plane.try_inverse() else {
            return RgbImage::from_pixel(self.width, self.height, Rgb([self.background; 3]));
        };

        let s = board.cell_size;
        let margin = self.margin_cells * s;
        let (u_lo, v_lo) = (-s - margin, -s - margin);
        let u_hi = board.cols as f64 * s + margin;
        let v_hi = board.rows as f64 * s + margin;

        let shade = |px: f64, py: f64| -> f64 {
            let n = camera.undistort_pixel(&Point2::new(px, py));
            let b = to_board * Vector3::new(n.x, n.y, 1.0);
            // behind the camera
            if b.z <= 0.0 {
                return self.background as f64;
            }
            let (u, v) = (b.x / b.z, b.y / b.z);
            if u < u_lo || u > u_hi || v < v_lo || v > v_hi {
                return self.background as f64;
            }
            let (a, c) = ((u / s).floor() as i64, (v / s).floor() as i64);
            let on_squares =
                a >= -1 && c >= -1 && a < board.cols as i64 && c < board.rows as i64;
            if on_squares && (a + c).rem_euclid(2) == 0 {
                BLACK
            } else {
                WHITE
            }
        };

        let n = self.supersample.max(1);
        let weight = 1.0 / (n * n) as f64;
        RgbImage::from_fn(self.width, self.height, |x, y| {
            let mut acc = 0.0;
            for sy in 0..n {
                for sx in 0..n {
                    let px = x as f64 - 0.5 + (sx as f64 + 0.5) / n as f64;
                    let py = y as f64 - 0.5 + (sy as f64 + 0.5) / n as f64;
                    acc += shade(px, py);
                }
            }
            let g = (acc * weight).round().clamp(0.0, 255.0) as u8;
            Rgb([g, g, g])
        })
    }
}

/// Board facing the camera squarely, its centre on the optical axis at
/// `distance`.
pub fn frontal_pose(board: &BoardSpec, distance: f64) -> Pose {
    let half_w = (board.cols as f64 - 1.0) * board.cell_size / 2.0;
    let half_h = (board.rows as f64 - 1.0) * board.cell_size / 2.0;
    Pose::new(Vector3::zeros(), Vector3::new(-half_w, -half_h, distance))
}

#[cfg(test)]
mod tests {
    use super::*;
    use board_pose_core::CameraIntrinsics;
    use board_pose_pnp::project_points;

    #[test]
    fn inner_corners_land_on_checker_junctions() {
        let camera = CameraModel::pinhole(CameraIntrinsics::new(500.0, 500.0, 160.0, 120.0));
        let board = BoardSpec::new(4, 3, 0.04);
        let pose = frontal_pose(&board, 0.6);
        let img = BoardRenderer::new(320, 240).render(&camera, &board, &pose);

        let corners = project_points(&board.object_points(), &pose, &camera);
        let cell_px = 500.0 * 0.04 / 0.6;
        for p in &corners {
            let q = cell_px / 2.0;
            let at = |dx: f64, dy: f64| img.get_pixel((p.x + dx) as u32, (p.y + dy) as u32)[0];
            // diagonal neighbours share a colour, adjacent ones differ
            assert_eq!(at(-q, -q), at(q, q));
            assert_eq!(at(q, -q), at(-q, q));
            assert_ne!(at(-q, -q), at(q, -q));
        }
    }

    #[test]
    fn board_behind_camera_is_background() {
        let camera = CameraModel::pinhole(CameraIntrinsics::new(300.0, 300.0, 32.0, 24.0));
        let board = BoardSpec::new(4, 3, 0.04);
        let pose = frontal_pose(&board, -0.5);
        let img = BoardRenderer::new(64, 48).render(&camera, &board, &pose);
        assert!(img.pixels().all(|p| p[0] == 120));
    }
}
