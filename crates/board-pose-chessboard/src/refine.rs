//! Sub-pixel corner refinement by gradient orthogonality.
//!
//! Around a saddle point `q` every image gradient `g(p)` is orthogonal to
//! `p - q`: either `p` sits on an edge through `q` (gradient across the
//! edge) or in a flat region (zero gradient). Summing `g gᵀ (p - q) = 0`
//! over a Gaussian-weighted window gives a 2x2 linear system for `q`,
//! which is re-solved with the window re-centred until the update is small.

use crate::params::RefineParams;
use board_pose_core::{sample_gradient, GrayImageView};
use nalgebra::{Matrix2, Point2, Vector2};

/// Half window size for a corner with the given local grid spacing.
pub fn half_window_for_spacing(spacing: f32, params: &RefineParams) -> i32 {
    let half = (params.window_fraction * spacing).round() as i32;
    half.clamp(params.min_half_window, params.max_half_window.max(params.min_half_window))
}

/// Refine a single corner. Returns `None` when the system is singular or
/// the estimate leaves the search window.
pub fn refine_corner(
    img: &GrayImageView<'_>,
    start: Point2<f32>,
    half: i32,
    params: &RefineParams,
) -> Option<Point2<f32>> {
    if img.is_empty() || half < 1 {
        return None;
    }

    let sigma = (half as f32 * 0.5).max(1.0);
    let inv_two_sigma2 = 1.0 / (2.0 * sigma * sigma);
    let mut q = start;

    for _ in 0..params.max_iters.max(1) {
        let mut a = Matrix2::<f32>::zeros();
        let mut b = Vector2::<f32>::zeros();

        for dy in -half..=half {
            for dx in -half..=half {
                let p = Vector2::new(q.x + dx as f32, q.y + dy as f32);
                let g = sample_gradient(img, p.x, p.y);
                let w = (-((dx * dx + dy * dy) as f32) * inv_two_sigma2).exp();
                let gg = g * g.transpose() * w;
                a += gg;
                b += gg * p;
            }
        }

        let trace = a.trace();
        if trace <= f32::EPSILON || a.determinant() <= 1e-6 * trace * trace {
            return None;
        }
        let next = a.try_inverse()? * b;
        let next = Point2::new(next.x, next.y);

        let shift = (next - q).norm();
        q = next;
        if (q - start).norm() > half as f32 {
            return None;
        }
        if shift < params.epsilon {
            break;
        }
    }

    Some(q)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocess::gray_view;
    use image::{GrayImage, Luma};

    /// Supersampled X-junction centred at `(cx, cy)`.
    fn saddle(w: usize, h: usize, cx: f32, cy: f32) -> GrayImage {
        const SS: usize = 8;
        let mut data = vec![0u8; w * h];
        for y in 0..h {
            for x in 0..w {
                let mut acc = 0.0f32;
                for sy in 0..SS {
                    for sx in 0..SS {
                        let px = x as f32 - 0.5 + (sx as f32 + 0.5) / SS as f32;
                        let py = y as f32 - 0.5 + (sy as f32 + 0.5) / SS as f32;
                        let white = (px < cx) == (py < cy);
                        acc += if white { 230.0 } else { 20.0 };
                    }
                }
                data[y * w + x] = (acc / (SS * SS) as f32).round() as u8;
            }
        }
        GrayImage::from_raw(w as u32, h as u32, data).expect("sized")
    }

    #[test]
    fn converges_to_true_saddle() {
        let img = saddle(32, 32, 15.3, 16.6);
        let params = RefineParams::default();
        let refined =
            refine_corner(&gray_view(&img), Point2::new(16.0, 16.0), 5, &params).expect("refined");
        assert!((refined.x - 15.3).abs() < 0.1, "x = {}", refined.x);
        assert!((refined.y - 16.6).abs() < 0.1, "y = {}", refined.y);
    }

    #[test]
    fn flat_patch_is_rejected() {
        let img = GrayImage::from_pixel(20, 20, Luma([128]));
        let params = RefineParams::default();
        assert!(refine_corner(&gray_view(&img), Point2::new(10.0, 10.0), 4, &params).is_none());
    }

    #[test]
    fn window_tracks_spacing() {
        let params = RefineParams::default();
        assert_eq!(half_window_for_spacing(2.0, &params), params.min_half_window);
        assert_eq!(half_window_for_spacing(20.0, &params), 6);
        assert_eq!(half_window_for_spacing(200.0, &params), params.max_half_window);
    }
}
