//! 8-bit grayscale rasters and sub-pixel sampling.
//!
//! Samples outside the raster replicate the nearest border pixel so that
//! gradient windows touching the edge do not see a false step to black.

use nalgebra::Vector2;

/// Borrowed row-major grayscale raster.
#[derive(Clone, Copy, Debug)]
pub struct GrayImageView<'a> {
    pub width: usize,
    pub height: usize,
    pub data: &'a [u8], // len = width * height
}

impl GrayImageView<'_> {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

#[inline]
fn get_clamped(src: &GrayImageView<'_>, x: i32, y: i32) -> f32 {
    let xc = x.clamp(0, src.width as i32 - 1) as usize;
    let yc = y.clamp(0, src.height as i32 - 1) as usize;
    src.data[yc * src.width + xc] as f32
}

/// Bilinear intensity at `(x, y)`; pixel centers sit on integer coordinates.
///
/// Returns 0 for an empty raster.
#[inline]
pub fn sample_bilinear(src: &GrayImageView<'_>, x: f32, y: f32) -> f32 {
    if src.is_empty() {
        return 0.0;
    }
    let x0 = x.floor() as i32;
    let y0 = y.floor() as i32;
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let p00 = get_clamped(src, x0, y0);
    let p10 = get_clamped(src, x0 + 1, y0);
    let p01 = get_clamped(src, x0, y0 + 1);
    let p11 = get_clamped(src, x0 + 1, y0 + 1);

    let a = p00 + fx * (p10 - p00);
    let b = p01 + fx * (p11 - p01);
    a + fy * (b - a)
}

/// Central-difference intensity gradient `(dI/dx, dI/dy)` at `(x, y)`.
#[inline]
pub fn sample_gradient(src: &GrayImageView<'_>, x: f32, y: f32) -> Vector2<f32> {
    let gx = 0.5 * (sample_bilinear(src, x + 1.0, y) - sample_bilinear(src, x - 1.0, y));
    let gy = 0.5 * (sample_bilinear(src, x, y + 1.0) - sample_bilinear(src, x, y - 1.0));
    Vector2::new(gx, gy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn ramp(w: usize, h: usize) -> Vec<u8> {
        (0..h)
            .flat_map(|_| (0..w).map(|x| (x * 10) as u8))
            .collect()
    }

    fn view(data: &[u8], width: usize) -> GrayImageView<'_> {
        GrayImageView {
            width,
            height: data.len() / width,
            data,
        }
    }

    #[test]
    fn bilinear_interpolates_between_pixels() {
        let data = ramp(8, 4);
        let v = view(&data, 8);
        assert_relative_eq!(sample_bilinear(&v, 2.0, 1.0), 20.0);
        assert_relative_eq!(sample_bilinear(&v, 2.5, 1.7), 25.0);
    }

    #[test]
    fn border_is_replicated() {
        let data = ramp(8, 4);
        let v = view(&data, 8);
        assert_relative_eq!(sample_bilinear(&v, -3.0, 0.0), 0.0);
        assert_relative_eq!(sample_bilinear(&v, 20.0, 2.0), 70.0);
    }

    #[test]
    fn gradient_of_ramp_is_constant() {
        let data = ramp(8, 4);
        let v = view(&data, 8);
        let g = sample_gradient(&v, 3.25, 1.5);
        assert_relative_eq!(g.x, 10.0, epsilon = 1e-4);
        assert_relative_eq!(g.y, 0.0, epsilon = 1e-4);
    }

    #[test]
    fn empty_view_samples_zero() {
        let v = view(&[], 1);
        assert!(v.is_empty());
        assert_eq!(sample_bilinear(&v, 0.5, 0.5), 0.0);
    }
}
