//! Overlay drawing on RGB frames, built on `imageproc::drawing`.
//!
//! The position readout is rendered with a TrueType font when one is
//! configured and with the `font8x8` bitmap glyphs otherwise.

use crate::overlay::{BASE_EDGES, STRUT_EDGES};
use ab_glyph::{Font, FontVec, PxScale, ScaleFont};
use font8x8::{UnicodeFonts, BASIC_FONTS};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_line_segment_mut, draw_text_mut};
use imageproc::rect::Rect;
use nalgebra::{Point2, Vector3};
use std::path::Path;
use std::sync::Arc;

pub const BLUE: Rgb<u8> = Rgb([0, 0, 255]);
pub const GREEN: Rgb<u8> = Rgb([0, 255, 0]);

pub const LINE_THICKNESS: u32 = 2;
/// Baseline-left anchor of the position readout.
pub const TEXT_ORIGIN: (i32, i32) = (10, 25);
/// Each bitmap glyph pixel becomes a `TEXT_SCALE x TEXT_SCALE` block.
pub const TEXT_SCALE: u32 = 2;
/// Pixel height of TrueType text.
pub const TEXT_HEIGHT_PX: f32 = 20.0;

/// Rows of a `font8x8` glyph that sit above the baseline.
const GLYPH_ASCENT: i32 = 7;
const GLYPH_ADVANCE: i32 = 8;

/// Font used for the position readout.
#[derive(Clone, Default)]
pub enum ReadoutFont {
    /// `font8x8` basic Latin glyphs.
    #[default]
    Bitmap,
    TrueType(Arc<FontVec>),
}

impl std::fmt::Debug for ReadoutFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bitmap => f.write_str("Bitmap"),
            Self::TrueType(_) => f.write_str("TrueType(..)"),
        }
    }
}

impl ReadoutFont {
    /// Load a TrueType/OpenType font file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, FontError> {
        let data = std::fs::read(path)?;
        let font = FontVec::try_from_vec(data).map_err(|_| FontError::Invalid)?;
        Ok(Self::TrueType(Arc::new(font)))
    }

    /// Draw `text` with its baseline-left corner at `origin`.
    pub fn draw(&self, img: &mut RgbImage, text: &str, origin: (i32, i32), color: Rgb<u8>) {
        match self {
            Self::Bitmap => draw_bitmap_text(img, text, origin, color, TEXT_SCALE),
            Self::TrueType(font) => {
                let scale = PxScale::from(TEXT_HEIGHT_PX);
                let ascent = font.as_ref().as_scaled(scale).ascent().round() as i32;
                draw_text_mut(img, color, origin.0, origin.1 - ascent, scale, font.as_ref(), text);
            }
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum FontError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("not a TrueType or OpenType font")]
    Invalid,
}

/// Line segment `thickness` pixels wide.
///
/// Extra passes are offset across the major axis. Endpoints may lie outside
/// the frame; only visible pixels are written.
pub fn draw_line(
    img: &mut RgbImage,
    p0: Point2<i32>,
    p1: Point2<i32>,
    color: Rgb<u8>,
    thickness: u32,
) {
    let dx = p1.x as i64 - p0.x as i64;
    let dy = p1.y as i64 - p0.y as i64;

    // degenerate projections can land millions of pixels away
    let limit = 64 * (img.width() as i64 + img.height() as i64) + 1024;
    if dx.abs().max(dy.abs()) > limit {
        return;
    }

    let (ox, oy) = if dx.abs() >= dy.abs() {
        (0.0, 1.0)
    } else {
        (1.0, 0.0)
    };
    let passes = thickness.max(1);
    let first = -(((passes - 1) / 2) as f32);
    for k in 0..passes {
        let shift = first + k as f32;
        draw_line_segment_mut(
            img,
            (p0.x as f32 + shift * ox, p0.y as f32 + shift * oy),
            (p1.x as f32 + shift * ox, p1.y as f32 + shift * oy),
            color,
        );
    }
}

/// `font8x8` text with its baseline-left corner at `origin`.
///
/// Characters outside the basic Latin set are skipped but still advance the
/// cursor.
pub fn draw_bitmap_text(
    img: &mut RgbImage,
    text: &str,
    origin: (i32, i32),
    color: Rgb<u8>,
    scale: u32,
) {
    let s = scale.max(1) as i32;
    let top = origin.1 - GLYPH_ASCENT * s;
    for (n, c) in text.chars().enumerate() {
        let Some(rows) = BASIC_FONTS.get(c) else {
            continue;
        };
        let left = origin.0 + n as i32 * GLYPH_ADVANCE * s;
        for (r, bits) in rows.iter().enumerate() {
            for b in 0..8 {
                if bits & (1 << b) != 0 {
                    let cell = Rect::at(left + b * s, top + r as i32 * s).of_size(s as u32, s as u32);
                    draw_filled_rect_mut(img, cell, color);
                }
            }
        }
    }
}

/// On-screen readout of the camera position.
pub fn format_camera_position(p: &Vector3<f64>) -> String {
    format!("XYZ: [{:.3} {:.3} {:.3}]", p.x, p.y, p.z)
}

/// Pyramid wireframe from its five projected vertices.
pub fn draw_pyramid(img: &mut RgbImage, pixels: &[Point2<i32>]) {
    if pixels.len() < 5 {
        return;
    }
    for (a, b) in BASE_EDGES {
        draw_line(img, pixels[a], pixels[b], BLUE, LINE_THICKNESS);
    }
    for (a, b) in STRUT_EDGES {
        draw_line(img, pixels[a], pixels[b], GREEN, LINE_THICKNESS);
    }
}

/// Camera position text in the top-left corner.
pub fn draw_camera_position(img: &mut RgbImage, p: &Vector3<f64>, font: &ReadoutFont) {
    font.draw(img, &format_camera_position(p), TEXT_ORIGIN, GREEN);
}
