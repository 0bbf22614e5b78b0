use board_pose_core::GrayImageView;
use image::{GrayImage, RgbImage};

/// Luma conversion of a color frame.
pub fn to_gray(frame: &RgbImage) -> GrayImage {
    image::imageops::grayscale(frame)
}

/// Min-max contrast stretch to `[0, 255]`.
///
/// Constant and already full-range images are returned unchanged.
pub fn normalize_contrast(img: &GrayImage) -> GrayImage {
    let (lo, hi) = img
        .as_raw()
        .iter()
        .fold((u8::MAX, u8::MIN), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    if hi <= lo || (lo == 0 && hi == 255) {
        return img.clone();
    }

    let scale = 255.0 / (hi - lo) as f32;
    let mut out = img.clone();
    for v in out.iter_mut() {
        *v = (((*v - lo) as f32) * scale).round().clamp(0.0, 255.0) as u8;
    }
    out
}

/// Borrow an `image::GrayImage` as the lightweight core view type.
pub fn gray_view(img: &GrayImage) -> GrayImageView<'_> {
    GrayImageView {
        width: img.width() as usize,
        height: img.height() as usize,
        data: img.as_raw(),
    }
}
