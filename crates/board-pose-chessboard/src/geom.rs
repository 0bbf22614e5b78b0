use nalgebra::Vector2;
use std::f32::consts::PI;

/// Angle between an undirected axis `axis_angle` (defined modulo π) and a
/// directed vector angle `vec_angle`. Returns a value in `[0, π/2]`.
pub fn axis_vec_diff(axis_angle: f32, vec_angle: f32) -> f32 {
    let two_pi = 2.0 * PI;

    // Difference in [-π, π).
    let mut diff = (vec_angle - axis_angle).rem_euclid(two_pi);
    if diff >= PI {
        diff -= two_pi;
    }
    let diff_abs = diff.abs();

    diff_abs.min(PI - diff_abs)
}

/// Weighted circular mean of angles with period `2π / k`.
///
/// `k = 2` averages undirected lines, `k = 4` averages an orthogonal pair
/// of lines as a single direction. Returns `None` when the samples cancel.
pub fn multi_angle_mean(samples: impl IntoIterator<Item = (f32, f32)>, k: f32) -> Option<f32> {
    let mut sum = Vector2::<f32>::zeros();
    let mut weight_sum = 0.0f32;

    for (theta, w) in samples {
        if w <= 0.0 {
            continue;
        }
        sum += w * Vector2::new((k * theta).cos(), (k * theta).sin());
        weight_sum += w;
    }

    if weight_sum <= 0.0 {
        return None;
    }
    let mean = sum / weight_sum;
    if mean.norm_squared() < 1e-6 {
        return None;
    }
    Some(mean.y.atan2(mean.x) / k)
}

#[inline]
pub fn angle_to_unit(theta: f32) -> Vector2<f32> {
    Vector2::new(theta.cos(), theta.sin())
}

/// 2D cross product `a.x * b.y - a.y * b.x`.
#[inline]
pub fn cross2(a: &Vector2<f32>, b: &Vector2<f32>) -> f32 {
    a.x * b.y - a.y * b.x
}
