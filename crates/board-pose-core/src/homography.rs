use nalgebra::{DMatrix, Matrix3, Point2, Vector2};
use serde::{Deserialize, Serialize};

/// Plane-to-plane projective map, `dst ~ H * src`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Homography {
    pub h: Matrix3<f64>,
}

impl Homography {
    pub fn new(h: Matrix3<f64>) -> Self {
        Self { h }
    }

    #[inline]
    pub fn apply(&self, p: Point2<f64>) -> Point2<f64> {
        let v = self.h * p.to_homogeneous();
        Point2::new(v.x / v.z, v.y / v.z)
    }

    pub fn inverse(&self) -> Option<Self> {
        self.h.try_inverse().map(Self::new)
    }
}

/// Similarity moving a point set to zero mean and mean radius `sqrt(2)`.
struct Conditioning {
    t: Matrix3<f64>,
}

impl Conditioning {
    fn fit(pts: &[Point2<f64>]) -> Self {
        let n = pts.len() as f64;
        let centroid = pts.iter().map(|p| p.coords).sum::<Vector2<f64>>() / n;
        let radius = pts.iter().map(|p| (p.coords - centroid).norm()).sum::<f64>() / n;
        let s = if radius > 1e-12 {
            std::f64::consts::SQRT_2 / radius
        } else {
            1.0
        };
        #[rustfmt::skip]
        let t = Matrix3::new(
            s, 0.0, -s * centroid.x,
            0.0, s, -s * centroid.y,
            0.0, 0.0, 1.0,
        );
        Self { t }
    }

    fn apply(&self, p: &Point2<f64>) -> Point2<f64> {
        let v = self.t * p.to_homogeneous();
        Point2::new(v.x, v.y)
    }
}

/// Estimate `H` such that `dst ~ H * src` from `N >= 4` correspondences.
///
/// Both point sets are conditioned, the stacked `2N x 9` DLT system is
/// solved by SVD and the result is mapped back and scaled to `h33 = 1`.
/// Returns `None` for mismatched lengths, fewer than four points, or a
/// configuration that does not pin down `H` (e.g. collinear points).
pub fn estimate_homography(src: &[Point2<f64>], dst: &[Point2<f64>]) -> Option<Homography> {
    let n = src.len();
    if n != dst.len() || n < 4 {
        return None;
    }

    let cs = Conditioning::fit(src);
    let cd = Conditioning::fit(dst);

    // four points give eight equations; a zero row keeps the null vector
    // among the nine right singular vectors
    let rows = (2 * n).max(9);
    let mut a = DMatrix::<f64>::zeros(rows, 9);
    for (k, (s, d)) in src.iter().zip(dst).enumerate() {
        let p = cs.apply(s);
        let q = cd.apply(d);
        let ph = [p.x, p.y, 1.0];
        for c in 0..3 {
            a[(2 * k, c)] = ph[c];
            a[(2 * k, 6 + c)] = -q.x * ph[c];
            a[(2 * k + 1, 3 + c)] = ph[c];
            a[(2 * k + 1, 6 + c)] = -q.y * ph[c];
        }
    }

    let svd = a.svd(false, true);
    let v_t = svd.v_t?;
    let mut order: Vec<usize> = (0..svd.singular_values.len()).collect();
    order.sort_by(|&i, &j| svd.singular_values[i].total_cmp(&svd.singular_values[j]));

    let sv = |k: usize| svd.singular_values[order[k]];
    let largest = sv(order.len() - 1).max(f64::MIN_POSITIVE);
    if sv(1) <= 1e-9 * largest {
        return None;
    }

    let null = v_t.row(order[0]);
    let hn = Matrix3::from_fn(|r, c| null[3 * r + c]);
    let h = cd.t.try_inverse()? * hn * cs.t;

    let scale = h[(2, 2)];
    if !scale.is_finite() || scale.abs() < 1e-12 {
        return None;
    }
    let h = h / scale;
    h.iter().all(|v| v.is_finite()).then(|| Homography::new(h))
}
