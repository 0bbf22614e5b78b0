use nalgebra::Point3;

/// Closed square base of the pyramid.
pub const BASE_EDGES: [(usize, usize); 4] = [(0, 1), (1, 2), (2, 3), (3, 0)];
/// Struts from each base corner to the apex.
pub const STRUT_EDGES: [(usize, usize); 4] = [(0, 4), (1, 4), (2, 4), (3, 4)];

/// Square pyramid standing on the pattern, three cells wide.
///
/// The apex lies at negative `z`, which is the side of the board facing
/// the camera.
#[derive(Clone, Debug, PartialEq)]
pub struct OverlayModel {
    points: [Point3<f64>; 5],
}

impl OverlayModel {
    pub fn new(cell_size: f64) -> Self {
        let l = 3.0 * cell_size;
        Self {
            points: [
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(l, 0.0, 0.0),
                Point3::new(l, l, 0.0),
                Point3::new(0.0, l, 0.0),
                Point3::new(l / 2.0, l / 2.0, -l),
            ],
        }
    }

    pub fn points(&self) -> &[Point3<f64>] {
        &self.points
    }

    /// Base edges first, then struts.
    pub fn edges(&self) -> impl Iterator<Item = (usize, usize)> {
        BASE_EDGES.into_iter().chain(STRUT_EDGES)
    }
}
