use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};

/// X-junction candidate handed from the corner detector to the grid stage.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Corner {
    /// Sub-pixel location, image coordinates.
    pub position: Point2<f32>,
    /// Diagonal direction of the junction, radians modulo π.
    pub orientation: f32,
    /// Detector response; larger is more corner-like.
    pub strength: f32,
}

impl Corner {
    pub fn new(x: f32, y: f32, strength: f32) -> Self {
        Self {
            position: Point2::new(x, y),
            orientation: 0.0,
            strength,
        }
    }

    #[inline]
    pub fn as_vec2(&self) -> Vector2<f32> {
        self.position.coords
    }
}

/// Lattice index of a detected corner: `i` along the pattern columns,
/// `j` along its rows.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct GridCoords {
    pub i: i32,
    pub j: i32,
}

impl GridCoords {
    pub const fn new(i: i32, j: i32) -> Self {
        Self { i, j }
    }

    /// Neighbouring index after a unit lattice step `(di, dj)`.
    pub const fn offset(self, di: i32, dj: i32) -> Self {
        Self::new(self.i + di, self.j + dj)
    }
}
