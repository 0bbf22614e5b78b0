use nalgebra::Point3;
use serde::{Deserialize, Serialize};

/// Errors for an invalid board description.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum BoardError {
    #[error("board must have at least one inner corner per axis (cols={cols}, rows={rows})")]
    ZeroDimension { cols: u32, rows: u32 },
    #[error("board has {0} inner corners, at least 4 are needed for a pose")]
    TooFewCorners(usize),
    #[error("cell size must be positive and finite, got {0}")]
    InvalidCellSize(f64),
}

/// Planar checkerboard description.
///
/// `cols` and `rows` count *inner* intersections, not squares: a board with
/// 11x8 squares has `cols = 10`, `rows = 7`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoardSpec {
    pub cols: u32,
    pub rows: u32,
    /// Physical side of one square (any length unit; poses inherit it).
    pub cell_size: f64,
}

impl BoardSpec {
    pub fn new(cols: u32, rows: u32, cell_size: f64) -> Self {
        Self {
            cols,
            rows,
            cell_size,
        }
    }

    pub fn validate(&self) -> Result<(), BoardError> {
        if self.cols == 0 || self.rows == 0 {
            return Err(BoardError::ZeroDimension {
                cols: self.cols,
                rows: self.rows,
            });
        }
        if self.point_count() < 4 {
            return Err(BoardError::TooFewCorners(self.point_count()));
        }
        if !(self.cell_size.is_finite() && self.cell_size > 0.0) {
            return Err(BoardError::InvalidCellSize(self.cell_size));
        }
        Ok(())
    }

    #[inline]
    pub fn point_count(&self) -> usize {
        self.cols as usize * self.rows as usize
    }

    /// Object-space intersection points on `z = 0`, row-major:
    /// index `r * cols + c` holds `(c * s, r * s, 0)`.
    pub fn object_points(&self) -> Vec<Point3<f64>> {
        let s = self.cell_size;
        (0..self.rows)
            .flat_map(|r| (0..self.cols).map(move |c| Point3::new(c as f64 * s, r as f64 * s, 0.0)))
            .collect()
    }
}
