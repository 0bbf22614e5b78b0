//! Plain chessboard detector built on top of `board-pose-core`.
//!
//! Pipeline:
//! 1. Optional min-max contrast stretch of the gray frame.
//! 2. ChESS X-corner candidates (`chess-corners`), thresholded relative to
//!    the strongest response or by a fixed absolute value.
//! 3. Base spacing from nearest-neighbour distances and two lattice axes
//!    from neighbour directions.
//! 4. For each candidate, at most one neighbour along each of ±u, ±v;
//!    only mutual edges are kept.
//! 5. Connected components, BFS assignment of integer `(i, j)`.
//! 6. The strongest fully populated `cols x rows` window of a component
//!    (either orientation) becomes the detection.
//! 7. Canonical re-indexing: `i` runs along the `cols` axis toward +x
//!    (+y for a vertical axis) and `(i, j)` keeps the image handedness.
//! 8. Gradient-orthogonality sub-pixel refinement.
//!
//! ```no_run
//! use board_pose_chessboard::{ChessboardDetector, ChessboardParams};
//! use board_pose_core::BoardSpec;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let img = image::open("frame.png")?.to_luma8();
//! let detector = ChessboardDetector::new(&BoardSpec::new(10, 7, 0.025), ChessboardParams::default());
//! let detection = detector.detect(&img)?;
//! println!("{} corners", detection.len());
//! # Ok(())
//! # }
//! ```

mod detector;
mod geom;
mod gridgraph;
mod params;
mod preprocess;
mod refine;

pub use detector::{chess_config, ChessboardDetectError, ChessboardDetection, ChessboardDetector};
pub use gridgraph::{
    assign_grid_coordinates, connected_components, estimate_lattice, GridGraph, LatticeAxes,
    NeighborDirection, NodeNeighbor,
};
pub use params::{
    ChessCornerParams, ChessboardParams, DetectorFlags, GridGraphParams, RefineParams,
};
pub use preprocess::{gray_view, normalize_contrast, to_gray};
pub use refine::{half_window_for_spacing, refine_corner};
