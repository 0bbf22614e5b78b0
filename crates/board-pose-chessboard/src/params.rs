use serde::{Deserialize, Serialize};

/// Detector switches exposed at the application level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct DetectorFlags {
    /// Threshold ChESS responses relative to the strongest response in the
    /// frame instead of using the fixed [`ChessCornerParams::threshold_abs`].
    pub adaptive_threshold: bool,
    /// Stretch the gray levels to the full `[0, 255]` range before detection.
    pub normalize_image: bool,
    /// Give up early when there are fewer candidates than grid points.
    pub fast_check: bool,
}

impl Default for DetectorFlags {
    fn default() -> Self {
        Self {
            adaptive_threshold: true,
            normalize_image: true,
            fast_check: true,
        }
    }
}

/// Settings forwarded to the ChESS corner detector.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ChessCornerParams {
    /// Relative response threshold used in adaptive mode.
    pub threshold_rel: f32,
    /// Absolute response threshold used when adaptive mode is off.
    pub threshold_abs: f32,
    /// Non-maximum suppression radius in pixels.
    pub nms_radius: u32,
}

impl Default for ChessCornerParams {
    fn default() -> Self {
        Self {
            threshold_rel: 0.2,
            threshold_abs: 50.0,
            nms_radius: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct GridGraphParams {
    pub min_spacing_pix: f32,
    pub max_spacing_pix: f32,
    pub k_neighbors: usize,
    /// Maximal angle between an edge and the lattice axis it is assigned to.
    pub axis_tolerance_deg: f32,
    /// Accepted relative excess of an edge length over the node's
    /// nearest-neighbour distance.
    pub spacing_tolerance: f32,
}

impl Default for GridGraphParams {
    fn default() -> Self {
        Self {
            min_spacing_pix: 5.0,
            max_spacing_pix: 300.0,
            k_neighbors: 8,
            axis_tolerance_deg: 25.0,
            spacing_tolerance: 0.6,
        }
    }
}

/// Gradient-based sub-pixel refinement.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RefineParams {
    pub enabled: bool,
    /// Window half-size as a fraction of the local grid spacing.
    pub window_fraction: f32,
    /// Bounds on the window half-size in pixels.
    pub min_half_window: i32,
    pub max_half_window: i32,
    pub max_iters: usize,
    /// Stop when the update is shorter than this (pixels).
    pub epsilon: f32,
}

impl Default for RefineParams {
    fn default() -> Self {
        Self {
            enabled: true,
            window_fraction: 0.3,
            min_half_window: 2,
            max_half_window: 7,
            max_iters: 30,
            epsilon: 1e-3,
        }
    }
}

/// Parameters specific to the chessboard detector.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ChessboardParams {
    pub flags: DetectorFlags,
    pub chess: ChessCornerParams,
    /// Candidates weaker than this are dropped before grid building.
    pub min_strength: f32,
    pub graph: GridGraphParams,
    pub refine: RefineParams,
}
