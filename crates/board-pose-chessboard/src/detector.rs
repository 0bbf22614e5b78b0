use crate::geom::cross2;
use crate::gridgraph::{assign_grid_coordinates, connected_components, estimate_lattice, GridGraph};
use crate::params::{ChessCornerParams, ChessboardParams};
use crate::preprocess::{gray_view, normalize_contrast};
use crate::refine::{half_window_for_spacing, refine_corner};
use board_pose_core::{BoardSpec, Corner, GridCoords};
use chess_corners::{find_chess_corners_image, ChessConfig, CornerDescriptor};
use log::debug;
use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::HashMap;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Reasons a frame yields no chessboard.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ChessboardDetectError {
    #[error("image is empty")]
    EmptyImage,
    #[error("found {found} corner candidates, need at least {needed}")]
    TooFewCandidates { found: usize, needed: usize },
    #[error("could not estimate lattice axes from corner candidates")]
    NoLatticeAxes,
    #[error("grid graph assigns conflicting coordinates")]
    InconsistentGrid,
    #[error("no complete {cols}x{rows} grid (largest component has {largest} corners)")]
    IncompleteGrid { cols: u32, rows: u32, largest: usize },
}

/// A fully detected board.
///
/// `points[k]` is the intersection at `grid[k]`, in row-major order
/// (`k = j * cols + i`), so it pairs with `BoardSpec::object_points()[k]`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChessboardDetection {
    pub cols: u32,
    pub rows: u32,
    pub points: Vec<Point2<f32>>,
    pub grid: Vec<GridCoords>,
    /// Number of points moved by sub-pixel refinement.
    pub refined: usize,
}

impl ChessboardDetection {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Image points in double precision for the pose solver.
    pub fn image_points(&self) -> Vec<Point2<f64>> {
        self.points
            .iter()
            .map(|p| Point2::new(p.x as f64, p.y as f64))
            .collect()
    }
}

pub fn chess_config(params: &ChessCornerParams, adaptive: bool) -> ChessConfig {
    let mut cfg = ChessConfig::single_scale();
    cfg.params.threshold_rel = if adaptive { params.threshold_rel } else { 0.0 };
    cfg.params.nms_radius = params.nms_radius as _;
    cfg
}

fn adapt_chess_corner(c: &CornerDescriptor) -> Corner {
    Corner {
        position: Point2::new(c.x, c.y),
        orientation: c.orientation,
        strength: c.response,
    }
}

/// Chessboard detector: ChESS candidates, lattice graph, canonical
/// ordering and sub-pixel refinement.
#[derive(Clone, Debug)]
pub struct ChessboardDetector {
    cols: u32,
    rows: u32,
    pub params: ChessboardParams,
}

impl ChessboardDetector {
    pub fn new(board: &BoardSpec, params: ChessboardParams) -> Self {
        Self {
            cols: board.cols,
            rows: board.rows,
            params,
        }
    }

    pub fn pattern_size(&self) -> (u32, u32) {
        (self.cols, self.rows)
    }

    fn expected(&self) -> usize {
        self.cols as usize * self.rows as usize
    }

    /// Detect the board in a grayscale frame.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, img), fields(width = img.width(), height = img.height()))
    )]
    pub fn detect(
        &self,
        img: &image::GrayImage,
    ) -> Result<ChessboardDetection, ChessboardDetectError> {
        if img.width() == 0 || img.height() == 0 {
            return Err(ChessboardDetectError::EmptyImage);
        }

        let prepared = if self.params.flags.normalize_image {
            Cow::Owned(normalize_contrast(img))
        } else {
            Cow::Borrowed(img)
        };

        let candidates = self.find_candidates(&prepared);
        let mut detection = self.detect_from_corners(&candidates)?;
        if self.params.refine.enabled {
            self.refine(&prepared, &mut detection);
        }
        Ok(detection)
    }

    /// Raw ChESS candidates after the threshold policy and strength filter.
    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip_all))]
    pub fn find_candidates(&self, img: &image::GrayImage) -> Vec<Corner> {
        let adaptive = self.params.flags.adaptive_threshold;
        let cfg = chess_config(&self.params.chess, adaptive);
        let raw = find_chess_corners_image(img, &cfg);
        let total = raw.len();

        let abs = if adaptive {
            f32::NEG_INFINITY
        } else {
            self.params.chess.threshold_abs
        };
        let corners: Vec<Corner> = raw
            .iter()
            .filter(|c| c.response >= abs)
            .map(adapt_chess_corner)
            .collect();

        debug!(
            "{} ChESS corners, {} kept (adaptive threshold: {})",
            total,
            corners.len(),
            adaptive
        );
        corners
    }

    /// Find the board among precomputed corner candidates.
    ///
    /// Returned points are unrefined candidate positions.
    pub fn detect_from_corners(
        &self,
        corners: &[Corner],
    ) -> Result<ChessboardDetection, ChessboardDetectError> {
        let strong: Vec<Corner> = corners
            .iter()
            .filter(|c| c.strength >= self.params.min_strength)
            .cloned()
            .collect();

        let needed = self.expected();
        if strong.len() < needed && (self.params.flags.fast_check || strong.len() < 4) {
            return Err(ChessboardDetectError::TooFewCandidates {
                found: strong.len(),
                needed,
            });
        }

        let axes = estimate_lattice(&strong, &self.params.graph)
            .ok_or(ChessboardDetectError::NoLatticeAxes)?;
        debug!(
            "lattice axes u={:.1}deg v={:.1}deg spacing={:.1}px",
            axes.u_angle.to_degrees(),
            axes.v_angle.to_degrees(),
            axes.spacing
        );

        let graph = GridGraph::new(&strong, &axes, &self.params.graph);
        let mut components = connected_components(&graph);
        components.sort_by_key(|c| std::cmp::Reverse(c.len()));
        let largest = components.first().map_or(0, Vec::len);

        let mut inconsistent = false;
        for component in components.iter().take_while(|c| c.len() >= needed) {
            let Some(coords) = assign_grid_coordinates(&graph, component) else {
                inconsistent = true;
                continue;
            };
            if let Some(window) = self.best_window(&coords, &strong) {
                return Ok(self.canonicalize(&window, &strong));
            }
        }

        if inconsistent {
            return Err(ChessboardDetectError::InconsistentGrid);
        }
        Err(ChessboardDetectError::IncompleteGrid {
            cols: self.cols,
            rows: self.rows,
            largest,
        })
    }

    /// Strongest fully occupied `cols x rows` (or transposed) window of a
    /// labeled component.
    fn best_window(&self, coords: &[(usize, GridCoords)], corners: &[Corner]) -> Option<Window> {
        let occupancy: HashMap<GridCoords, usize> = coords.iter().map(|&(i, g)| (g, i)).collect();
        let width = coords.iter().map(|(_, g)| g.i).max()? + 1;
        let height = coords.iter().map(|(_, g)| g.j).max()? + 1;

        let mut shapes = vec![(self.cols as i32, self.rows as i32, false)];
        if self.cols != self.rows {
            shapes.push((self.rows as i32, self.cols as i32, true));
        }

        let mut best: Option<(f32, Window)> = None;
        for (w, h, transposed) in shapes {
            for oj in 0..=(height - h) {
                for oi in 0..=(width - w) {
                    let mut cells = Vec::with_capacity((w * h) as usize);
                    for jj in 0..h {
                        for ii in 0..w {
                            match occupancy.get(&GridCoords::new(oi + ii, oj + jj)) {
                                Some(&idx) => cells.push(idx),
                                None => break,
                            }
                        }
                    }
                    if cells.len() != (w * h) as usize {
                        continue;
                    }
                    let score: f32 = cells.iter().map(|&k| corners[k].strength).sum();
                    if best.as_ref().is_none_or(|(s, _)| score > *s) {
                        best = Some((
                            score,
                            Window {
                                cells,
                                width: w as usize,
                                transposed,
                            },
                        ));
                    }
                }
            }
        }
        best.map(|(_, w)| w)
    }

    /// Re-index a window so that `i` runs along the `cols` axis toward +x
    /// (toward +y for a vertical axis) and `(i, j)` has the image's
    /// handedness.
    fn canonicalize(&self, window: &Window, corners: &[Corner]) -> ChessboardDetection {
        let cols = self.cols as usize;
        let rows = self.rows as usize;

        let at = |i: usize, j: usize| -> usize {
            let (ii, jj) = if window.transposed { (j, i) } else { (i, j) };
            window.cells[jj * window.width + ii]
        };
        let pos = |k: usize| corners[k].as_vec2();

        let a: Vector2<f32> = (0..rows).map(|j| pos(at(cols - 1, j)) - pos(at(0, j))).sum();
        let b: Vector2<f32> = (0..cols).map(|i| pos(at(i, rows - 1)) - pos(at(i, 0))).sum();

        let flip_i = if a.x.abs() >= a.y.abs() {
            a.x < 0.0
        } else {
            a.y < 0.0
        };
        let a = if flip_i { -a } else { a };
        let flip_j = cross2(&a, &b) < 0.0;

        let mut points = Vec::with_capacity(cols * rows);
        let mut grid = Vec::with_capacity(cols * rows);
        for j in 0..rows {
            for i in 0..cols {
                let si = if flip_i { cols - 1 - i } else { i };
                let sj = if flip_j { rows - 1 - j } else { j };
                points.push(corners[at(si, sj)].position);
                grid.push(GridCoords::new(i as i32, j as i32));
            }
        }

        debug!(
            "chessboard {}x{} found (transposed: {}, flip_i: {}, flip_j: {})",
            cols, rows, window.transposed, flip_i, flip_j
        );
        ChessboardDetection {
            cols: self.cols,
            rows: self.rows,
            points,
            grid,
            refined: 0,
        }
    }

    /// Sub-pixel refinement with windows sized from the local grid spacing.
    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip_all))]
    pub fn refine(&self, img: &image::GrayImage, detection: &mut ChessboardDetection) {
        let view = gray_view(img);
        let cols = detection.cols as usize;
        let rows = detection.rows as usize;
        let original = detection.points.clone();

        let mut refined = 0;
        for j in 0..rows {
            for i in 0..cols {
                let k = j * cols + i;
                let p = original[k];
                let mut spacing = f32::INFINITY;
                let around = [
                    (i > 0).then(|| k - 1),
                    (i + 1 < cols).then(|| k + 1),
                    (j > 0).then(|| k - cols),
                    (j + 1 < rows).then(|| k + cols),
                ];
                for n in around.into_iter().flatten() {
                    spacing = spacing.min((original[n] - p).norm());
                }
                if !spacing.is_finite() {
                    continue;
                }

                let half = half_window_for_spacing(spacing, &self.params.refine);
                if let Some(q) = refine_corner(&view, p, half, &self.params.refine) {
                    detection.points[k] = q;
                    refined += 1;
                }
            }
        }
        detection.refined = refined;
        debug!("refined {}/{} corners", refined, cols * rows);
    }
}

struct Window {
    /// Candidate indices, row-major in window coordinates.
    cells: Vec<usize>,
    width: usize,
    transposed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::DetectorFlags;
    use nalgebra::Rotation2;

    fn board(cols: u32, rows: u32) -> BoardSpec {
        BoardSpec::new(cols, rows, 0.025)
    }

    /// Candidates of a `cols x rows` lattice mapped through `f`, shuffled.
    fn lattice(cols: u32, rows: u32, f: impl Fn(f32, f32) -> (f32, f32)) -> Vec<Corner> {
        let mut out = Vec::new();
        for j in 0..rows {
            for i in 0..cols {
                let (x, y) = f(i as f32, j as f32);
                out.push(Corner::new(x, y, 1.0 + 0.01 * (i + j) as f32));
            }
        }
        // deterministic shuffle
        let n = out.len();
        for k in 0..n {
            out.swap(k, (k * 7 + 3) % n);
        }
        out
    }

    fn assert_canonical(det: &ChessboardDetection, expect: impl Fn(u32, u32) -> (f32, f32)) {
        for j in 0..det.rows {
            for i in 0..det.cols {
                let k = (j * det.cols + i) as usize;
                let (x, y) = expect(i, j);
                let p = det.points[k];
                assert!(
                    (p.x - x).abs() < 1e-3 && (p.y - y).abs() < 1e-3,
                    "({i},{j}) -> ({}, {}), expected ({x}, {y})",
                    p.x,
                    p.y
                );
                assert_eq!(det.grid[k], GridCoords::new(i as i32, j as i32));
            }
        }
    }

    #[test]
    fn frontal_board_is_row_major_from_top_left() {
        let det = ChessboardDetector::new(&board(10, 7), ChessboardParams::default());
        let to_img = |i: f32, j: f32| (100.0 + 30.0 * i, 80.0 + 30.0 * j);
        let corners = lattice(10, 7, to_img);

        let res = det.detect_from_corners(&corners).expect("detected");
        assert_eq!(res.len(), 70);
        assert_canonical(&res, |i, j| to_img(i as f32, j as f32));
    }

    #[test]
    fn upside_down_board_keeps_image_order() {
        let det = ChessboardDetector::new(&board(10, 7), ChessboardParams::default());
        // board rotated by 180 degrees: board (0,0) is bottom-right in the image
        let corners = lattice(10, 7, |i, j| (400.0 - 30.0 * i, 300.0 - 30.0 * j));

        let res = det.detect_from_corners(&corners).expect("detected");
        assert_canonical(&res, |i, j| (130.0 + 30.0 * i as f32, 120.0 + 30.0 * j as f32));
    }

    #[test]
    fn vertical_board_puts_cols_axis_downward() {
        let det = ChessboardDetector::new(&board(10, 7), ChessboardParams::default());
        // 10-point axis runs vertically in the image
        let corners = lattice(7, 10, |a, b| (100.0 + 25.0 * a, 50.0 + 25.0 * b));

        let res = det.detect_from_corners(&corners).expect("detected");
        assert_eq!(res.len(), 70);
        // i goes down (+y), so j must go left (-x) to keep the handedness
        assert_canonical(&res, |i, j| (250.0 - 25.0 * j as f32, 50.0 + 25.0 * i as f32));
    }

    #[test]
    fn rotated_board_with_perspective_is_detected() {
        let det = ChessboardDetector::new(&board(10, 7), ChessboardParams::default());
        let rot = Rotation2::new(0.35f32);
        let warp = move |i: f32, j: f32| {
            let s = 1.0 / (1.0 + 0.02 * i);
            let p = rot * nalgebra::Point2::new(28.0 * i * s, 28.0 * j * s);
            (300.0 + p.x, 150.0 + p.y)
        };
        let res = det
            .detect_from_corners(&lattice(10, 7, warp))
            .expect("detected");
        assert_canonical(&res, |i, j| warp(i as f32, j as f32));
    }

    #[test]
    fn extra_ring_of_weak_candidates_is_ignored() {
        let det = ChessboardDetector::new(&board(5, 4), ChessboardParams::default());
        let to_img = |i: f32, j: f32| (100.0 + 20.0 * i, 100.0 + 20.0 * j);
        let mut corners = lattice(5, 4, to_img);
        // weaker L-corners along the outer border, one cell out
        for i in 0..5 {
            let (x, y) = to_img(i as f32, -1.0);
            corners.push(Corner::new(x, y, 0.2));
        }

        let res = det.detect_from_corners(&corners).expect("detected");
        assert_canonical(&res, |i, j| to_img(i as f32, j as f32));
    }

    #[test]
    fn missing_corner_is_reported() {
        let det = ChessboardDetector::new(&board(5, 4), ChessboardParams::default());
        let mut corners = lattice(5, 4, |i, j| (50.0 + 20.0 * i, 50.0 + 20.0 * j));
        corners.pop();
        corners.push(Corner::new(500.0, 500.0, 1.0));

        let err = det.detect_from_corners(&corners).unwrap_err();
        assert!(
            matches!(err, ChessboardDetectError::IncompleteGrid { cols: 5, rows: 4, .. }),
            "{err:?}"
        );
    }

    #[test]
    fn fast_check_rejects_sparse_frames() {
        let det = ChessboardDetector::new(&board(5, 4), ChessboardParams::default());
        let corners = lattice(3, 3, |i, j| (20.0 * i, 20.0 * j));
        assert_eq!(
            det.detect_from_corners(&corners).unwrap_err(),
            ChessboardDetectError::TooFewCandidates {
                found: 9,
                needed: 20
            }
        );

        let params = ChessboardParams {
            flags: DetectorFlags {
                fast_check: false,
                ..DetectorFlags::default()
            },
            ..ChessboardParams::default()
        };
        let det = ChessboardDetector::new(&board(5, 4), params);
        assert!(matches!(
            det.detect_from_corners(&corners).unwrap_err(),
            ChessboardDetectError::IncompleteGrid { largest: 9, .. }
        ));
    }

    #[test]
    fn empty_image_is_an_error() {
        let det = ChessboardDetector::new(&board(5, 4), ChessboardParams::default());
        let img = image::GrayImage::new(0, 0);
        assert_eq!(
            det.detect(&img).unwrap_err(),
            ChessboardDetectError::EmptyImage
        );
    }
}
