//! 4-connected lattice graph over corner candidates.
//!
//! Edges are proposed from k-nearest neighbours and accepted when they are
//! not much longer than the local spacing and their direction matches one
//! of the two lattice axes. Each node keeps at most one neighbour per direction
//! and only mutual edges survive, so BFS over the graph yields consistent
//! integer coordinates.

use crate::geom::{angle_to_unit, axis_vec_diff, multi_angle_mean};
use crate::params::GridGraphParams;
use board_pose_core::{Corner, GridCoords};
use kiddo::{KdTree, SquaredEuclidean};
use nalgebra::Vector2;
use std::collections::{HashMap, VecDeque};
use std::f32::consts::FRAC_PI_4;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NeighborDirection {
    PosU,
    NegU,
    PosV,
    NegV,
}

impl NeighborDirection {
    pub fn opposite(self) -> Self {
        match self {
            Self::PosU => Self::NegU,
            Self::NegU => Self::PosU,
            Self::PosV => Self::NegV,
            Self::NegV => Self::PosV,
        }
    }

    /// Grid step `(di, dj)` taken when following an edge in this direction.
    pub fn step(self) -> (i32, i32) {
        match self {
            Self::PosU => (1, 0),
            Self::NegU => (-1, 0),
            Self::PosV => (0, 1),
            Self::NegV => (0, -1),
        }
    }

    fn slot(self) -> usize {
        match self {
            Self::PosU => 0,
            Self::NegU => 1,
            Self::PosV => 2,
            Self::NegV => 3,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NodeNeighbor {
    pub direction: NeighborDirection,
    pub index: usize,
    pub distance: f32,
    pub score: f32,
}

/// Two image-space lattice directions and the base grid spacing.
///
/// Under perspective the axes are not orthogonal; they are estimated
/// independently.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LatticeAxes {
    pub u_angle: f32,
    pub v_angle: f32,
    pub spacing: f32,
}

impl LatticeAxes {
    pub fn u(&self) -> Vector2<f32> {
        angle_to_unit(self.u_angle)
    }

    pub fn v(&self) -> Vector2<f32> {
        angle_to_unit(self.v_angle)
    }
}

fn build_tree(corners: &[Corner]) -> KdTree<f32, 2> {
    let coords = corners
        .iter()
        .map(|c| [c.position.x, c.position.y])
        .collect::<Vec<_>>();
    (&coords).into()
}

/// Distance from each corner to its nearest other corner.
fn nearest_distances(corners: &[Corner], tree: &KdTree<f32, 2>) -> Vec<f32> {
    corners
        .iter()
        .enumerate()
        .map(|(i, c)| {
            tree.nearest_n::<SquaredEuclidean>(&[c.position.x, c.position.y], 2)
                .into_iter()
                .filter(|nn| nn.item as usize != i)
                .map(|nn| nn.distance.sqrt())
                .next()
                .unwrap_or(f32::INFINITY)
        })
        .collect()
}

fn median(mut values: Vec<f32>) -> Option<f32> {
    values.retain(|v| v.is_finite());
    if values.is_empty() {
        return None;
    }
    values.sort_by(f32::total_cmp);
    Some(values[values.len() / 2])
}

/// Nearest neighbours per corner used to sample lattice directions.
const AXIS_SAMPLES_PER_CORNER: usize = 4;

/// Estimate the lattice axes from neighbour vectors.
///
/// The base spacing is the median nearest-neighbour distance. Directions
/// to the few nearest neighbours of every corner are averaged with period
/// π/2 to find the orthogonal-pair direction; samples far from that pair
/// (mostly diagonals at the board border) are dropped and the average is
/// repeated. The survivors are split into the two axis groups and each
/// group is averaged in double-angle space on its own.
pub fn estimate_lattice(corners: &[Corner], params: &GridGraphParams) -> Option<LatticeAxes> {
    if corners.len() < 3 {
        return None;
    }
    let tree = build_tree(corners);
    let local = nearest_distances(corners, &tree);
    let spacing = median(local.clone())?;
    if spacing < params.min_spacing_pix || spacing > params.max_spacing_pix {
        return None;
    }

    let mut angles = Vec::new();
    for (i, c) in corners.iter().enumerate() {
        let q = [c.position.x, c.position.y];
        let reach = 2.0 * local[i];
        for nn in tree.nearest_n::<SquaredEuclidean>(&q, AXIS_SAMPLES_PER_CORNER + 1) {
            let j = nn.item as usize;
            if j == i {
                continue;
            }
            let d = corners[j].position - c.position;
            if d.norm() <= reach {
                angles.push(d.y.atan2(d.x));
            }
        }
    }

    let tol = params.axis_tolerance_deg.to_radians();
    let mut pair = multi_angle_mean(angles.iter().map(|&a| (a, 1.0)), 4.0)?;
    for _ in 0..3 {
        let near_pair = |a: f32| {
            let d = axis_vec_diff(pair, a);
            d.min(std::f32::consts::FRAC_PI_2 - d) <= tol
        };
        pair = multi_angle_mean(
            angles.iter().filter(|&&a| near_pair(a)).map(|&a| (a, 1.0)),
            4.0,
        )?;
    }

    let (group_u, group_v): (Vec<f32>, Vec<f32>) = angles
        .iter()
        .filter(|&&a| {
            let d = axis_vec_diff(pair, a);
            d.min(std::f32::consts::FRAC_PI_2 - d) <= tol
        })
        .partition(|&&a| axis_vec_diff(pair, a) < FRAC_PI_4);
    if group_u.is_empty() || group_v.is_empty() {
        return None;
    }

    let u_angle = multi_angle_mean(group_u.iter().map(|&a| (a, 1.0)), 2.0)?;
    let v_angle = multi_angle_mean(group_v.iter().map(|&a| (a, 1.0)), 2.0)?;

    Some(LatticeAxes {
        u_angle,
        v_angle,
        spacing,
    })
}

fn classify_edge(
    vec_to_neighbor: &Vector2<f32>,
    distance: f32,
    reference_spacing: f32,
    axes: &LatticeAxes,
    params: &GridGraphParams,
) -> Option<(NeighborDirection, f32)> {
    if distance < params.min_spacing_pix || distance > params.max_spacing_pix {
        return None;
    }
    let ratio = distance / reference_spacing;
    if ratio > 1.0 + params.spacing_tolerance {
        return None;
    }

    let tol = params.axis_tolerance_deg.to_radians();
    let angle = vec_to_neighbor.y.atan2(vec_to_neighbor.x);
    let du = axis_vec_diff(axes.u_angle, angle);
    let dv = axis_vec_diff(axes.v_angle, angle);

    let (direction, diff) = if du <= dv {
        let dir = if vec_to_neighbor.dot(&axes.u()) >= 0.0 {
            NeighborDirection::PosU
        } else {
            NeighborDirection::NegU
        };
        (dir, du)
    } else {
        let dir = if vec_to_neighbor.dot(&axes.v()) >= 0.0 {
            NeighborDirection::PosV
        } else {
            NeighborDirection::NegV
        };
        (dir, dv)
    };

    if diff > tol {
        return None;
    }

    Some((direction, diff / tol.max(1e-6) + ratio))
}

/// Keep at most one neighbor per direction, choosing the lowest-score candidate.
fn select_neighbors(candidates: Vec<NodeNeighbor>) -> Vec<NodeNeighbor> {
    let mut best: [Option<NodeNeighbor>; 4] = [None, None, None, None];

    for candidate in candidates.into_iter() {
        let slot = &mut best[candidate.direction.slot()];

        let replace = match slot {
            None => true,
            Some(current) => {
                candidate.score < current.score
                    || (candidate.score == current.score && candidate.distance < current.distance)
            }
        };

        if replace {
            *slot = Some(candidate);
        }
    }

    best.into_iter().flatten().collect()
}

pub struct GridGraph {
    pub neighbors: Vec<Vec<NodeNeighbor>>, // For each node, list of neighbors
}

impl GridGraph {
    pub fn new(corners: &[Corner], axes: &LatticeAxes, params: &GridGraphParams) -> Self {
        let tree = build_tree(corners);
        let local = nearest_distances(corners, &tree);

        let mut neighbors = Vec::with_capacity(corners.len());
        for (i, corner) in corners.iter().enumerate() {
            // Local spacing follows perspective; clamp it against stray points.
            let reference = local[i].clamp(0.5 * axes.spacing, 1.5 * axes.spacing);

            let query_point = [corner.position.x, corner.position.y];
            let mut node_neighbors = Vec::new();
            for nn in tree.nearest_n::<SquaredEuclidean>(&query_point, params.k_neighbors) {
                let neighbor_index = nn.item as usize;
                if neighbor_index == i {
                    continue;
                }
                let vec_to_neighbor = corners[neighbor_index].position - corner.position;
                let distance = vec_to_neighbor.norm();
                if let Some((direction, score)) =
                    classify_edge(&vec_to_neighbor, distance, reference, axes, params)
                {
                    node_neighbors.push(NodeNeighbor {
                        direction,
                        index: neighbor_index,
                        distance,
                        score,
                    });
                }
            }

            neighbors.push(select_neighbors(node_neighbors));
        }

        // Drop one-sided edges.
        let snapshot: Vec<Vec<(usize, NeighborDirection)>> = neighbors
            .iter()
            .map(|ns| ns.iter().map(|n| (n.index, n.direction)).collect())
            .collect();
        for (i, ns) in neighbors.iter_mut().enumerate() {
            ns.retain(|n| {
                snapshot[n.index]
                    .iter()
                    .any(|&(back, dir)| back == i && dir == n.direction.opposite())
            });
        }

        Self { neighbors }
    }

    pub fn edge_count(&self) -> usize {
        self.neighbors.iter().map(Vec::len).sum::<usize>() / 2
    }
}

pub fn connected_components(graph: &GridGraph) -> Vec<Vec<usize>> {
    let mut visited = vec![false; graph.neighbors.len()];
    let mut components = Vec::new();

    for start in 0..graph.neighbors.len() {
        if visited[start] {
            continue;
        }

        let mut component = Vec::new();
        let mut stack = vec![start];

        while let Some(node) = stack.pop() {
            if visited[node] {
                continue;
            }
            visited[node] = true;
            component.push(node);

            for neighbor in &graph.neighbors[node] {
                if !visited[neighbor.index] {
                    stack.push(neighbor.index);
                }
            }
        }

        components.push(component);
    }

    components
}

/// BFS a component and assign integer coordinates shifted so the minimum
/// `i` and `j` are zero.
///
/// Returns `None` when a node is reached with two different coordinates or
/// two nodes end up on the same coordinate.
pub fn assign_grid_coordinates(
    graph: &GridGraph,
    component: &[usize],
) -> Option<Vec<(usize, GridCoords)>> {
    let start = *component.first()?;
    let mut assigned: HashMap<usize, GridCoords> = HashMap::with_capacity(component.len());
    let mut queue = VecDeque::new();
    queue.push_back((start, GridCoords::new(0, 0)));

    while let Some((node_idx, g)) = queue.pop_front() {
        if let Some(&prev) = assigned.get(&node_idx) {
            if prev != g {
                return None;
            }
            continue;
        }
        assigned.insert(node_idx, g);

        for neighbor in &graph.neighbors[node_idx] {
            let (di, dj) = neighbor.direction.step();
            queue.push_back((neighbor.index, g.offset(di, dj)));
        }
    }

    let min_i = assigned.values().map(|g| g.i).min()?;
    let min_j = assigned.values().map(|g| g.j).min()?;
    let mut coords: Vec<(usize, GridCoords)> = assigned
        .into_iter()
        .map(|(idx, g)| (idx, g.offset(-min_i, -min_j)))
        .collect();
    coords.sort_by_key(|&(idx, g)| (g.j, g.i, idx));

    let unique = coords.windows(2).all(|w| w[0].1 != w[1].1);
    unique.then_some(coords)
}
