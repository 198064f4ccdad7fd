// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Ordering of unordered boundary points into a closed tour.
//!
//! A minimum spanning tree walked depth-first gives an initial order; a
//! cyclic 2-opt pass then removes the jumps the walk leaves at branch
//! points. All distances are Euclidean in embedding space.

use nalgebra::Point3;

/// Moves must shorten the tour by more than this to be applied.
const IMPROVEMENT_EPSILON: f64 = 1e-12;

/// Full pairwise distance matrix, row-major.
struct DistanceMatrix {
    n: usize,
    data: Vec<f64>,
}

impl DistanceMatrix {
    fn new(points: &[Point3<f64>]) -> Self {
        let n = points.len();
        let mut data = vec![0.0; n * n];
        for i in 0..n {
            for j in (i + 1)..n {
                let d = nalgebra::distance(&points[i], &points[j]);
                data[i * n + j] = d;
                data[j * n + i] = d;
            }
        }
        Self { n, data }
    }

    #[inline]
    fn get(&self, i: usize, j: usize) -> f64 {
        self.data[i * self.n + j]
    }
}

/// Visiting order of a depth-first walk over the minimum spanning tree of
/// `points`, starting at the first leaf.
///
/// The result is a permutation of `0..points.len()`. Inputs with at most two
/// points come back in their original order.
pub fn minimum_spanning_order(points: &[Point3<f64>]) -> Vec<usize> {
    let n = points.len();
    if n <= 2 {
        return (0..n).collect();
    }

    let dist = DistanceMatrix::new(points);

    // Prim, O(n^2): best[j] is the cheapest link from the tree to j.
    let mut in_tree = vec![false; n];
    let mut best = vec![f64::INFINITY; n];
    let mut parent = vec![usize::MAX; n];
    let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); n];

    best[0] = 0.0;
    for _ in 0..n {
        let mut next = usize::MAX;
        let mut next_cost = f64::INFINITY;
        for j in 0..n {
            if !in_tree[j] && (next == usize::MAX || best[j] < next_cost) {
                next = j;
                next_cost = best[j];
            }
        }

        in_tree[next] = true;
        if parent[next] != usize::MAX {
            adjacency[parent[next]].push(next);
            adjacency[next].push(parent[next]);
        }

        for j in 0..n {
            if !in_tree[j] && dist.get(next, j) < best[j] {
                best[j] = dist.get(next, j);
                parent[j] = next;
            }
        }
    }

    let start = adjacency.iter().position(|a| a.len() == 1).unwrap_or(0);

    let mut order = Vec::with_capacity(n);
    let mut visited = vec![false; n];
    let mut stack = vec![start];
    while let Some(v) = stack.pop() {
        if visited[v] {
            continue;
        }
        visited[v] = true;
        order.push(v);
        for &u in adjacency[v].iter().rev() {
            if !visited[u] {
                stack.push(u);
            }
        }
    }
    order
}

/// [`minimum_spanning_order`] applied to the points themselves.
pub fn order_points(points: &[Point3<f64>]) -> Vec<Point3<f64>> {
    minimum_spanning_order(points)
        .into_iter()
        .map(|i| points[i])
        .collect()
}

/// Cyclic 2-opt over `order` (indices into `points`).
///
/// A move reverses tour positions `i..=j`, replacing the edges entering and
/// leaving that segment; its gain is computed from those four edges only.
/// Every pair of non-touching tour edges is a candidate. The first move
/// that shortens the tour is applied and the scan restarts. Stops after a pass without improvement or after
/// `max_iterations` passes. Tours of three points or fewer are returned
/// unchanged.
pub fn refine_order(points: &[Point3<f64>], order: &[usize], max_iterations: usize) -> Vec<usize> {
    let mut tour = order.to_vec();
    let n = tour.len();
    if n <= 3 {
        return tour;
    }

    let d = |a: usize, b: usize| nalgebra::distance(&points[a], &points[b]);

    let mut passes = 0;
    let mut moves = 0;
    let mut improved = true;
    while improved && passes < max_iterations {
        improved = false;
        passes += 1;

        'scan: for i in 0..n - 1 {
            for j in (i + 1)..n {
                // the two removed edges would touch: same cycle
                if j - i >= n - 2 {
                    continue;
                }
                let prev = tour[(i + n - 1) % n];
                let next = tour[(j + 1) % n];
                let (a, b) = (tour[i], tour[j]);
                let delta = d(prev, b) + d(a, next) - d(prev, a) - d(b, next);
                if delta < -IMPROVEMENT_EPSILON {
                    tour[i..=j].reverse();
                    moves += 1;
                    improved = true;
                    break 'scan;
                }
            }
        }
    }

    tracing::debug!(points = n, passes, moves, "2-opt refinement finished");
    tour
}

/// Length of the closed polyline through `points` in order.
pub fn total_length(points: &[Point3<f64>]) -> f64 {
    let n = points.len();
    if n < 2 {
        return 0.0;
    }
    (0..n)
        .map(|i| nalgebra::distance(&points[i], &points[(i + 1) % n]))
        .sum()
}

/// Length of the closed tour visiting `points` in `order`.
pub fn tour_length(points: &[Point3<f64>], order: &[usize]) -> f64 {
    let n = order.len();
    if n < 2 {
        return 0.0;
    }
    (0..n)
        .map(|i| nalgebra::distance(&points[order[i]], &points[order[(i + 1) % n]]))
        .sum()
}

/// Keeps `target` points taken at a uniform index stride.
pub fn decimate_uniform(points: &[Point3<f64>], target: usize) -> Vec<Point3<f64>> {
    if points.len() <= target {
        return points.to_vec();
    }
    let step = points.len() as f64 / target as f64;
    (0..target)
        .map(|i| points[(i as f64 * step).floor() as usize])
        .collect()
}

/// MST order followed by 2-opt, returning the points in tour order.
pub fn sequence_closed(points: &[Point3<f64>], max_iterations: usize) -> Vec<Point3<f64>> {
    let initial = minimum_spanning_order(points);
    refine_order(points, &initial, max_iterations)
        .into_iter()
        .map(|i| points[i])
        .collect()
}
