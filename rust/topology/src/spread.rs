// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Predicate-gated region growing over mesh adjacency.
//!
//! A spread starts from a set of seeds and advances one wave at a time.
//! Every unvisited neighbour of the current wave is either admitted into the
//! next wave (if the predicate accepts it from at least one wave member) or
//! recorded in the frontier, where growth stops for good. The resulting
//! `visited` and `frontier` sets depend only on the seeds, the adjacency and
//! the predicate, never on iteration order.

use std::fmt::Debug;
use std::hash::Hash;

use rustc_hash::FxHashSet;

use crate::index::{PointMap, TriMap};
use crate::keys::PositionKey;

/// A graph the spread can walk.
pub trait Adjacency {
    type Element: Copy + Eq + Hash + Ord + Debug;

    /// Whether the element exists in the graph.
    fn contains(&self, element: Self::Element) -> bool;

    /// Appends the neighbours of `element` to `out`.
    fn neighbors(&self, element: Self::Element, out: &mut Vec<Self::Element>);
}

/// Vertex-level adjacency through the point map.
#[derive(Debug, Clone, Copy)]
pub struct VertexAdjacency<'a>(pub &'a PointMap);

impl Adjacency for VertexAdjacency<'_> {
    type Element = PositionKey;

    fn contains(&self, element: PositionKey) -> bool {
        self.0.contains(element)
    }

    fn neighbors(&self, element: PositionKey, out: &mut Vec<PositionKey>) {
        let mut set = FxHashSet::default();
        self.0.extend_neighbors(element, &mut set);
        out.extend(set);
    }
}

/// Triangle-level adjacency through the tri map (edge-sharing triangles).
#[derive(Debug, Clone, Copy)]
pub struct TriangleAdjacency<'a>(pub &'a TriMap);

impl Adjacency for TriangleAdjacency<'_> {
    type Element = u32;

    fn contains(&self, element: u32) -> bool {
        self.0.contains(element)
    }

    fn neighbors(&self, element: u32, out: &mut Vec<u32>) {
        out.extend_from_slice(self.0.neighbors(element));
    }
}

/// Outcome of [`spread_from_seeds`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spread<E: Eq + Hash> {
    /// Seeds plus every element reached through admitted neighbours.
    pub visited: FxHashSet<E>,
    /// Neighbours the predicate rejected. Disjoint from `visited`.
    pub frontier: FxHashSet<E>,
    /// Seeds that were not part of the graph.
    pub skipped: Vec<E>,
}

impl<E: Eq + Hash> Default for Spread<E> {
    fn default() -> Self {
        Self {
            visited: FxHashSet::default(),
            frontier: FxHashSet::default(),
            skipped: Vec::new(),
        }
    }
}

impl<E: Eq + Hash> Spread<E> {
    /// Returns `true` if nothing was visited.
    pub fn is_empty(&self) -> bool {
        self.visited.is_empty()
    }
}

/// Grows a region from `seeds`.
///
/// `admit(current, neighbour)` decides whether growth may continue from a
/// wave member into an unvisited neighbour. Seeds the graph does not know
/// are skipped with a warning and listed in [`Spread::skipped`].
pub fn spread_from_seeds<G, I, F>(graph: &G, seeds: I, mut admit: F) -> Spread<G::Element>
where
    G: Adjacency,
    I: IntoIterator<Item = G::Element>,
    F: FnMut(G::Element, G::Element) -> bool,
{
    let mut result = Spread::default();

    let mut wave: Vec<G::Element> = Vec::new();
    let mut in_wave = FxHashSet::default();
    for seed in seeds {
        if !graph.contains(seed) {
            tracing::warn!(?seed, "spread seed has no topology entry, skipping");
            result.skipped.push(seed);
            continue;
        }
        if in_wave.insert(seed) {
            wave.push(seed);
        }
    }

    let mut rounds = 0usize;
    let mut scratch = Vec::new();
    while !wave.is_empty() {
        rounds += 1;
        // sorted so the predicate sees a stable call order
        wave.sort_unstable();
        result.visited.extend(wave.iter().copied());

        let mut next = FxHashSet::default();
        let mut rejected = FxHashSet::default();
        for &current in &wave {
            scratch.clear();
            graph.neighbors(current, &mut scratch);
            scratch.sort_unstable();
            for &neighbor in &scratch {
                if result.visited.contains(&neighbor)
                    || result.frontier.contains(&neighbor)
                    || next.contains(&neighbor)
                {
                    continue;
                }
                if admit(current, neighbor) {
                    rejected.remove(&neighbor);
                    next.insert(neighbor);
                } else {
                    rejected.insert(neighbor);
                }
            }
        }

        result.frontier.extend(rejected);
        wave = next.into_iter().collect();
    }

    tracing::debug!(
        rounds,
        visited = result.visited.len(),
        frontier = result.frontier.len(),
        skipped = result.skipped.len(),
        "spread finished"
    );
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::EdgeMap;
    use crate::mesh::Mesh;

    fn grid_key(x: f32, y: f32) -> PositionKey {
        PositionKey::new(x, y, 0.0)
    }

    #[test]
    fn admit_all_reaches_every_icosahedron_vertex() {
        let mesh = Mesh::icosahedron(1.0);
        let points = PointMap::build(&mesh).unwrap();
        let seed = mesh.position_key(0);

        let spread = spread_from_seeds(&VertexAdjacency(&points), [seed], |_, _| true);
        assert_eq!(spread.visited.len(), 12);
        assert!(spread.frontier.is_empty());
        assert!(spread.skipped.is_empty());
    }

    #[test]
    fn frontier_stops_at_predicate_line() {
        let mesh = Mesh::grid(4, 1.0);
        let points = PointMap::build(&mesh).unwrap();
        let spread = spread_from_seeds(&VertexAdjacency(&points), [grid_key(0.0, 0.0)], |_, n| {
            n.coords()[0] < 3.0
        });

        let expected: FxHashSet<_> = (0..5).map(|y| grid_key(3.0, y as f32)).collect();
        assert_eq!(spread.frontier, expected);
        assert_eq!(spread.visited.len(), 15);
        assert!(spread.visited.iter().all(|k| k.coords()[0] < 3.0));
    }

    #[test]
    fn visited_and_frontier_are_disjoint() {
        let mesh = Mesh::height_field(6, 1.0, |x, y| (x - y) * 0.1);
        let points = PointMap::build(&mesh).unwrap();
        let seeds = [mesh.position_key(0), mesh.position_key(20)];
        let spread = spread_from_seeds(&VertexAdjacency(&points), seeds, |c, n| {
            (c.coords()[0] + n.coords()[1]) as u32 % 3 != 0
        });

        assert!(spread.visited.is_disjoint(&spread.frontier));
        for seed in seeds {
            assert!(spread.visited.contains(&seed));
        }
    }

    #[test]
    fn predicate_sees_any_admitting_wave_member() {
        // Seeds at both ends of a row; only the left seed admits the middle.
        let mesh = Mesh::grid(2, 1.0);
        let points = PointMap::build(&mesh).unwrap();
        let left = grid_key(0.0, 0.0);
        let right = grid_key(2.0, 0.0);
        let middle = grid_key(1.0, 0.0);

        let spread = spread_from_seeds(&VertexAdjacency(&points), [right, left], |c, n| {
            n == middle && c == left
        });
        assert!(spread.visited.contains(&middle));
        assert!(!spread.frontier.contains(&middle));
    }

    #[test]
    fn empty_seeds_yield_empty_spread() {
        let mesh = Mesh::grid(2, 1.0);
        let points = PointMap::build(&mesh).unwrap();
        let spread = spread_from_seeds(&VertexAdjacency(&points), [], |_, _| true);
        assert!(spread.is_empty());
        assert!(spread.frontier.is_empty());
    }

    #[test]
    fn unknown_seed_is_skipped() {
        let mesh = Mesh::grid(2, 1.0);
        let points = PointMap::build(&mesh).unwrap();
        let ghost = PositionKey::new(9.0, 9.0, 9.0);

        let spread = spread_from_seeds(&VertexAdjacency(&points), [ghost, grid_key(0.0, 0.0)], |_, _| {
            true
        });
        assert_eq!(spread.skipped, vec![ghost]);
        assert_eq!(spread.visited.len(), 9);
    }

    #[test]
    fn admit_all_stays_in_component() {
        // Two disjoint triangles.
        let mesh = Mesh::new(
            vec![
                0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, //
                5.0, 0.0, 0.0, 6.0, 0.0, 0.0, 5.0, 1.0, 0.0,
            ],
            vec![0, 1, 2, 3, 4, 5],
        );
        let points = PointMap::build(&mesh).unwrap();
        let spread = spread_from_seeds(&VertexAdjacency(&points), [mesh.position_key(0)], |_, _| true);
        let expected: FxHashSet<_> = (0..3).map(|v| mesh.position_key(v)).collect();
        assert_eq!(spread.visited, expected);
    }

    #[test]
    fn triangle_spread_covers_grid() {
        let mesh = Mesh::grid(3, 1.0);
        let points = PointMap::build(&mesh).unwrap();
        let edges = EdgeMap::from_point_map(&points);
        let tris = TriMap::from_maps(&points, &edges);

        let all = spread_from_seeds(&TriangleAdjacency(&tris), [0u32], |_, _| true);
        assert_eq!(all.visited.len(), 18);

        let blocked = spread_from_seeds(&TriangleAdjacency(&tris), [0u32], |_, n| n < 6);
        assert!(blocked.visited.iter().all(|&t| t < 6));
        assert!(blocked.frontier.iter().all(|&t| t >= 6));
    }
}
