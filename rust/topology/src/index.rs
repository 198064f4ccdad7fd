// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Position-keyed adjacency index: point map, edge map and triangle map.
//!
//! These are pure derived views of a [`Mesh`]. They are normally built
//! lazily through a [`MeshContext`](crate::arena::MeshContext), which also
//! takes care of dropping them when the mesh changes.

use nalgebra::Point3;
use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

use crate::error::{Error, Result};
use crate::keys::{EdgeKey, PositionKey};
use crate::mesh::Mesh;

/// Everything known about one distinct vertex position.
#[derive(Debug, Clone, PartialEq)]
pub struct PointEntry {
    /// The coordinates shared by every vertex slot at this position.
    pub coords: [f32; 3],
    /// Triangles using this position, one item per corner occurrence.
    pub triangles: SmallVec<[u32; 8]>,
    /// Raw vertex slots at this position, one item per corner occurrence.
    pub vertices: SmallVec<[u32; 8]>,
}

impl PointEntry {
    /// Coordinates as a double precision point.
    #[inline]
    pub fn point(&self) -> Point3<f64> {
        Point3::new(self.coords[0] as f64, self.coords[1] as f64, self.coords[2] as f64)
    }

    /// Distinct raw vertex slots at this position.
    pub fn unique_vertices(&self) -> SmallVec<[u32; 8]> {
        let mut v = self.vertices.clone();
        v.sort_unstable();
        v.dedup();
        v
    }
}

/// Position key → incident triangles / vertex slots.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointMap {
    entries: FxHashMap<PositionKey, PointEntry>,
    triangle_keys: Vec<[PositionKey; 3]>,
}

impl PointMap {
    /// Builds the point map of a mesh. O(3·|triangles|).
    pub fn build(mesh: &Mesh) -> Result<Self> {
        mesh.validate()?;
        Ok(Self::build_unchecked(mesh))
    }

    pub(crate) fn build_unchecked(mesh: &Mesh) -> Self {
        let mut entries: FxHashMap<PositionKey, PointEntry> = FxHashMap::default();
        let mut triangle_keys = Vec::with_capacity(mesh.triangle_count());

        for (tri, corners) in mesh.triangles().enumerate() {
            let mut keys = [PositionKey::new(0.0, 0.0, 0.0); 3];
            for (slot, &vertex) in corners.iter().enumerate() {
                let coords = mesh.raw_position(vertex);
                let key = PositionKey::from_array(coords);
                let entry = entries.entry(key).or_insert_with(|| PointEntry {
                    coords,
                    triangles: SmallVec::new(),
                    vertices: SmallVec::new(),
                });
                entry.triangles.push(tri as u32);
                entry.vertices.push(vertex);
                keys[slot] = key;
            }
            triangle_keys.push(keys);
        }

        Self {
            entries,
            triangle_keys,
        }
    }

    /// Number of distinct positions.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the map holds no positions.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns `true` if the key is a position of this mesh.
    #[inline]
    pub fn contains(&self, key: PositionKey) -> bool {
        self.entries.contains_key(&key)
    }

    /// Looks up a position, reporting a [`Error::LookupMiss`] when absent.
    pub fn entry(&self, key: PositionKey) -> Result<&PointEntry> {
        self.entries.get(&key).ok_or(Error::LookupMiss(key))
    }

    /// Looks up a position.
    #[inline]
    pub fn get(&self, key: PositionKey) -> Option<&PointEntry> {
        self.entries.get(&key)
    }

    /// Coordinates of a position key.
    pub fn position(&self, key: PositionKey) -> Result<Point3<f64>> {
        self.entry(key).map(PointEntry::point)
    }

    /// Corner keys of a triangle.
    pub fn triangle_keys(&self, tri: usize) -> Result<[PositionKey; 3]> {
        self.triangle_keys
            .get(tri)
            .copied()
            .ok_or(Error::TriangleOutOfRange {
                index: tri,
                count: self.triangle_keys.len(),
            })
    }

    /// Number of triangles indexed by this map.
    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.triangle_keys.len()
    }

    /// Iterate over all positions.
    pub fn iter(&self) -> impl Iterator<Item = (PositionKey, &PointEntry)> {
        self.entries.iter().map(|(k, v)| (*k, v))
    }

    /// Iterate over all position keys.
    pub fn keys(&self) -> impl Iterator<Item = PositionKey> + '_ {
        self.entries.keys().copied()
    }

    /// Positions sharing a triangle with `key`, excluding `key` itself.
    ///
    /// Unknown keys yield an empty set.
    pub fn neighbors_of(&self, key: PositionKey) -> FxHashSet<PositionKey> {
        let mut out = FxHashSet::default();
        self.extend_neighbors(key, &mut out);
        out
    }

    pub(crate) fn extend_neighbors(&self, key: PositionKey, out: &mut FxHashSet<PositionKey>) {
        let Some(entry) = self.entries.get(&key) else {
            return;
        };
        for &tri in &entry.triangles {
            for corner in self.triangle_keys[tri as usize] {
                if corner != key {
                    out.insert(corner);
                }
            }
        }
    }
}

/// Length and incident triangles of one undirected edge.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeEntry {
    /// Euclidean distance between the endpoints.
    pub length: f64,
    /// Triangles using this edge.
    pub triangles: SmallVec<[u32; 2]>,
}

impl EdgeEntry {
    /// Edge used by exactly one triangle.
    #[inline]
    pub fn is_boundary(&self) -> bool {
        self.triangles.len() == 1
    }

    /// Edge used by more than two triangles.
    #[inline]
    pub fn is_non_manifold(&self) -> bool {
        self.triangles.len() > 2
    }
}

/// Canonical edge key → length + incident triangles.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EdgeMap {
    edges: FxHashMap<EdgeKey, EdgeEntry>,
}

impl EdgeMap {
    /// Builds the edge map of a mesh.
    pub fn build(mesh: &Mesh) -> Result<Self> {
        mesh.validate()?;
        Ok(Self::from_point_map(&PointMap::build_unchecked(mesh)))
    }

    /// Builds the edge map from an existing point map.
    pub fn from_point_map(points: &PointMap) -> Self {
        let mut edges: FxHashMap<EdgeKey, EdgeEntry> = FxHashMap::default();

        for (tri, keys) in points.triangle_keys.iter().enumerate() {
            for (a, b) in [(keys[0], keys[1]), (keys[1], keys[2]), (keys[2], keys[0])] {
                let edge = EdgeKey::new(a, b);
                if edge.is_degenerate() {
                    continue;
                }
                let entry = edges.entry(edge).or_insert_with(|| EdgeEntry {
                    length: (a.to_point() - b.to_point()).norm(),
                    triangles: SmallVec::new(),
                });
                // A triangle with two coincident corners would list itself twice
                if !entry.triangles.contains(&(tri as u32)) {
                    entry.triangles.push(tri as u32);
                }
            }
        }

        Self { edges }
    }

    /// Number of distinct edges.
    #[inline]
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    /// Returns `true` if the map holds no edges.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Looks up an edge by its endpoints, in either order.
    pub fn get(&self, a: PositionKey, b: PositionKey) -> Option<&EdgeEntry> {
        self.edges.get(&EdgeKey::new(a, b))
    }

    /// Iterate over all edges.
    pub fn iter(&self) -> impl Iterator<Item = (EdgeKey, &EdgeEntry)> {
        self.edges.iter().map(|(k, v)| (*k, v))
    }

    /// Edges used by exactly one triangle (the open rim of the scan).
    pub fn boundary_edges(&self) -> impl Iterator<Item = EdgeKey> + '_ {
        self.edges
            .iter()
            .filter(|(_, e)| e.is_boundary())
            .map(|(k, _)| *k)
    }

    /// Edges used by more than two triangles.
    pub fn non_manifold_edges(&self) -> impl Iterator<Item = EdgeKey> + '_ {
        self.edges
            .iter()
            .filter(|(_, e)| e.is_non_manifold())
            .map(|(k, _)| *k)
    }

    /// Chains the boundary edges into closed loops of position keys.
    ///
    /// Each loop lists its vertices in walk order without repeating the
    /// first one. Open chains (which only appear at non-manifold boundary
    /// vertices) are returned as they were walked. Loops are sorted by their
    /// smallest key so the output is reproducible.
    pub fn boundary_loops(&self) -> Vec<Vec<PositionKey>> {
        let mut incident: FxHashMap<PositionKey, SmallVec<[EdgeKey; 2]>> = FxHashMap::default();
        let mut boundary: Vec<EdgeKey> = self.boundary_edges().collect();
        boundary.sort_unstable();
        for &edge in &boundary {
            let (a, b) = edge.endpoints();
            incident.entry(a).or_default().push(edge);
            incident.entry(b).or_default().push(edge);
        }

        let mut used: FxHashSet<EdgeKey> = FxHashSet::default();
        let mut loops = Vec::new();

        for &start_edge in &boundary {
            if used.contains(&start_edge) {
                continue;
            }
            used.insert(start_edge);
            let (start, mut current) = start_edge.endpoints();
            let mut walk = vec![start];

            while current != start {
                walk.push(current);
                let next = incident
                    .get(&current)
                    .and_then(|edges| edges.iter().find(|e| !used.contains(*e)).copied());
                let Some(edge) = next else {
                    break;
                };
                used.insert(edge);
                match edge.other(current) {
                    Some(v) => current = v,
                    None => break,
                }
            }

            loops.push(walk);
        }

        loops.sort_by_key(|l| l.iter().min().copied());
        loops
    }
}

/// Triangle → triangles sharing an edge with it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TriMap {
    neighbors: Vec<SmallVec<[u32; 3]>>,
}

impl TriMap {
    /// Builds the triangle adjacency of a mesh.
    pub fn build(mesh: &Mesh) -> Result<Self> {
        mesh.validate()?;
        let points = PointMap::build_unchecked(mesh);
        let edges = EdgeMap::from_point_map(&points);
        Ok(Self::from_maps(&points, &edges))
    }

    /// Builds the triangle adjacency from existing point and edge maps.
    pub fn from_maps(points: &PointMap, edges: &EdgeMap) -> Self {
        let mut neighbors = Vec::with_capacity(points.triangle_count());

        for (tri, keys) in points.triangle_keys.iter().enumerate() {
            let tri = tri as u32;
            let mut adjacent: SmallVec<[u32; 3]> = SmallVec::new();
            for (a, b) in [(keys[0], keys[1]), (keys[1], keys[2]), (keys[2], keys[0])] {
                let Some(edge) = edges.get(a, b) else {
                    continue;
                };
                for &other in &edge.triangles {
                    if other != tri && !adjacent.contains(&other) {
                        adjacent.push(other);
                    }
                }
            }
            adjacent.sort_unstable();
            neighbors.push(adjacent);
        }

        Self { neighbors }
    }

    /// Number of triangles.
    #[inline]
    pub fn len(&self) -> usize {
        self.neighbors.len()
    }

    /// Returns `true` if the map holds no triangles.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.neighbors.is_empty()
    }

    /// Returns `true` if `tri` is a triangle of the mesh.
    #[inline]
    pub fn contains(&self, tri: u32) -> bool {
        (tri as usize) < self.neighbors.len()
    }

    /// Edge-adjacent triangles of `tri`, or an empty slice when out of range.
    pub fn neighbors(&self, tri: u32) -> &[u32] {
        self.neighbors
            .get(tri as usize)
            .map(|n| n.as_slice())
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn icosahedron() -> Mesh {
        Mesh::icosahedron(1.0)
    }

    fn unit_grid(cells: u32) -> Mesh {
        Mesh::grid(cells, 1.0)
    }

    /// Unit quad as two triangles that do not share vertex slots.
    fn split_quad() -> Mesh {
        Mesh::new(
            vec![
                0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, //
                1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0,
            ],
            vec![0, 1, 2, 3, 4, 5],
        )
    }

    #[test]
    fn point_map_merges_duplicated_positions() {
        let mesh = split_quad();
        let map = PointMap::build(&mesh).unwrap();
        // 6 vertex slots, 4 distinct positions
        assert_eq!(mesh.vertex_count(), 6);
        assert_eq!(map.len(), 4);

        let shared = map.get(PositionKey::new(1.0, 0.0, 0.0)).unwrap();
        assert_eq!(shared.triangles.len(), 2);
        assert_eq!(shared.unique_vertices().len(), 2);
    }

    #[test]
    fn every_corner_appears_once() {
        let mesh = icosahedron();
        let map = PointMap::build(&mesh).unwrap();
        let total: usize = map.iter().map(|(_, e)| e.triangles.len()).sum();
        assert_eq!(total, mesh.triangle_count() * 3);
    }

    #[test]
    fn build_requires_index_buffer() {
        let mut mesh = icosahedron();
        mesh.indices.clear();
        assert!(matches!(PointMap::build(&mesh), Err(Error::MalformedMesh(_))));
        assert!(matches!(EdgeMap::build(&mesh), Err(Error::MalformedMesh(_))));
        assert!(matches!(TriMap::build(&mesh), Err(Error::MalformedMesh(_))));
    }

    #[test]
    fn builds_are_idempotent() {
        let mesh = unit_grid(3);
        let a = PointMap::build(&mesh).unwrap();
        let b = PointMap::build(&mesh).unwrap();
        assert_eq!(a.len(), b.len());
        for (key, entry) in a.iter() {
            let other = b.get(key).unwrap();
            assert_eq!(entry.triangles, other.triangles);
            assert_eq!(entry.vertices, other.vertices);
        }

        let ea = EdgeMap::build(&mesh).unwrap();
        let eb = EdgeMap::build(&mesh).unwrap();
        assert_eq!(ea.len(), eb.len());
        for (key, entry) in ea.iter() {
            let (a, b) = key.endpoints();
            let other = eb.get(b, a).unwrap();
            assert_eq!(entry.triangles, other.triangles);
            assert_eq!(entry.length, other.length);
        }

        let ta = TriMap::build(&mesh).unwrap();
        let tb = TriMap::build(&mesh).unwrap();
        for t in 0..ta.len() as u32 {
            assert_eq!(ta.neighbors(t), tb.neighbors(t));
        }
    }

    #[test]
    fn adjacency_is_symmetric() {
        let mesh = icosahedron();
        let map = PointMap::build(&mesh).unwrap();
        for a in map.keys() {
            for b in map.neighbors_of(a) {
                assert!(map.neighbors_of(b).contains(&a));
            }
            assert!(!map.neighbors_of(a).contains(&a));
        }
    }

    #[test]
    fn icosahedron_vertices_have_five_neighbors() {
        let map = PointMap::build(&icosahedron()).unwrap();
        assert_eq!(map.len(), 12);
        for key in map.keys() {
            assert_eq!(map.neighbors_of(key).len(), 5);
        }
    }

    #[test]
    fn unknown_key_is_a_lookup_miss() {
        let map = PointMap::build(&icosahedron()).unwrap();
        let stray = PositionKey::new(42.0, 42.0, 42.0);
        assert!(map.neighbors_of(stray).is_empty());
        assert!(matches!(map.entry(stray), Err(Error::LookupMiss(k)) if k == stray));
    }

    #[test]
    fn closed_mesh_edges_are_interior() {
        let edges = EdgeMap::build(&icosahedron()).unwrap();
        assert_eq!(edges.len(), 30);
        assert_eq!(edges.boundary_edges().count(), 0);
        assert_eq!(edges.non_manifold_edges().count(), 0);
        assert!(edges.boundary_loops().is_empty());
    }

    #[test]
    fn edge_lengths_are_euclidean() {
        let edges = EdgeMap::build(&unit_grid(1)).unwrap();
        let a = PositionKey::new(0.0, 0.0, 0.0);
        let b = PositionKey::new(1.0, 0.0, 0.0);
        let c = PositionKey::new(1.0, 1.0, 0.0);
        approx::assert_relative_eq!(edges.get(a, b).unwrap().length, 1.0);
        approx::assert_relative_eq!(edges.get(c, a).unwrap().length, 2f64.sqrt());
    }

    #[test]
    fn seam_does_not_split_edges() {
        let edges = EdgeMap::build(&split_quad()).unwrap();
        let a = PositionKey::new(1.0, 0.0, 0.0);
        let b = PositionKey::new(0.0, 1.0, 0.0);
        assert_eq!(edges.get(a, b).unwrap().triangles.len(), 2);
        assert_eq!(edges.boundary_edges().count(), 4);
    }

    #[test]
    fn grid_has_one_boundary_loop() {
        let edges = EdgeMap::build(&unit_grid(4)).unwrap();
        let loops = edges.boundary_loops();
        assert_eq!(loops.len(), 1);
        assert_eq!(loops[0].len(), 16);
    }

    #[test]
    fn tri_map_neighbors() {
        let tris = TriMap::build(&icosahedron()).unwrap();
        assert_eq!(tris.len(), 20);
        for t in 0..20u32 {
            let n = tris.neighbors(t);
            assert_eq!(n.len(), 3);
            assert!(!n.contains(&t));
            for &o in n {
                assert!(tris.neighbors(o).contains(&t));
            }
        }
        assert!(tris.neighbors(99).is_empty());
    }
}
