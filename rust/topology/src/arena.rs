// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Mesh ownership and the lazily built topology cache.
//!
//! A [`MeshContext`] owns one mesh together with its derived structures
//! (point map, edge map, tri map and BVH). The structures are built on first
//! access, or all at once through [`MeshContext::ensure_built`], and are
//! read-only afterwards, so a built context can be shared across threads for
//! concurrent queries. Any change to the vertex positions goes through
//! `&mut self` and drops the cache.
//!
//! A [`MeshArena`] holds several contexts behind generational [`MeshKey`]
//! handles.
//!
//! # Example
//!
//! ```
//! use marginline_topology::{Mesh, MeshArena};
//!
//! let mut arena = MeshArena::new();
//! let key = arena.insert(Mesh::icosahedron(1.0)).unwrap();
//! let ctx = arena.get(key).unwrap();
//! assert_eq!(ctx.point_map().len(), 12);
//! ```

use std::sync::OnceLock;

use nalgebra::{Point3, Vector3};
use rustc_hash::FxHashSet;
use slotmap::SlotMap;

use crate::error::{Error, Result};
use crate::index::{EdgeMap, PointMap, TriMap};
use crate::keys::{MeshKey, PositionKey};
use crate::mesh::Mesh;
use crate::spatial::{ClosestHit, MeshBvh, RayHit, Volume};
use crate::spread::{spread_from_seeds, Spread, TriangleAdjacency, VertexAdjacency};

/// Derived structures of one mesh, each built at most once.
#[derive(Debug, Default)]
struct TopologyCache {
    points: OnceLock<PointMap>,
    edges: OnceLock<EdgeMap>,
    tris: OnceLock<TriMap>,
    bvh: OnceLock<MeshBvh>,
}

/// A mesh plus its cached topology.
#[derive(Debug)]
pub struct MeshContext {
    mesh: Mesh,
    cache: TopologyCache,
}

impl MeshContext {
    /// Takes ownership of a mesh. Fails with [`Error::MalformedMesh`] if the
    /// buffers cannot be indexed.
    pub fn new(mesh: Mesh) -> Result<Self> {
        mesh.validate()?;
        Ok(Self {
            mesh,
            cache: TopologyCache::default(),
        })
    }

    /// The owned mesh.
    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    /// Consumes the context and returns its mesh.
    pub fn into_mesh(self) -> Mesh {
        self.mesh
    }

    /// Position-keyed vertex map, built on first use.
    pub fn point_map(&self) -> &PointMap {
        self.cache
            .points
            .get_or_init(|| PointMap::build_unchecked(&self.mesh))
    }

    /// Position-keyed edge map, built on first use.
    pub fn edge_map(&self) -> &EdgeMap {
        self.cache
            .edges
            .get_or_init(|| EdgeMap::from_point_map(self.point_map()))
    }

    /// Triangle adjacency, built on first use.
    pub fn tri_map(&self) -> &TriMap {
        self.cache
            .tris
            .get_or_init(|| TriMap::from_maps(self.point_map(), self.edge_map()))
    }

    /// Triangle BVH, built on first use.
    pub fn bvh(&self) -> &MeshBvh {
        self.cache
            .bvh
            .get_or_init(|| MeshBvh::build_unchecked(&self.mesh))
    }

    /// Builds every cached structure. Call before handing `&self` to
    /// parallel query code.
    pub fn ensure_built(&self) {
        let _ = self.tri_map();
        let _ = self.bvh();
    }

    /// Returns `true` once every cached structure exists.
    pub fn is_built(&self) -> bool {
        self.cache.points.get().is_some()
            && self.cache.edges.get().is_some()
            && self.cache.tris.get().is_some()
            && self.cache.bvh.get().is_some()
    }

    /// Drops all cached structures.
    pub fn invalidate(&mut self) {
        self.cache = TopologyCache::default();
    }

    /// Replaces the vertex positions. The index buffer is kept, so the new
    /// buffer must still cover every referenced vertex.
    pub fn set_positions(&mut self, positions: Vec<f32>) -> Result<()> {
        let candidate = Mesh::new(positions, std::mem::take(&mut self.mesh.indices));
        if let Err(err) = candidate.validate() {
            self.mesh.indices = candidate.indices;
            return Err(err);
        }
        self.mesh = candidate;
        self.invalidate();
        Ok(())
    }

    /// Edits the positions in place through `f`, then revalidates.
    pub fn update_positions<F>(&mut self, f: F) -> Result<()>
    where
        F: FnOnce(&mut [f32]),
    {
        let mut positions = self.mesh.positions.clone();
        f(&mut positions);
        self.set_positions(positions)
    }

    /// Coordinates of an indexed position.
    pub fn position(&self, key: PositionKey) -> Result<Point3<f64>> {
        self.point_map().position(key)
    }

    /// Position keys sharing a triangle with `key`.
    pub fn neighbors_of(&self, key: PositionKey) -> FxHashSet<PositionKey> {
        self.point_map().neighbors_of(key)
    }

    /// Position keys of the vertices inside `volume`.
    pub fn points_within(&self, volume: &Volume) -> FxHashSet<PositionKey> {
        self.bvh().points_within(volume)
    }

    /// Closest point on the surface to `point`.
    pub fn closest_point(&self, point: &Point3<f64>) -> Option<ClosestHit> {
        self.bvh().closest_point(point)
    }

    /// Nearest triangle hit along the ray, either side.
    pub fn raycast(&self, origin: &Point3<f64>, dir: &Vector3<f64>) -> Option<RayHit> {
        self.bvh().raycast(origin, dir)
    }

    /// Corner keys of a triangle.
    pub fn triangle_keys(&self, tri: usize) -> Result<[PositionKey; 3]> {
        self.point_map().triangle_keys(tri)
    }

    /// Vertex-level region growing, see [`spread_from_seeds`].
    pub fn spread_vertices<I, F>(&self, seeds: I, admit: F) -> Spread<PositionKey>
    where
        I: IntoIterator<Item = PositionKey>,
        F: FnMut(PositionKey, PositionKey) -> bool,
    {
        spread_from_seeds(&VertexAdjacency(self.point_map()), seeds, admit)
    }

    /// Triangle-level region growing, see [`spread_from_seeds`].
    pub fn spread_triangles<I, F>(&self, seeds: I, admit: F) -> Spread<u32>
    where
        I: IntoIterator<Item = u32>,
        F: FnMut(u32, u32) -> bool,
    {
        spread_from_seeds(&TriangleAdjacency(self.tri_map()), seeds, admit)
    }
}

/// Owner of several mesh contexts.
#[derive(Debug, Default)]
pub struct MeshArena {
    meshes: SlotMap<MeshKey, MeshContext>,
}

impl MeshArena {
    /// Creates an empty arena.
    pub fn new() -> Self {
        Self {
            meshes: SlotMap::with_key(),
        }
    }

    /// Validates and stores a mesh.
    pub fn insert(&mut self, mesh: Mesh) -> Result<MeshKey> {
        let ctx = MeshContext::new(mesh)?;
        Ok(self.meshes.insert(ctx))
    }

    /// Looks up a mesh context by key.
    pub fn get(&self, key: MeshKey) -> Result<&MeshContext> {
        self.meshes.get(key).ok_or(Error::UnknownMesh(key))
    }

    /// Looks up a mesh context by key for modification.
    pub fn get_mut(&mut self, key: MeshKey) -> Result<&mut MeshContext> {
        self.meshes.get_mut(key).ok_or(Error::UnknownMesh(key))
    }

    /// Removes a mesh and hands it back.
    pub fn remove(&mut self, key: MeshKey) -> Result<Mesh> {
        self.meshes
            .remove(key)
            .map(MeshContext::into_mesh)
            .ok_or(Error::UnknownMesh(key))
    }

    /// Returns `true` if the key is live.
    pub fn contains(&self, key: MeshKey) -> bool {
        self.meshes.contains_key(key)
    }

    /// Number of stored meshes.
    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    /// Returns `true` if no mesh is stored.
    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }

    /// Iterates over all contexts with their keys.
    pub fn iter(&self) -> impl Iterator<Item = (MeshKey, &MeshContext)> {
        self.meshes.iter()
    }
}
