// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # Marginline Topology
//!
//! Position-keyed topology, proximity queries and region growing over
//! triangulated surface scans.
//!
//! The [`Mesh`] is plain indexed geometry. A [`MeshContext`] owns it and
//! lazily derives the structures every query needs:
//!
//! - [`PointMap`], [`EdgeMap`], [`TriMap`]: adjacency keyed by vertex
//!   position, so duplicated seam vertices do not split the surface,
//! - [`MeshBvh`]: volume, closest-point and ray queries,
//! - [`spread_from_seeds`]: predicate-gated breadth-first growth over either
//!   vertex or triangle adjacency.

pub mod arena;
pub mod builders;
pub mod bvh;
pub mod error;
pub mod index;
pub mod keys;
pub mod mesh;
pub mod spatial;
pub mod spread;

pub use arena::{MeshArena, MeshContext};
pub use bvh::{Aabb, Bvh};
pub use error::{Error, Result};
pub use index::{EdgeEntry, EdgeMap, PointEntry, PointMap, TriMap};
pub use keys::{EdgeKey, MeshKey, PositionKey};
pub use mesh::Mesh;
pub use spatial::{closest_point_on_triangle, ClosestHit, MeshBvh, RayHit, Volume};
pub use spread::{spread_from_seeds, Adjacency, Spread, TriangleAdjacency, VertexAdjacency};
