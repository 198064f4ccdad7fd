// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Key types for position-based topology.
//!
//! Scanned meshes routinely duplicate a vertex position across several
//! attribute slots (per-face normals, UV seams, colour splits). Adjacency
//! built on raw indices breaks apart at those seams, so every topology
//! structure in this crate is keyed by *position* instead.
//!
//! A [`PositionKey`] is the exact bit pattern of the three `f32`
//! coordinates. Two vertices share a key iff their coordinates compare equal;
//! there is no epsilon. `-0.0` is folded onto `+0.0` so that the equivalence
//! matches IEEE equality.
//!
//! [`MeshKey`] is the generational handle of a mesh stored in a
//! [`MeshArena`](crate::arena::MeshArena).

use std::fmt;

use nalgebra::Point3;
use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

new_key_type! {
    /// Key for a mesh (and its topology cache) stored in a mesh arena.
    pub struct MeshKey;
}

/// Canonical identifier of a vertex position.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PositionKey([u32; 3]);

impl PositionKey {
    /// Builds the key of an `f32` position.
    #[inline]
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self([canonical_bits(x), canonical_bits(y), canonical_bits(z)])
    }

    /// Builds a key from a flat `[x, y, z]` slice entry.
    #[inline]
    pub fn from_array(p: [f32; 3]) -> Self {
        Self::new(p[0], p[1], p[2])
    }

    /// Builds the key of an `f64` point by rounding it to `f32` first.
    ///
    /// Only round-trips for points that were read from an `f32` buffer.
    #[inline]
    pub fn from_point(p: &Point3<f64>) -> Self {
        Self::new(p.x as f32, p.y as f32, p.z as f32)
    }

    /// Returns the coordinates encoded in this key.
    #[inline]
    pub fn coords(&self) -> [f32; 3] {
        [
            f32::from_bits(self.0[0]),
            f32::from_bits(self.0[1]),
            f32::from_bits(self.0[2]),
        ]
    }

    /// Returns the encoded position as a double precision point.
    #[inline]
    pub fn to_point(&self) -> Point3<f64> {
        let [x, y, z] = self.coords();
        Point3::new(x as f64, y as f64, z as f64)
    }
}

impl fmt::Debug for PositionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [x, y, z] = self.coords();
        write!(f, "PositionKey({x}, {y}, {z})")
    }
}

impl From<[f32; 3]> for PositionKey {
    fn from(p: [f32; 3]) -> Self {
        Self::from_array(p)
    }
}

#[inline]
fn canonical_bits(v: f32) -> u32 {
    // -0.0 == 0.0, so both must map to the same key
    if v == 0.0 {
        0
    } else {
        v.to_bits()
    }
}

/// Canonical key of an undirected edge: the two endpoint keys in sorted
/// order, so `(a, b)` and `(b, a)` collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EdgeKey(PositionKey, PositionKey);

impl EdgeKey {
    /// Creates the canonical key for the edge between `a` and `b`.
    #[inline]
    pub fn new(a: PositionKey, b: PositionKey) -> Self {
        if a <= b {
            Self(a, b)
        } else {
            Self(b, a)
        }
    }

    /// Returns the two endpoints, smaller key first.
    #[inline]
    pub fn endpoints(&self) -> (PositionKey, PositionKey) {
        (self.0, self.1)
    }

    /// Returns `true` if both endpoints are the same position.
    #[inline]
    pub fn is_degenerate(&self) -> bool {
        self.0 == self.1
    }

    /// Returns the endpoint opposite `key`, or `None` if `key` is not an
    /// endpoint of this edge.
    pub fn other(&self, key: PositionKey) -> Option<PositionKey> {
        if key == self.0 {
            Some(self.1)
        } else if key == self.1 {
            Some(self.0)
        } else {
            None
        }
    }
}
