// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for topology operations.

use crate::keys::{MeshKey, PositionKey};

/// Result type alias for topology operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during topology operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The mesh lacks usable index or position data.
    #[error("malformed mesh: {0}")]
    MalformedMesh(String),

    /// A position key has no entry in the point map (stale cache, or a key
    /// taken from another mesh).
    #[error("position {0:?} has no point map entry")]
    LookupMiss(PositionKey),

    /// A triangle index is outside the mesh.
    #[error("triangle {index} out of range (mesh has {count} triangles)")]
    TriangleOutOfRange { index: usize, count: usize },

    /// A mesh key does not reference a live mesh in the arena.
    #[error("mesh not found: {0:?}")]
    UnknownMesh(MeshKey),
}
