// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Indexed triangle mesh as handed over by a mesh loader.

use nalgebra::{Point3, Vector3};

use crate::error::{Error, Result};
use crate::keys::PositionKey;

/// Triangle mesh with flat vertex and index buffers.
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    /// Vertex positions (x, y, z)
    pub positions: Vec<f32>,
    /// Triangle indices (i0, i1, i2)
    pub indices: Vec<u32>,
}

impl Mesh {
    /// Create a mesh from flat buffers.
    pub fn new(positions: Vec<f32>, indices: Vec<u32>) -> Self {
        Self { positions, indices }
    }

    /// Create a mesh from points and triangle index triples.
    pub fn from_triangles(points: &[Point3<f64>], triangles: &[[u32; 3]]) -> Self {
        let mut positions = Vec::with_capacity(points.len() * 3);
        for p in points {
            positions.push(p.x as f32);
            positions.push(p.y as f32);
            positions.push(p.z as f32);
        }
        let indices = triangles.iter().flat_map(|t| t.iter().copied()).collect();
        Self { positions, indices }
    }

    /// Number of vertex slots (not unique positions).
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    /// Number of triangles.
    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Check if the mesh has no triangles.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Checks that the buffers describe an indexed triangle mesh that the
    /// topology builders can consume.
    pub fn validate(&self) -> Result<()> {
        if self.positions.is_empty() {
            return Err(Error::MalformedMesh("missing position data".into()));
        }
        if self.positions.len() % 3 != 0 {
            return Err(Error::MalformedMesh(format!(
                "position buffer length {} is not a multiple of 3",
                self.positions.len()
            )));
        }
        if self.indices.is_empty() {
            return Err(Error::MalformedMesh("missing index buffer".into()));
        }
        if self.indices.len() % 3 != 0 {
            return Err(Error::MalformedMesh(format!(
                "index buffer length {} is not a multiple of 3",
                self.indices.len()
            )));
        }
        if let Some(bad) = self.positions.iter().position(|v| !v.is_finite()) {
            return Err(Error::MalformedMesh(format!(
                "vertex {} has a non-finite coordinate",
                bad / 3
            )));
        }
        let vertex_count = self.vertex_count();
        if let Some(bad) = self.indices.iter().position(|&i| i as usize >= vertex_count) {
            return Err(Error::MalformedMesh(format!(
                "triangle {} references vertex {} but the mesh has {} vertices",
                bad / 3,
                self.indices[bad],
                vertex_count
            )));
        }
        Ok(())
    }

    /// Raw `[x, y, z]` of a vertex slot.
    #[inline]
    pub fn raw_position(&self, vertex: u32) -> [f32; 3] {
        let i = vertex as usize * 3;
        [self.positions[i], self.positions[i + 1], self.positions[i + 2]]
    }

    /// Position of a vertex slot.
    #[inline]
    pub fn position(&self, vertex: u32) -> Point3<f64> {
        let [x, y, z] = self.raw_position(vertex);
        Point3::new(x as f64, y as f64, z as f64)
    }

    /// Position key of a vertex slot.
    #[inline]
    pub fn position_key(&self, vertex: u32) -> PositionKey {
        PositionKey::from_array(self.raw_position(vertex))
    }

    /// Vertex indices of a triangle.
    #[inline]
    pub fn triangle(&self, tri: usize) -> [u32; 3] {
        let i = tri * 3;
        [self.indices[i], self.indices[i + 1], self.indices[i + 2]]
    }

    /// Corner positions of a triangle.
    #[inline]
    pub fn triangle_points(&self, tri: usize) -> [Point3<f64>; 3] {
        let [a, b, c] = self.triangle(tri);
        [self.position(a), self.position(b), self.position(c)]
    }

    /// Corner position keys of a triangle.
    #[inline]
    pub fn triangle_keys(&self, tri: usize) -> [PositionKey; 3] {
        let [a, b, c] = self.triangle(tri);
        [self.position_key(a), self.position_key(b), self.position_key(c)]
    }

    /// Unit normal of a triangle following its winding, or zero for a
    /// degenerate triangle.
    pub fn triangle_normal(&self, tri: usize) -> Vector3<f64> {
        let [a, b, c] = self.triangle_points(tri);
        (b - a).cross(&(c - a)).try_normalize(f64::EPSILON).unwrap_or_else(Vector3::zeros)
    }

    /// Iterate over the triangles as vertex index triples.
    pub fn triangles(&self) -> impl Iterator<Item = [u32; 3]> + '_ {
        self.indices.chunks_exact(3).map(|t| [t[0], t[1], t[2]])
    }

    /// Axis-aligned bounds of all vertex slots.
    pub fn bounds(&self) -> (Point3<f64>, Point3<f64>) {
        let mut min = Point3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY);
        let mut max = Point3::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY);
        for v in 0..self.vertex_count() as u32 {
            let p = self.position(v);
            min = min.inf(&p);
            max = max.sup(&p);
        }
        (min, max)
    }
}
