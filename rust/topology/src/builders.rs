// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Builders for simple reference meshes.
//!
//! Used by tests and benchmarks across the workspace, and handy for
//! reproducing issues without a scan at hand.

use nalgebra::Point3;

use crate::mesh::Mesh;

impl Mesh {
    /// Regular icosahedron centred at the origin with the given
    /// circumradius. 12 vertices, 20 outward-wound triangles.
    pub fn icosahedron(radius: f64) -> Self {
        let t = (1.0 + 5f64.sqrt()) / 2.0;
        let scale = radius / (1.0 + t * t).sqrt();
        let raw = [
            [-1.0, t, 0.0],
            [1.0, t, 0.0],
            [-1.0, -t, 0.0],
            [1.0, -t, 0.0],
            [0.0, -1.0, t],
            [0.0, 1.0, t],
            [0.0, -1.0, -t],
            [0.0, 1.0, -t],
            [t, 0.0, -1.0],
            [t, 0.0, 1.0],
            [-t, 0.0, -1.0],
            [-t, 0.0, 1.0],
        ];
        let points: Vec<Point3<f64>> = raw
            .iter()
            .map(|p| Point3::new(p[0] * scale, p[1] * scale, p[2] * scale))
            .collect();

        let faces = [
            [0, 11, 5],
            [0, 5, 1],
            [0, 1, 7],
            [0, 7, 10],
            [0, 10, 11],
            [1, 5, 9],
            [5, 11, 4],
            [11, 10, 2],
            [10, 7, 6],
            [7, 1, 8],
            [3, 9, 4],
            [3, 4, 2],
            [3, 2, 6],
            [3, 6, 8],
            [3, 8, 9],
            [4, 9, 5],
            [2, 4, 11],
            [6, 2, 10],
            [8, 6, 7],
            [9, 8, 1],
        ];

        Self::from_triangles(&points, &faces)
    }

    /// Flat `cells × cells` grid in the XY plane with `spacing` between
    /// neighbouring vertices, lower-left corner at the origin.
    pub fn grid(cells: u32, spacing: f64) -> Self {
        Self::height_field(cells, spacing, |_, _| 0.0)
    }

    /// `cells × cells` grid whose vertex heights are given by `height(x, y)`.
    ///
    /// Each cell is split along its (0,0)-(1,1) diagonal. Triangles wind
    /// counter-clockwise seen from +Z.
    pub fn height_field<F>(cells: u32, spacing: f64, height: F) -> Self
    where
        F: Fn(f64, f64) -> f64,
    {
        let side = cells + 1;
        let mut points = Vec::with_capacity((side * side) as usize);
        for j in 0..side {
            for i in 0..side {
                let x = i as f64 * spacing;
                let y = j as f64 * spacing;
                points.push(Point3::new(x, y, height(x, y)));
            }
        }

        let mut faces = Vec::with_capacity((cells * cells * 2) as usize);
        for j in 0..cells {
            for i in 0..cells {
                let a = j * side + i;
                let b = a + 1;
                let c = a + side + 1;
                let d = a + side;
                faces.push([a, b, c]);
                faces.push([a, c, d]);
            }
        }

        Self::from_triangles(&points, &faces)
    }

    /// Copy of this mesh where every triangle corner gets its own vertex
    /// slot, the way exporters emit flat-shaded geometry.
    pub fn unwelded(&self) -> Self {
        let mut positions = Vec::with_capacity(self.indices.len() * 3);
        for &i in &self.indices {
            positions.extend_from_slice(&self.raw_position(i));
        }
        let indices = (0..self.indices.len() as u32).collect();
        Self { positions, indices }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn icosahedron_counts() {
        let mesh = Mesh::icosahedron(1.0);
        assert!(mesh.validate().is_ok());
        assert_eq!(mesh.vertex_count(), 12);
        assert_eq!(mesh.triangle_count(), 20);
    }

    #[test]
    fn icosahedron_is_wound_outwards() {
        let mesh = Mesh::icosahedron(1.0);
        for t in 0..mesh.triangle_count() {
            let [a, b, c] = mesh.triangle_points(t);
            let centroid = (a.coords + b.coords + c.coords) / 3.0;
            assert!(mesh.triangle_normal(t).dot(&centroid) > 0.0);
        }
    }

    #[test]
    fn grid_counts() {
        let mesh = Mesh::grid(4, 1.0);
        assert_eq!(mesh.vertex_count(), 25);
        assert_eq!(mesh.triangle_count(), 32);
    }

    #[test]
    fn unwelded_duplicates_corners() {
        let mesh = Mesh::grid(2, 1.0).unwelded();
        assert_eq!(mesh.vertex_count(), 24);
        assert_eq!(mesh.triangle_count(), 8);
    }
}
