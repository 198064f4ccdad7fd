// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Proximity queries over a mesh: which vertices lie inside a volume,
//! closest surface point, and first ray hit.
//!
//! Queries are exact with respect to the supplied volume. There is no
//! implicit tolerance; a sphere of radius 0 only reports vertices that
//! coincide with its centre.

use nalgebra::{Point3, Vector3};
use rustc_hash::FxHashSet;

use crate::bvh::{Aabb, BoundsTest, Bvh};
use crate::error::Result;
use crate::keys::PositionKey;
use crate::mesh::Mesh;

/// Query volume for [`MeshBvh::points_within`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Volume {
    /// Closed ball.
    Sphere { center: Point3<f64>, radius: f64 },
    /// Closed axis-aligned box.
    Aabb { min: Point3<f64>, max: Point3<f64> },
}

impl Volume {
    /// Closed ball; a negative or NaN radius gives an empty volume.
    pub fn sphere(center: Point3<f64>, radius: f64) -> Self {
        Volume::Sphere { center, radius }
    }

    /// Axis-aligned cube around `center`.
    pub fn cube(center: Point3<f64>, half_extent: f64) -> Self {
        let h = Vector3::repeat(half_extent);
        Volume::Aabb {
            min: center - h,
            max: center + h,
        }
    }

    /// Returns `false` for a negative radius.
    pub fn contains_point(&self, p: &Point3<f64>) -> bool {
        match *self {
            Volume::Sphere { center, radius } => {
                radius >= 0.0 && (p - center).norm_squared() <= radius * radius
            }
            Volume::Aabb { min, max } => Aabb::new(min, max).contains_point(p),
        }
    }

    pub fn intersects_aabb(&self, bbox: &Aabb) -> bool {
        match *self {
            Volume::Sphere { center, radius } => {
                radius >= 0.0 && bbox.distance_squared_to_point(&center) <= radius * radius
            }
            Volume::Aabb { min, max } => Aabb::new(min, max).intersects(bbox),
        }
    }

    /// Returns `true` if every point of `bbox` lies inside the volume.
    pub fn contains_aabb(&self, bbox: &Aabb) -> bool {
        match *self {
            Volume::Sphere { center, radius } => {
                radius >= 0.0 && bbox.max_distance_squared_to_point(&center) <= radius * radius
            }
            Volume::Aabb { min, max } => Aabb::new(min, max).contains_box(bbox),
        }
    }

    fn classify(&self, bbox: &Aabb) -> BoundsTest {
        if !self.intersects_aabb(bbox) {
            BoundsTest::Outside
        } else if self.contains_aabb(bbox) {
            BoundsTest::Contained
        } else {
            BoundsTest::Intersected
        }
    }
}

/// Closest surface point to a query point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClosestHit {
    pub point: Point3<f64>,
    /// Triangle index in the mesh.
    pub face: usize,
    pub distance: f64,
}

/// Nearest intersection of a ray with the mesh.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub face: usize,
    /// Ray parameter; equals the Euclidean distance for a unit direction.
    pub distance: f64,
    pub point: Point3<f64>,
    /// Geometric normal of the hit triangle, following its winding.
    pub normal: Vector3<f64>,
}

/// BVH over the triangles of one mesh.
#[derive(Debug, Clone)]
pub struct MeshBvh {
    bvh: Bvh,
    corners: Vec<[Point3<f64>; 3]>,
    keys: Vec<[PositionKey; 3]>,
}

impl MeshBvh {
    /// Validates the mesh and builds the tree.
    pub fn build(mesh: &Mesh) -> Result<Self> {
        mesh.validate()?;
        Ok(Self::build_unchecked(mesh))
    }

    pub(crate) fn build_unchecked(mesh: &Mesh) -> Self {
        let count = mesh.triangle_count();
        let mut corners = Vec::with_capacity(count);
        let mut keys = Vec::with_capacity(count);
        let mut bboxes = Vec::with_capacity(count);

        for tri in 0..count {
            let pts = mesh.triangle_points(tri);
            bboxes.push(Aabb::from_points(&pts));
            corners.push(pts);
            keys.push(mesh.triangle_keys(tri));
        }

        let bvh = Bvh::build(&bboxes);
        tracing::debug!(triangles = count, "built mesh BVH");
        Self { bvh, corners, keys }
    }

    /// Number of indexed triangles.
    pub fn triangle_count(&self) -> usize {
        self.corners.len()
    }

    /// Bounds of the whole mesh, `None` for an empty tree.
    pub fn bounds(&self) -> Option<Aabb> {
        self.bvh.bounds()
    }

    /// Corner position keys of every vertex inside `volume`.
    ///
    /// Nodes whose box lies fully inside the volume contribute every corner
    /// below them without per-vertex tests.
    pub fn points_within(&self, volume: &Volume) -> FxHashSet<PositionKey> {
        let mut out = FxHashSet::default();
        self.bvh.shapecast(
            |bbox| volume.classify(bbox),
            |tri, contained| {
                let keys = &self.keys[tri];
                if contained {
                    out.extend(keys.iter().copied());
                } else {
                    for (p, key) in self.corners[tri].iter().zip(keys) {
                        if volume.contains_point(p) {
                            out.insert(*key);
                        }
                    }
                }
                true
            },
        );
        out
    }

    /// Closest point on the surface to `point`.
    pub fn closest_point(&self, point: &Point3<f64>) -> Option<ClosestHit> {
        let (face, dist2) = self.bvh.nearest(point, |tri| {
            let [a, b, c] = &self.corners[tri];
            let q = closest_point_on_triangle(point, a, b, c);
            Some((q - point).norm_squared())
        })?;

        let [a, b, c] = &self.corners[face];
        Some(ClosestHit {
            point: closest_point_on_triangle(point, a, b, c),
            face,
            distance: dist2.sqrt(),
        })
    }

    /// Nearest hit along `origin + t * dir` for `t >= 0`, either side of the
    /// triangles.
    pub fn raycast(&self, origin: &Point3<f64>, dir: &Vector3<f64>) -> Option<RayHit> {
        if dir.norm_squared() == 0.0 {
            return None;
        }

        let mut best: Option<(usize, f64)> = None;
        self.bvh.query_ray(origin, dir, 0.0, f64::INFINITY, |tri| {
            let [a, b, c] = &self.corners[tri];
            if let Some(t) = ray_triangle(origin, dir, a, b, c) {
                let better = match best {
                    None => true,
                    Some((bt, bd)) => t < bd || (t == bd && tri < bt),
                };
                if better {
                    best = Some((tri, t));
                }
            }
            true
        });

        best.map(|(face, t)| {
            let [a, b, c] = &self.corners[face];
            RayHit {
                face,
                distance: t,
                point: origin + dir * t,
                normal: (b - a).cross(&(c - a)).try_normalize(f64::EPSILON).unwrap_or_else(Vector3::zeros),
            }
        })
    }

    /// Corner keys of an indexed triangle.
    pub fn triangle_keys(&self, face: usize) -> Option<[PositionKey; 3]> {
        self.keys.get(face).copied()
    }
}

/// Möller–Trumbore, double sided. Returns the ray parameter of the hit.
fn ray_triangle(
    origin: &Point3<f64>,
    dir: &Vector3<f64>,
    a: &Point3<f64>,
    b: &Point3<f64>,
    c: &Point3<f64>,
) -> Option<f64> {
    const EPS: f64 = 1e-12;

    let e1 = b - a;
    let e2 = c - a;
    let p = dir.cross(&e2);
    let det = e1.dot(&p);
    if det.abs() < EPS {
        return None;
    }

    let inv_det = 1.0 / det;
    let s = origin - a;
    let u = s.dot(&p) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let q = s.cross(&e1);
    let v = dir.dot(&q) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = e2.dot(&q) * inv_det;
    (t >= 0.0).then_some(t)
}

/// Closest point on triangle `abc` to `p` (Ericson, Real-Time Collision
/// Detection 5.1.5).
pub fn closest_point_on_triangle(
    p: &Point3<f64>,
    a: &Point3<f64>,
    b: &Point3<f64>,
    c: &Point3<f64>,
) -> Point3<f64> {
    let ab = b - a;
    let ac = c - a;
    let ap = p - a;
    let d1 = ab.dot(&ap);
    let d2 = ac.dot(&ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return *a;
    }

    let bp = p - b;
    let d3 = ab.dot(&bp);
    let d4 = ac.dot(&bp);
    if d3 >= 0.0 && d4 <= d3 {
        return *b;
    }

    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        let v = d1 / (d1 - d3);
        return a + ab * v;
    }

    let cp = p - c;
    let d5 = ab.dot(&cp);
    let d6 = ac.dot(&cp);
    if d6 >= 0.0 && d5 <= d6 {
        return *c;
    }

    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        let w = d2 / (d2 - d6);
        return a + ac * w;
    }

    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
        return b + (c - b) * w;
    }

    let denom = 1.0 / (va + vb + vc);
    let v = vb * denom;
    let w = vc * denom;
    a + ab * v + ac * w
}
