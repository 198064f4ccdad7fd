// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Median-split bounding volume hierarchy over axis-aligned boxes.
//!
//! The tree only knows about primitive boxes; callers supply closures that
//! decide what happens at nodes and leaves. [`MeshBvh`](crate::spatial::MeshBvh)
//! wraps it with triangle-specific queries.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use nalgebra::{Point3, Vector3};

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Point3<f64>,
    pub max: Point3<f64>,
}

impl Aabb {
    /// Box spanning two corners.
    #[inline]
    pub fn new(min: Point3<f64>, max: Point3<f64>) -> Self {
        Self { min, max }
    }

    /// An inverted box that any `expand` call will overwrite.
    #[inline]
    pub fn empty() -> Self {
        Self {
            min: Point3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY),
            max: Point3::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
        }
    }

    /// Smallest box containing all `points`.
    pub fn from_points<'a, I>(points: I) -> Self
    where
        I: IntoIterator<Item = &'a Point3<f64>>,
    {
        let mut bbox = Self::empty();
        for p in points {
            bbox.expand(p);
        }
        bbox
    }

    /// Returns `true` if no point was ever added.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x
    }

    /// Grows the box to include `p`.
    #[inline]
    pub fn expand(&mut self, p: &Point3<f64>) {
        self.min = self.min.inf(p);
        self.max = self.max.sup(p);
    }

    /// Smallest box containing both boxes.
    #[inline]
    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.inf(&other.min),
            max: self.max.sup(&other.max),
        }
    }

    #[inline]
    pub fn center(&self) -> Point3<f64> {
        nalgebra::center(&self.min, &self.max)
    }

    #[inline]
    pub fn extent(&self) -> Vector3<f64> {
        self.max - self.min
    }

    #[inline]
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    #[inline]
    pub fn contains_point(&self, p: &Point3<f64>) -> bool {
        p.x >= self.min.x
            && p.x <= self.max.x
            && p.y >= self.min.y
            && p.y <= self.max.y
            && p.z >= self.min.z
            && p.z <= self.max.z
    }

    /// Returns `true` if `other` lies entirely inside this box.
    #[inline]
    pub fn contains_box(&self, other: &Aabb) -> bool {
        self.contains_point(&other.min) && self.contains_point(&other.max)
    }

    /// Squared distance from `p` to the closest point of the box (zero
    /// inside).
    pub fn distance_squared_to_point(&self, p: &Point3<f64>) -> f64 {
        let dx = axis_gap(p.x, self.min.x, self.max.x);
        let dy = axis_gap(p.y, self.min.y, self.max.y);
        let dz = axis_gap(p.z, self.min.z, self.max.z);
        dx * dx + dy * dy + dz * dz
    }

    /// Squared distance from `p` to the farthest corner of the box.
    pub fn max_distance_squared_to_point(&self, p: &Point3<f64>) -> f64 {
        let dx = (p.x - self.min.x).abs().max((p.x - self.max.x).abs());
        let dy = (p.y - self.min.y).abs().max((p.y - self.max.y).abs());
        let dz = (p.z - self.min.z).abs().max((p.z - self.max.z).abs());
        dx * dx + dy * dy + dz * dz
    }

    /// Slab test for a ray restricted to `[t_min, t_max]`.
    pub fn intersects_ray(
        &self,
        origin: &Point3<f64>,
        dir: &Vector3<f64>,
        t_min: f64,
        t_max: f64,
    ) -> bool {
        let mut tmin = t_min;
        let mut tmax = t_max;

        for axis in 0..3 {
            let o = origin[axis];
            let d = dir[axis];
            let (lo, hi) = (self.min[axis], self.max[axis]);

            if d.abs() <= 1e-15 {
                if o < lo || o > hi {
                    return false;
                }
                continue;
            }

            let inv_d = 1.0 / d;
            let mut t0 = (lo - o) * inv_d;
            let mut t1 = (hi - o) * inv_d;
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }

            tmin = tmin.max(t0);
            tmax = tmax.min(t1);
            if tmax < tmin {
                return false;
            }
        }

        true
    }
}

#[inline]
fn axis_gap(v: f64, lo: f64, hi: f64) -> f64 {
    if v < lo {
        lo - v
    } else if v > hi {
        v - hi
    } else {
        0.0
    }
}

/// What a shape-cast callback decides about a node's bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundsTest {
    /// Skip the node and everything below it.
    Outside,
    /// Descend and test children / primitives individually.
    Intersected,
    /// Every primitive below the node is inside the query.
    Contained,
}

#[derive(Debug, Clone, Copy)]
struct BvhNode {
    bbox: Aabb,
    left: u32,
    right: u32,
    start: u32,
    count: u32,
}

impl BvhNode {
    fn leaf(bbox: Aabb, start: u32, count: u32) -> Self {
        Self {
            bbox,
            left: u32::MAX,
            right: u32::MAX,
            start,
            count,
        }
    }

    fn inner(bbox: Aabb, left: u32, right: u32) -> Self {
        Self {
            bbox,
            left,
            right,
            start: 0,
            count: 0,
        }
    }

    #[inline]
    fn is_leaf(&self) -> bool {
        self.count != 0
    }
}

/// Bounding volume hierarchy over primitive boxes.
#[derive(Debug, Clone)]
pub struct Bvh {
    nodes: Vec<BvhNode>,
    prim_indices: Vec<u32>,
}

impl Bvh {
    /// Maximum number of primitives per leaf.
    pub const DEFAULT_LEAF_SIZE: usize = 8;

    /// Builds a tree over `bboxes`; primitive `i` is `bboxes[i]`.
    pub fn build(bboxes: &[Aabb]) -> Self {
        Self::build_with_leaf_size(bboxes, Self::DEFAULT_LEAF_SIZE)
    }

    pub fn build_with_leaf_size(bboxes: &[Aabb], leaf_size: usize) -> Self {
        let mut bvh = Self {
            nodes: Vec::with_capacity(bboxes.len().saturating_mul(2)),
            prim_indices: (0..bboxes.len() as u32).collect(),
        };
        if !bboxes.is_empty() {
            bvh.build_node(bboxes, 0, bboxes.len(), leaf_size.clamp(1, 256));
        }
        bvh
    }

    /// Number of primitives in the tree.
    #[inline]
    pub fn primitive_count(&self) -> usize {
        self.prim_indices.len()
    }

    /// Bounds of the whole tree, `None` when empty.
    pub fn bounds(&self) -> Option<Aabb> {
        self.nodes.first().map(|n| n.bbox)
    }

    fn build_node(&mut self, bboxes: &[Aabb], start: usize, end: usize, leaf_size: usize) -> u32 {
        let node_index = self.nodes.len() as u32;
        let bbox = self.range_bbox(bboxes, start, end);
        self.nodes.push(BvhNode::leaf(bbox, 0, 0));

        let count = end - start;
        if count <= leaf_size {
            self.nodes[node_index as usize] = BvhNode::leaf(bbox, start as u32, count as u32);
            return node_index;
        }

        let axis = self.split_axis(bboxes, start, end);
        let mid = start + count / 2;
        self.prim_indices[start..end].select_nth_unstable_by(mid - start, |a, b| {
            let ca = bboxes[*a as usize].center()[axis];
            let cb = bboxes[*b as usize].center()[axis];
            ca.total_cmp(&cb)
        });

        let left = self.build_node(bboxes, start, mid, leaf_size);
        let right = self.build_node(bboxes, mid, end, leaf_size);
        self.nodes[node_index as usize] = BvhNode::inner(bbox, left, right);
        node_index
    }

    fn range_bbox(&self, bboxes: &[Aabb], start: usize, end: usize) -> Aabb {
        self.prim_indices[start..end]
            .iter()
            .fold(Aabb::empty(), |acc, &i| acc.union(&bboxes[i as usize]))
    }

    /// Longest axis of the centroid spread.
    fn split_axis(&self, bboxes: &[Aabb], start: usize, end: usize) -> usize {
        let mut spread = Aabb::empty();
        for &i in &self.prim_indices[start..end] {
            spread.expand(&bboxes[i as usize].center());
        }
        let e = spread.extent();
        if e.x >= e.y && e.x >= e.z {
            0
        } else if e.y >= e.z {
            1
        } else {
            2
        }
    }

    /// Generic traversal.
    ///
    /// `test_bounds` classifies each node box. For primitives under an
    /// [`BoundsTest::Intersected`] leaf, `visit(prim, false)` is called; for
    /// every primitive below a [`BoundsTest::Contained`] node,
    /// `visit(prim, true)` is called without further box tests. Returning
    /// `false` from `visit` stops the traversal.
    pub fn shapecast<B, V>(&self, mut test_bounds: B, mut visit: V)
    where
        B: FnMut(&Aabb) -> BoundsTest,
        V: FnMut(usize, bool) -> bool,
    {
        if self.nodes.is_empty() {
            return;
        }

        let mut stack = vec![(0u32, false)];
        while let Some((node_idx, contained)) = stack.pop() {
            let node = self.nodes[node_idx as usize];
            let contained = contained
                || match test_bounds(&node.bbox) {
                    BoundsTest::Outside => continue,
                    BoundsTest::Intersected => false,
                    BoundsTest::Contained => true,
                };

            if node.is_leaf() {
                let start = node.start as usize;
                let end = start + node.count as usize;
                for &prim in &self.prim_indices[start..end] {
                    if !visit(prim as usize, contained) {
                        return;
                    }
                }
                continue;
            }

            stack.push((node.right, contained));
            stack.push((node.left, contained));
        }
    }

    /// Visits primitives whose ancestors' boxes are hit by the ray.
    pub fn query_ray<F>(&self, origin: &Point3<f64>, dir: &Vector3<f64>, t_min: f64, t_max: f64, mut visit: F)
    where
        F: FnMut(usize) -> bool,
    {
        self.shapecast(
            |bbox| {
                if bbox.intersects_ray(origin, dir, t_min, t_max) {
                    BoundsTest::Intersected
                } else {
                    BoundsTest::Outside
                }
            },
            |prim, _| visit(prim),
        );
    }

    /// Best-first search for the primitive minimising `distance_to_prim`
    /// (a squared distance). Returns `(primitive, squared distance)`.
    pub fn nearest<F>(&self, point: &Point3<f64>, mut distance_to_prim: F) -> Option<(usize, f64)>
    where
        F: FnMut(usize) -> Option<f64>,
    {
        let root = self.nodes.first()?;

        let mut best_dist2 = f64::INFINITY;
        let mut best_prim = None;
        let mut heap = BinaryHeap::new();
        heap.push(HeapEntry {
            dist2: root.bbox.distance_squared_to_point(point),
            node: 0,
        });

        while let Some(entry) = heap.pop() {
            if entry.dist2 > best_dist2 {
                break;
            }

            let node = self.nodes[entry.node as usize];
            if node.is_leaf() {
                let start = node.start as usize;
                let end = start + node.count as usize;
                for &prim in &self.prim_indices[start..end] {
                    let Some(d2) = distance_to_prim(prim as usize) else {
                        continue;
                    };
                    // ties keep the lower primitive index
                    if d2 < best_dist2
                        || (d2 == best_dist2 && best_prim.is_some_and(|b| (prim as usize) < b))
                    {
                        best_dist2 = d2;
                        best_prim = Some(prim as usize);
                    }
                }
                continue;
            }

            for child in [node.left, node.right] {
                let d2 = self.nodes[child as usize].bbox.distance_squared_to_point(point);
                if d2 <= best_dist2 {
                    heap.push(HeapEntry { dist2: d2, node: child });
                }
            }
        }

        best_prim.map(|idx| (idx, best_dist2))
    }
}

#[derive(Debug, Clone, Copy)]
struct HeapEntry {
    dist2: f64,
    node: u32,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.dist2 == other.dist2 && self.node == other.node
    }
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap
        other
            .dist2
            .total_cmp(&self.dist2)
            .then_with(|| other.node.cmp(&self.node))
    }
}
