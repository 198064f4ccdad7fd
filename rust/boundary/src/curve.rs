// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Closed curves and their post-processing.

use marginline_topology::MeshContext;
use nalgebra::Point3;
use rayon::prelude::*;

/// Tension of the Catmull-Rom spline used for resampling.
pub const CATMULL_ROM_TENSION: f64 = 0.5;

/// Spline samples per control segment when measuring arc length.
const ARC_SAMPLES_PER_SEGMENT: usize = 16;

/// Ordered points with cyclic semantics: the last point connects back to
/// the first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClosedCurve {
    points: Vec<Point3<f64>>,
}

impl ClosedCurve {
    /// Wraps points already in loop order.
    pub fn new(points: Vec<Point3<f64>>) -> Self {
        Self { points }
    }

    /// Points in loop order.
    pub fn points(&self) -> &[Point3<f64>] {
        &self.points
    }

    /// Consumes the curve and returns its points.
    pub fn into_points(self) -> Vec<Point3<f64>> {
        self.points
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Returns `true` if the curve has no points.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Perimeter including the closing edge.
    pub fn length(&self) -> f64 {
        crate::sequence::total_length(&self.points)
    }

    /// See [`smooth_closed`].
    pub fn smoothed(&self, iterations: usize, factor: f64) -> Self {
        Self::new(smooth_closed(&self.points, iterations, factor))
    }

    /// See [`resample_closed`].
    pub fn resampled(&self, count: usize) -> Self {
        Self::new(resample_closed(&self.points, count))
    }

    /// See [`project_onto_mesh`].
    pub fn projected(&self, ctx: &MeshContext) -> Self {
        Self::new(project_onto_mesh(ctx, &self.points))
    }
}

impl From<Vec<Point3<f64>>> for ClosedCurve {
    fn from(points: Vec<Point3<f64>>) -> Self {
        Self::new(points)
    }
}

/// Cyclic moving-average smoothing: each pass moves every point towards the
/// midpoint of its two neighbours by `factor`.
pub fn smooth_closed(points: &[Point3<f64>], iterations: usize, factor: f64) -> Vec<Point3<f64>> {
    let n = points.len();
    let mut current = points.to_vec();
    if n < 3 {
        return current;
    }

    for _ in 0..iterations {
        current = (0..n)
            .map(|i| {
                let prev = current[(i + n - 1) % n];
                let next = current[(i + 1) % n];
                let mid = nalgebra::center(&prev, &next);
                current[i] + (mid - current[i]) * factor
            })
            .collect();
    }
    current
}

/// Point on the closed uniform Catmull-Rom spline through `points`.
/// `u` in `[0, 1)` covers the whole loop. `None` for an empty input.
pub fn catmull_rom_closed(points: &[Point3<f64>], u: f64) -> Option<Point3<f64>> {
    (!points.is_empty()).then(|| spline_point(points, u))
}

/// Requires a non-empty `points`.
fn spline_point(points: &[Point3<f64>], u: f64) -> Point3<f64> {
    let n = points.len();
    let p = u.rem_euclid(1.0) * n as f64;
    let seg = (p.floor() as usize).min(n - 1);
    let t = p - seg as f64;

    let p0 = points[(seg + n - 1) % n];
    let p1 = points[seg];
    let p2 = points[(seg + 1) % n];
    let p3 = points[(seg + 2) % n];

    let m1 = (p2 - p0) * CATMULL_ROM_TENSION;
    let m2 = (p3 - p1) * CATMULL_ROM_TENSION;

    let t2 = t * t;
    let t3 = t2 * t;
    let h00 = 2.0 * t3 - 3.0 * t2 + 1.0;
    let h10 = t3 - 2.0 * t2 + t;
    let h01 = -2.0 * t3 + 3.0 * t2;
    let h11 = t3 - t2;

    Point3::from(p1.coords * h00 + m1 * h10 + p2.coords * h01 + m2 * h11)
}

/// `count` points evenly spaced by arc length along the closed Catmull-Rom
/// spline through `points`, starting at the first control point.
///
/// Inputs with fewer than two points, or of zero length, come back
/// unchanged.
pub fn resample_closed(points: &[Point3<f64>], count: usize) -> Vec<Point3<f64>> {
    let n = points.len();
    if n < 2 || count == 0 {
        return points.to_vec();
    }

    // cumulative arc length at parameters k / steps
    let steps = n * ARC_SAMPLES_PER_SEGMENT;
    let mut lengths = Vec::with_capacity(steps + 1);
    lengths.push(0.0);
    let mut last = spline_point(points, 0.0);
    for k in 1..=steps {
        let q = if k == steps {
            points[0]
        } else {
            spline_point(points, k as f64 / steps as f64)
        };
        let acc = lengths[k - 1] + nalgebra::distance(&last, &q);
        lengths.push(acc);
        last = q;
    }

    let total = lengths[steps];
    if total <= 0.0 {
        return points.to_vec();
    }

    (0..count)
        .map(|i| {
            let target = total * i as f64 / count as f64;
            let k = lengths.partition_point(|&l| l <= target).clamp(1, steps);
            let (l0, l1) = (lengths[k - 1], lengths[k]);
            let frac = if l1 > l0 { (target - l0) / (l1 - l0) } else { 0.0 };
            spline_point(points, (k as f64 - 1.0 + frac) / steps as f64)
        })
        .collect()
}

/// Snaps every point to the closest point of the mesh surface.
pub fn project_onto_mesh(ctx: &MeshContext, points: &[Point3<f64>]) -> Vec<Point3<f64>> {
    let bvh = ctx.bvh();
    points
        .par_iter()
        .map(|p| bvh.closest_point(p).map_or(*p, |hit| hit.point))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use marginline_topology::Mesh;

    fn square() -> Vec<Point3<f64>> {
        vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(2.0, 2.0, 0.0),
            Point3::new(0.0, 2.0, 0.0),
        ]
    }

    #[test]
    fn smoothing_contracts_towards_centroid() {
        let smoothed = smooth_closed(&square(), 1, 1.0);
        // each corner moves to the midpoint of its neighbours
        assert_relative_eq!(smoothed[0], Point3::new(1.0, 1.0, 0.0), epsilon = 1e-12);
        let unchanged = smooth_closed(&square(), 3, 0.0);
        assert_eq!(unchanged, square());
    }

    #[test]
    fn smoothing_keeps_short_inputs() {
        let two = vec![Point3::origin(), Point3::new(1.0, 0.0, 0.0)];
        assert_eq!(smooth_closed(&two, 5, 0.5), two);
    }

    #[test]
    fn spline_interpolates_control_points() {
        let pts = square();
        for (i, p) in pts.iter().enumerate() {
            let q = catmull_rom_closed(&pts, i as f64 / pts.len() as f64).unwrap();
            assert_relative_eq!(q, *p, epsilon = 1e-12);
        }
    }

    #[test]
    fn spline_of_nothing_is_none() {
        assert!(catmull_rom_closed(&[], 0.3).is_none());
        let single = [Point3::new(1.0, 2.0, 3.0)];
        assert_relative_eq!(catmull_rom_closed(&single, 0.7).unwrap(), single[0], epsilon = 1e-12);
        assert!(resample_closed(&[], 8).is_empty());
    }

    #[test]
    fn resampled_circle_is_evenly_spaced() {
        let ring: Vec<_> = (0..12)
            .map(|k| {
                let a = k as f64 / 12.0 * std::f64::consts::TAU;
                Point3::new(3.0 * a.cos(), 3.0 * a.sin(), 0.0)
            })
            .collect();
        let samples = resample_closed(&ring, 48);
        assert_eq!(samples.len(), 48);
        assert_relative_eq!(samples[0], ring[0], epsilon = 1e-12);

        let gaps: Vec<f64> = (0..48)
            .map(|i| nalgebra::distance(&samples[i], &samples[(i + 1) % 48]))
            .collect();
        let mean = gaps.iter().sum::<f64>() / 48.0;
        for g in gaps {
            assert_relative_eq!(g, mean, max_relative = 0.02);
        }
        for p in &samples {
            assert_relative_eq!(p.coords.norm(), 3.0, max_relative = 0.01);
        }
    }

    #[test]
    fn projection_lands_on_surface() {
        let ctx = MeshContext::new(Mesh::grid(4, 1.0)).unwrap();
        let curve = ClosedCurve::new(vec![
            Point3::new(1.0, 1.0, 0.7),
            Point3::new(3.0, 1.0, -0.4),
            Point3::new(2.0, 3.0, 2.0),
        ]);
        let projected = curve.projected(&ctx);
        assert_eq!(projected.len(), 3);
        for (p, q) in projected.points().iter().zip(curve.points()) {
            assert_relative_eq!(p.z, 0.0, epsilon = 1e-12);
            assert_relative_eq!(p.x, q.x, epsilon = 1e-12);
            assert_relative_eq!(p.y, q.y, epsilon = 1e-12);
        }
    }

    #[test]
    fn curve_length() {
        assert_relative_eq!(ClosedCurve::new(square()).length(), 8.0, epsilon = 1e-12);
    }
}
