// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Turns a region cloud and a background cloud into the boundary vertices
//! of the region on the mesh.
//!
//! 1. [`classify`]: vertices near region samples (coarse radius), minus
//!    vertices near background samples (fine radius).
//! 2. [`choose_seed_facet`]: a ray from the centre of the candidates along
//!    the tooth axis picks a triangle that is safely inside the region.
//! 3. [`edge_points`]: growing from that triangle until the background set
//!    stops it; the rejected neighbours are the boundary.

use marginline_topology::{Aabb, MeshContext, PositionKey, Spread, Volume};
use nalgebra::{Point3, Vector3};
use rayon::prelude::*;
use rustc_hash::FxHashSet;

use crate::cloud::PointCloud;
use crate::config::ExtractionConfig;
use crate::error::{Error, Result};

/// Upper or lower jaw of a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScanArch {
    Upper,
    Lower,
}

impl ScanArch {
    /// Arch of an FDI tooth number (11-48 permanent, 51-85 primary).
    pub fn from_fdi(fdi: u8) -> Result<Self> {
        let quadrant = fdi / 10;
        let unit = fdi % 10;
        let max_unit = if quadrant <= 4 { 8 } else { 5 };
        if !(1..=max_unit).contains(&unit) {
            return Err(Error::InvalidTooth(fdi));
        }
        match quadrant {
            1 | 2 | 5 | 6 => Ok(ScanArch::Upper),
            3 | 4 | 7 | 8 => Ok(ScanArch::Lower),
            _ => Err(Error::InvalidTooth(fdi)),
        }
    }

    /// Direction from the region centre towards the crown, in scan
    /// coordinates where occlusal is along Z.
    pub fn seed_direction(self) -> Vector3<f64> {
        match self {
            ScanArch::Upper => -Vector3::z(),
            ScanArch::Lower => Vector3::z(),
        }
    }
}

/// Vertex sets derived from the two clouds.
#[derive(Debug, Clone, Default)]
pub struct Classification {
    /// Vertices within the region radius of a region sample.
    pub region: FxHashSet<PositionKey>,
    /// Vertices within the background radius of a background sample.
    pub background: FxHashSet<PositionKey>,
    /// `region - background`.
    pub candidates: FxHashSet<PositionKey>,
}

/// Union of [`MeshContext::points_within`] over a sphere around each sample,
/// queried in parallel. Fails on a negative or non-finite radius.
pub fn points_near_cloud(ctx: &MeshContext, cloud: &PointCloud, radius: f64) -> Result<FxHashSet<PositionKey>> {
    check_radius("radius", radius)?;
    ctx.ensure_built();
    let bvh = ctx.bvh();
    Ok(cloud
        .samples()
        .par_iter()
        .fold(FxHashSet::default, |mut acc, sample| {
            acc.extend(bvh.points_within(&Volume::sphere(sample.point, radius)));
            acc
        })
        .reduce(FxHashSet::default, |mut a, mut b| {
            if a.len() < b.len() {
                std::mem::swap(&mut a, &mut b);
            }
            a.extend(b);
            a
        }))
}

fn check_radius(name: &'static str, radius: f64) -> Result<()> {
    if !radius.is_finite() || radius < 0.0 {
        return Err(Error::invalid(name, format!("{radius} is not a finite, non-negative radius")));
    }
    Ok(())
}

/// Coarse region set minus fine background set.
pub fn classify(
    ctx: &MeshContext,
    region_cloud: &PointCloud,
    background_cloud: &PointCloud,
    region_radius: f64,
    background_radius: f64,
) -> Result<Classification> {
    check_radius("region_radius", region_radius)?;
    check_radius("background_radius", background_radius)?;
    let (region, background) = rayon::join(
        || points_near_cloud(ctx, region_cloud, region_radius),
        || points_near_cloud(ctx, background_cloud, background_radius),
    );
    let (region, background) = (region?, background?);
    let candidates: FxHashSet<_> = region.difference(&background).copied().collect();

    tracing::debug!(
        region = region.len(),
        background = background.len(),
        candidates = candidates.len(),
        "classified vertices"
    );
    Ok(Classification {
        region,
        background,
        candidates,
    })
}

/// Triangle that anchors region growing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedFacet {
    pub keys: [PositionKey; 3],
    pub face: usize,
}

/// Casts a ray from the bounding-box centre of `keys` along `direction` and
/// returns the first triangle hit. `None` when the set is empty or the ray
/// misses the mesh.
///
/// Keys without a point map entry are left out of the box with a warning.
pub fn choose_seed_facet(
    ctx: &MeshContext,
    keys: &FxHashSet<PositionKey>,
    direction: &Vector3<f64>,
) -> Result<Option<SeedFacet>> {
    let points = ctx.point_map();
    let mut bbox = Aabb::empty();
    for &key in keys {
        match points.position(key) {
            Ok(p) => bbox.expand(&p),
            Err(err) => tracing::warn!(%err, "ignoring key outside the mesh"),
        }
    }
    if bbox.is_empty() {
        tracing::debug!("no candidate vertices, no seed facet");
        return Ok(None);
    }

    let origin = bbox.center();
    let Some(hit) = ctx.raycast(&origin, direction) else {
        tracing::debug!(?origin, ?direction, "seed ray missed the mesh");
        return Ok(None);
    };

    Ok(Some(SeedFacet {
        keys: ctx.triangle_keys(hit.face)?,
        face: hit.face,
    }))
}

/// Region grown from a seed facet and the boundary it stopped at.
#[derive(Debug, Clone)]
pub struct BoundaryEdge {
    pub spread: Spread<PositionKey>,
    /// Coordinates of the frontier, sorted by key.
    pub points: Vec<Point3<f64>>,
}

impl BoundaryEdge {
    pub fn keys(&self) -> &FxHashSet<PositionKey> {
        &self.spread.frontier
    }
}

/// Grows from the seed facet, never entering `stop_set`. The neighbours that
/// were refused form the boundary.
pub fn edge_points(ctx: &MeshContext, seed: &SeedFacet, stop_set: &FxHashSet<PositionKey>) -> BoundaryEdge {
    let spread = ctx.spread_vertices(seed.keys, |_, neighbor| !stop_set.contains(&neighbor));

    let mut keys: Vec<PositionKey> = spread.frontier.iter().copied().collect();
    keys.sort_unstable();
    let points = keys.into_iter().map(|k| k.to_point()).collect();

    BoundaryEdge { spread, points }
}

/// Everything the resolver derived for one extraction.
#[derive(Debug, Clone)]
pub struct ResolvedBoundary {
    pub classification: Classification,
    pub seed: SeedFacet,
    pub edge: BoundaryEdge,
}

/// Runs classification, seed selection and edge extraction.
///
/// Returns `Ok(None)` when nothing was classified, the seed ray found no
/// triangle, or growth from the seed never reached the background (fewer
/// than three boundary vertices); all are expected for some scan and cloud
/// alignments.
pub fn resolve_boundary(
    ctx: &MeshContext,
    region_cloud: &PointCloud,
    background_cloud: &PointCloud,
    direction: &Vector3<f64>,
    config: &ExtractionConfig,
) -> Result<Option<ResolvedBoundary>> {
    config.validate()?;
    region_cloud.validate()?;
    background_cloud.validate()?;
    if direction.norm_squared() == 0.0 || !direction.iter().all(|v| v.is_finite()) {
        return Err(Error::invalid("direction", "must be a finite, non-zero vector"));
    }

    ctx.ensure_built();
    let classification = classify(
        ctx,
        region_cloud,
        background_cloud,
        config.region_radius,
        config.background_radius,
    )?;

    let Some(seed) = choose_seed_facet(ctx, &classification.candidates, direction)? else {
        return Ok(None);
    };

    let edge = edge_points(ctx, &seed, &classification.background);
    if edge.points.len() < 3 {
        // growth never met the background, so nothing encloses the region
        tracing::debug!(
            region = edge.spread.visited.len(),
            boundary = edge.points.len(),
            "region is not enclosed by background, no boundary"
        );
        return Ok(None);
    }
    tracing::info!(
        candidates = classification.candidates.len(),
        region = edge.spread.visited.len(),
        boundary = edge.points.len(),
        face = seed.face,
        "resolved boundary"
    );

    Ok(Some(ResolvedBoundary {
        classification,
        seed,
        edge,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use marginline_topology::Mesh;

    fn plane() -> MeshContext {
        MeshContext::new(Mesh::grid(8, 1.0)).unwrap()
    }

    fn key(x: f32, y: f32) -> PositionKey {
        PositionKey::new(x, y, 0.0)
    }

    #[test]
    fn fdi_arches() {
        assert_eq!(ScanArch::from_fdi(11).unwrap(), ScanArch::Upper);
        assert_eq!(ScanArch::from_fdi(28).unwrap(), ScanArch::Upper);
        assert_eq!(ScanArch::from_fdi(36).unwrap(), ScanArch::Lower);
        assert_eq!(ScanArch::from_fdi(48).unwrap(), ScanArch::Lower);
        assert_eq!(ScanArch::from_fdi(55).unwrap(), ScanArch::Upper);
        assert_eq!(ScanArch::from_fdi(84).unwrap(), ScanArch::Lower);
        for bad in [0, 10, 19, 49, 56, 91] {
            assert!(matches!(ScanArch::from_fdi(bad), Err(Error::InvalidTooth(_))));
        }
        assert_eq!(ScanArch::Upper.seed_direction(), -Vector3::z());
    }

    #[test]
    fn candidates_are_region_minus_background() {
        let ctx = plane();
        let region = PointCloud::from_arrays(&[[2.0, 2.0, 0.0], [3.0, 2.0, 0.0]]);
        let background = PointCloud::from_arrays(&[[3.0, 2.0, 0.0]]);
        let c = classify(&ctx, &region, &background, 1.0, 0.5).unwrap();

        assert!(c.candidates.is_subset(&c.region));
        assert!(c.candidates.is_disjoint(&c.background));
        assert!(c.candidates.contains(&key(2.0, 2.0)));
        assert!(!c.candidates.contains(&key(3.0, 2.0)));
        assert_eq!(c.background.len(), 1);
    }

    #[test]
    fn empty_clouds_classify_nothing() {
        let c = classify(&plane(), &PointCloud::new(), &PointCloud::new(), 0.8, 0.4).unwrap();
        assert!(c.region.is_empty() && c.candidates.is_empty());
    }

    /// Surface rising along x, so box centres sit above it.
    fn ramp() -> MeshContext {
        MeshContext::new(Mesh::height_field(8, 1.0, |x, _| 0.1 * x * x)).unwrap()
    }

    fn ramp_keys(ctx: &MeshContext, xy: &[(f64, f64)]) -> FxHashSet<PositionKey> {
        ctx.point_map()
            .keys()
            .filter(|k| {
                let p = k.to_point();
                xy.iter().any(|&(x, y)| p.x == x && p.y == y)
            })
            .collect()
    }

    #[test]
    fn seed_ray_hits_first_triangle() {
        let ctx = ramp();
        let keys = ramp_keys(&ctx, &[(2.0, 2.0), (4.0, 2.0), (2.0, 5.0)]);
        assert_eq!(keys.len(), 3);

        // centre (3, 3.5, 1.0) sits above the ramp
        let dir = Vector3::new(0.3, 0.1, -1.0);
        let seed = choose_seed_facet(&ctx, &keys, &dir).unwrap().unwrap();
        let mut corners: Vec<(f64, f64)> = seed
            .keys
            .iter()
            .map(|k| (k.to_point().x, k.to_point().y))
            .collect();
        corners.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(corners, vec![(3.0, 3.0), (3.0, 4.0), (4.0, 4.0)]);
        assert_eq!(ctx.triangle_keys(seed.face).unwrap(), seed.keys);
    }

    #[test]
    fn missed_ray_is_not_an_error() {
        let ctx = ramp();
        let keys = ramp_keys(&ctx, &[(2.0, 2.0), (4.0, 2.0), (2.0, 5.0)]);
        assert!(choose_seed_facet(&ctx, &keys, &Vector3::z()).unwrap().is_none());
        assert!(choose_seed_facet(&ctx, &FxHashSet::default(), &Vector3::z())
            .unwrap()
            .is_none());
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let ctx = plane();
        let keys: FxHashSet<_> = [PositionKey::new(0.5, 0.5, 7.0)].into_iter().collect();
        assert!(choose_seed_facet(&ctx, &keys, &Vector3::z()).unwrap().is_none());
    }

    #[test]
    fn edge_points_stop_at_ring() {
        let ctx = plane();
        // ring of blocked vertices around (4, 4)
        let mut ring = FxHashSet::default();
        for i in 2..=6 {
            for j in 2..=6 {
                if i == 2 || i == 6 || j == 2 || j == 6 {
                    ring.insert(key(i as f32, j as f32));
                }
            }
        }
        let seed = SeedFacet {
            keys: [key(4.0, 4.0), key(5.0, 4.0), key(5.0, 5.0)],
            face: 0,
        };
        let edge = edge_points(&ctx, &seed, &ring);

        assert_eq!(edge.spread.visited.len(), 9);
        assert!(edge.keys().is_subset(&ring));
        assert_eq!(edge.points.len(), edge.keys().len());
        let mut sorted = edge.points.clone();
        sorted.sort_by(|a, b| PositionKey::from_point(a).cmp(&PositionKey::from_point(b)));
        assert_eq!(sorted, edge.points);
    }

    #[test]
    fn negative_radius_is_rejected() {
        let ctx = plane();
        let cloud = PointCloud::from_arrays(&[[2.0, 2.0, 0.0]]);
        let err = classify(&ctx, &cloud, &PointCloud::new(), -1.0, 0.4).unwrap_err();
        assert!(matches!(err, Error::InvalidParameter { name: "region_radius", .. }));
        let err = classify(&ctx, &cloud, &PointCloud::new(), 0.8, f64::NAN).unwrap_err();
        assert!(matches!(err, Error::InvalidParameter { name: "background_radius", .. }));
        assert!(points_near_cloud(&ctx, &cloud, -0.5).is_err());
        assert_eq!(points_near_cloud(&ctx, &cloud, 0.0).unwrap().len(), 1);
    }

    #[test]
    fn unenclosed_region_has_no_boundary() {
        let ctx = ramp();
        let keys = ramp_keys(&ctx, &[(2.0, 2.0), (4.0, 2.0), (2.0, 5.0)]);
        let region: PointCloud = keys.iter().map(|k| k.to_point()).collect();
        let config = ExtractionConfig {
            region_radius: 0.0,
            ..Default::default()
        };

        // the seed is found, but with no background growth covers the mesh
        let dir = Vector3::new(0.3, 0.1, -1.0);
        assert!(choose_seed_facet(&ctx, &keys, &dir).unwrap().is_some());
        let out = resolve_boundary(&ctx, &region, &PointCloud::new(), &dir, &config).unwrap();
        assert!(out.is_none());
    }

    #[test]
    fn zero_direction_is_rejected() {
        let ctx = plane();
        let cloud = PointCloud::from_arrays(&[[1.0, 1.0, 0.0]]);
        let err = resolve_boundary(&ctx, &cloud, &PointCloud::new(), &Vector3::zeros(), &ExtractionConfig::default())
            .unwrap_err();
        assert!(matches!(err, Error::InvalidParameter { name: "direction", .. }));
    }
}
