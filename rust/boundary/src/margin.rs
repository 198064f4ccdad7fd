// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Region extraction from a known margin line.
//!
//! The margin is resampled densely and every sample marks the corners of
//! its closest triangle as a barrier. A ray from the middle of the margin
//! along the tooth axis finds a triangle on the region side, and growth
//! from there stops at the barrier.

use marginline_topology::{Aabb, MeshContext, PositionKey};
use nalgebra::{Point3, Vector3};
use rayon::prelude::*;
use rustc_hash::FxHashSet;

use crate::config::ExtractionConfig;
use crate::curve::resample_closed;
use crate::error::{Error, Result};
use crate::resolver::SeedFacet;

/// Vertices enclosed by a margin line.
#[derive(Debug, Clone)]
pub struct MarginRegion {
    /// Barrier, seed corners and every vertex grown between them.
    pub region: FxHashSet<PositionKey>,
    /// Corners of the triangles the margin passes over.
    pub barrier: FxHashSet<PositionKey>,
    pub seed: SeedFacet,
}

/// Corner keys of the closest triangle to each point.
pub fn barrier_from_curve(ctx: &MeshContext, samples: &[Point3<f64>]) -> Result<FxHashSet<PositionKey>> {
    ctx.ensure_built();
    let bvh = ctx.bvh();
    let faces: FxHashSet<usize> = samples
        .par_iter()
        .filter_map(|p| bvh.closest_point(p).map(|hit| hit.face))
        .collect();

    let mut barrier = FxHashSet::default();
    for face in faces {
        barrier.extend(ctx.triangle_keys(face)?);
    }
    Ok(barrier)
}

/// Extracts the region enclosed by the closed `margin` curve.
///
/// `axis` points from the margin towards the region (the crown). Returns
/// `Ok(None)` when the margin is empty, the axis ray misses, or the hit
/// triangle faces away from the axis.
pub fn extract_region_from_margin(
    ctx: &MeshContext,
    margin: &[Point3<f64>],
    axis: &Vector3<f64>,
    config: &ExtractionConfig,
) -> Result<Option<MarginRegion>> {
    config.validate()?;
    if axis.norm_squared() == 0.0 || !axis.iter().all(|v| v.is_finite()) {
        return Err(Error::invalid("axis", "must be a finite, non-zero vector"));
    }
    if let Some(i) = margin.iter().position(|p| !p.coords.iter().all(|v| v.is_finite())) {
        return Err(Error::invalid("margin", format!("point {i} is not finite")));
    }
    if margin.is_empty() {
        return Ok(None);
    }

    let dense = resample_closed(margin, config.margin_samples);
    let mut barrier = barrier_from_curve(ctx, &dense)?;

    let center = Aabb::from_points(margin).center();
    let Some(hit) = ctx.raycast(&center, axis) else {
        tracing::debug!(?center, "margin axis ray missed the mesh");
        return Ok(None);
    };
    if hit.normal.dot(axis) <= 0.0 {
        tracing::debug!(face = hit.face, "margin axis ray hit a back face");
        return Ok(None);
    }

    let seed = SeedFacet {
        keys: ctx.triangle_keys(hit.face)?,
        face: hit.face,
    };
    barrier.extend(seed.keys);

    let spread = ctx.spread_vertices(seed.keys, |_, neighbor| !barrier.contains(&neighbor));

    let mut region = barrier.clone();
    region.extend(spread.visited);

    tracing::info!(
        samples = dense.len(),
        barrier = barrier.len(),
        region = region.len(),
        "extracted region from margin"
    );
    Ok(Some(MarginRegion { region, barrier, seed }))
}
