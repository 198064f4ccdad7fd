// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! End-to-end extraction: clouds in, closed margin curve out.

use std::time::Instant;

use marginline_topology::{MeshContext, PositionKey};
use nalgebra::Vector3;
use rustc_hash::FxHashSet;

use crate::cloud::PointCloud;
use crate::config::ExtractionConfig;
use crate::curve::ClosedCurve;
use crate::error::Result;
use crate::resolver::{resolve_boundary, SeedFacet};
use crate::sequence::sequence_closed;

/// Result of [`extract_margin_curve`].
#[derive(Debug, Clone)]
pub struct MarginCurve {
    pub curve: ClosedCurve,
    /// Boundary vertices the curve was sequenced from.
    pub boundary: FxHashSet<PositionKey>,
    /// Vertices enclosed by the boundary.
    pub region: FxHashSet<PositionKey>,
    pub seed: SeedFacet,
}

/// Resolves the boundary between the two clouds on the mesh and orders it
/// into a closed curve, then applies the optional smoothing, resampling and
/// projection steps of `config`.
///
/// `Ok(None)` means no boundary was found for this alignment.
pub fn extract_margin_curve(
    ctx: &MeshContext,
    region_cloud: &PointCloud,
    background_cloud: &PointCloud,
    direction: &Vector3<f64>,
    config: &ExtractionConfig,
) -> Result<Option<MarginCurve>> {
    let start = Instant::now();
    let Some(resolved) = resolve_boundary(ctx, region_cloud, background_cloud, direction, config)? else {
        return Ok(None);
    };

    let ordered = sequence_closed(&resolved.edge.points, config.max_refine_iterations);
    let mut curve = ClosedCurve::new(ordered);
    if config.smoothing_iterations > 0 {
        curve = curve.smoothed(config.smoothing_iterations, config.smoothing_factor);
    }
    if let Some(count) = config.resample_count {
        curve = curve.resampled(count);
    }
    if config.project_to_surface {
        curve = curve.projected(ctx);
    }

    tracing::info!(
        points = curve.len(),
        length = curve.length(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "extracted margin curve"
    );

    let edge = resolved.edge;
    Ok(Some(MarginCurve {
        curve,
        boundary: edge.spread.frontier,
        region: edge.spread.visited,
        seed: resolved.seed,
    }))
}
