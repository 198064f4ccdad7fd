// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # Marginline Boundary
//!
//! Extracts a region boundary from a scanned surface and turns it into a
//! closed curve.
//!
//! Two entry points:
//!
//! - [`extract_margin_curve`]: from a region cloud and a background cloud
//!   (for example a segmentation model's output) to an ordered margin line,
//! - [`extract_region_from_margin`]: from an existing margin line to the
//!   enclosed vertices.
//!
//! ```no_run
//! use marginline_boundary::{extract_margin_curve, ExtractionConfig, PredictedSamples, ScanArch};
//! use marginline_topology::{Mesh, MeshContext};
//!
//! # fn run(mesh: Mesh, json: &str) -> marginline_boundary::Result<()> {
//! let ctx = MeshContext::new(mesh)?;
//! let (region, background) = PredictedSamples::from_json(json)?.into_clouds();
//! let direction = ScanArch::from_fdi(16)?.seed_direction();
//! if let Some(margin) = extract_margin_curve(&ctx, &region, &background, &direction, &ExtractionConfig::default())? {
//!     println!("{} points, length {:.2}", margin.curve.len(), margin.curve.length());
//! }
//! # Ok(())
//! # }
//! ```

pub mod cloud;
pub mod config;
pub mod curve;
pub mod error;
pub mod margin;
pub mod pipeline;
pub mod resolver;
pub mod sequence;

pub use cloud::{Membership, PointCloud, PredictedSamples, Sample};
pub use config::ExtractionConfig;
pub use curve::{project_onto_mesh, resample_closed, smooth_closed, ClosedCurve};
pub use error::{Error, Result};
pub use margin::{extract_region_from_margin, MarginRegion};
pub use pipeline::{extract_margin_curve, MarginCurve};
pub use resolver::{
    choose_seed_facet, classify, edge_points, resolve_boundary, BoundaryEdge, Classification,
    ResolvedBoundary, ScanArch, SeedFacet,
};
pub use sequence::{
    decimate_uniform, minimum_spanning_order, order_points, refine_order, sequence_closed,
    total_length, tour_length,
};
