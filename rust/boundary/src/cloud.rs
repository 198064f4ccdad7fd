// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Unordered sample clouds, typically produced by a segmentation model.

use nalgebra::Point3;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Which side of the boundary a sample was predicted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Membership {
    Region,
    Background,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub point: Point3<f64>,
    pub membership: Option<Membership>,
}

/// Unordered collection of 3D samples.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointCloud {
    samples: Vec<Sample>,
}

impl PointCloud {
    /// Empty cloud.
    pub fn new() -> Self {
        Self::default()
    }

    /// Untagged cloud from `[x, y, z]` triples.
    pub fn from_arrays(points: &[[f64; 3]]) -> Self {
        points.iter().map(|p| Point3::from(*p)).collect()
    }

    /// Untagged cloud from a flat `x, y, z, x, y, z, ...` buffer.
    pub fn from_flat(coords: &[f64]) -> Result<Self> {
        if coords.len() % 3 != 0 {
            return Err(Error::invalid(
                "coords",
                format!("length {} is not a multiple of 3", coords.len()),
            ));
        }
        Ok(coords
            .chunks_exact(3)
            .map(|c| Point3::new(c[0], c[1], c[2]))
            .collect())
    }

    /// Appends one sample.
    pub fn push(&mut self, point: Point3<f64>, membership: Option<Membership>) {
        self.samples.push(Sample { point, membership });
    }

    /// Tags every sample with `membership`.
    pub fn with_membership(mut self, membership: Membership) -> Self {
        for s in &mut self.samples {
            s.membership = Some(membership);
        }
        self
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Returns `true` if the cloud has no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// All samples in insertion order.
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Coordinates of every sample.
    pub fn points(&self) -> impl Iterator<Item = &Point3<f64>> + '_ {
        self.samples.iter().map(|s| &s.point)
    }

    /// Samples tagged with `membership`.
    pub fn filter(&self, membership: Membership) -> PointCloud {
        PointCloud {
            samples: self
                .samples
                .iter()
                .filter(|s| s.membership == Some(membership))
                .copied()
                .collect(),
        }
    }

    /// Samples of `self` whose coordinates do not exactly match any sample of
    /// `other`. Duplicates within `self` collapse to their first occurrence.
    pub fn difference(&self, other: &PointCloud) -> PointCloud {
        let exclude: FxHashSet<[u64; 3]> = other.points().map(bits).collect();
        let mut seen = FxHashSet::default();
        PointCloud {
            samples: self
                .samples
                .iter()
                .filter(|s| {
                    let key = bits(&s.point);
                    !exclude.contains(&key) && seen.insert(key)
                })
                .copied()
                .collect(),
        }
    }

    /// Fails on NaN or infinite coordinates.
    pub fn validate(&self) -> Result<()> {
        if let Some(i) = self
            .samples
            .iter()
            .position(|s| !s.point.coords.iter().all(|v| v.is_finite()))
        {
            return Err(Error::invalid("point_cloud", format!("sample {i} is not finite")));
        }
        Ok(())
    }
}

fn bits(p: &Point3<f64>) -> [u64; 3] {
    // +0.0 and -0.0 compare equal
    let norm = |v: f64| if v == 0.0 { 0.0f64.to_bits() } else { v.to_bits() };
    [norm(p.x), norm(p.y), norm(p.z)]
}

impl FromIterator<Point3<f64>> for PointCloud {
    fn from_iter<I: IntoIterator<Item = Point3<f64>>>(iter: I) -> Self {
        PointCloud {
            samples: iter
                .into_iter()
                .map(|point| Sample {
                    point,
                    membership: None,
                })
                .collect(),
        }
    }
}

/// Segmentation output: every sample of the jaw plus the subset predicted to
/// belong to the region.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PredictedSamples {
    #[serde(rename = "jaw_points", default)]
    pub all_points: Vec<[f64; 3]>,
    #[serde(rename = "abutment_points", default)]
    pub region_points: Vec<[f64; 3]>,
}

impl PredictedSamples {
    /// Parses the segmentation output JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Splits into `(region, background)`, where background is every jaw
    /// sample that is not also a region sample.
    pub fn into_clouds(self) -> (PointCloud, PointCloud) {
        let region = PointCloud::from_arrays(&self.region_points).with_membership(Membership::Region);
        let background = PointCloud::from_arrays(&self.all_points)
            .difference(&region)
            .with_membership(Membership::Background);
        (region, background)
    }
}
