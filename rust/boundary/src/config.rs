// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Numeric parameters of a boundary extraction.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Parameters for [`extract_margin_curve`](crate::pipeline::extract_margin_curve)
/// and its stages. Radii are in the units of the mesh coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExtractionConfig {
    /// Inclusion radius around region samples.
    pub region_radius: f64,
    /// Exclusion radius around background samples.
    pub background_radius: f64,
    /// Cap on 2-opt passes.
    pub max_refine_iterations: usize,
    /// Samples taken along a margin curve when it is turned into a barrier.
    pub margin_samples: usize,
    /// Smoothing passes applied to the sequenced curve (0 disables).
    pub smoothing_iterations: usize,
    /// Blend towards the neighbour midpoint per smoothing pass, in `[0, 1]`.
    pub smoothing_factor: f64,
    /// Resample the final curve to this many evenly spaced points.
    pub resample_count: Option<usize>,
    /// Snap the final curve onto the mesh surface.
    pub project_to_surface: bool,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            region_radius: 0.8,
            background_radius: 0.4,
            max_refine_iterations: 10_000,
            margin_samples: 2000,
            smoothing_iterations: 0,
            smoothing_factor: 0.5,
            resample_count: None,
            project_to_surface: false,
        }
    }
}

impl ExtractionConfig {
    /// Parses a JSON object; missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        check_radius("region_radius", self.region_radius)?;
        check_radius("background_radius", self.background_radius)?;
        if self.margin_samples < 3 {
            return Err(Error::invalid(
                "margin_samples",
                format!("need at least 3 samples, got {}", self.margin_samples),
            ));
        }
        if !(0.0..=1.0).contains(&self.smoothing_factor) {
            return Err(Error::invalid(
                "smoothing_factor",
                format!("{} is outside [0, 1]", self.smoothing_factor),
            ));
        }
        if let Some(count) = self.resample_count {
            if count < 3 {
                return Err(Error::invalid(
                    "resample_count",
                    format!("need at least 3 points, got {count}"),
                ));
            }
        }
        Ok(())
    }
}

fn check_radius(name: &'static str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(Error::invalid(name, format!("{value} is not a finite, non-negative radius")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = ExtractionConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.region_radius, 0.8);
        assert_eq!(config.background_radius, 0.4);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = ExtractionConfig::from_json(r#"{ "region_radius": 1.5, "resample_count": 64 }"#).unwrap();
        assert_eq!(config.region_radius, 1.5);
        assert_eq!(config.resample_count, Some(64));
        assert_eq!(config.background_radius, 0.4);
        assert_eq!(config.max_refine_iterations, 10_000);
    }

    #[test]
    fn unknown_field_is_rejected() {
        let err = ExtractionConfig::from_json(r#"{ "region_radiuss": 1.0 }"#).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn negative_radius_is_rejected() {
        let err = ExtractionConfig::from_json(r#"{ "background_radius": -0.1 }"#).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidParameter {
                name: "background_radius",
                ..
            }
        ));
    }

    #[test]
    fn smoothing_factor_range() {
        let config = ExtractionConfig {
            smoothing_factor: 1.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
