//! Pipeline parameters
//!
//! Every field has a default, so a TOML file only needs the values it
//! changes:
//!
//! ```toml
//! minimum_buffer = 25.0
//!
//! [thresholds]
//! low_da = 30.0
//!
//! [small]
//! buffer = 120.0
//! slope = 11.0
//! ```

use crate::error::{CorridorError, Result};
use crate::tiers::{Tier, TierKind};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Drainage-area thresholds (km²) splitting segments into tiers
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TierThresholds {
    /// Small below, Medium from here
    pub low_da: f64,
    /// Large from here
    pub high_da: f64,
}

impl Default for TierThresholds {
    fn default() -> Self {
        Self {
            low_da: 25.0,
            high_da: 250.0,
        }
    }
}

/// Buffer distance (m) and slope admission threshold (degrees) of one tier
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TierParameters {
    pub buffer: f64,
    pub slope: f64,
}

impl TierParameters {
    pub const fn new(buffer: f64, slope: f64) -> Self {
        Self { buffer, slope }
    }
}

/// Cleanup of the merged corridor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregationParameters {
    /// Parts closer than this (m) are merged
    pub distance: f64,
    /// Parts smaller than this (m²) are dropped
    pub min_area: f64,
    /// Holes smaller than this (m²) are filled
    pub min_hole_area: f64,
}

impl Default for AggregationParameters {
    fn default() -> Self {
        Self {
            distance: 100.0,
            min_area: 30_000.0,
            min_hole_area: 50_000.0,
        }
    }
}

/// Boundary smoothing of the final corridor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothingParameters {
    /// Smoothing path length (m)
    pub tolerance: f64,
    /// Keep ring start vertices in place
    pub fixed_endpoints: bool,
}

impl Default for SmoothingParameters {
    fn default() -> Self {
        Self {
            tolerance: 65.0,
            fixed_endpoints: true,
        }
    }
}

/// How strictly the drainage-area range of the network is checked
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdPolicy {
    /// The network must reach both thresholds and dip below the low one
    Strict,
    /// Only the minimum is checked; tiers the network never reaches are
    /// skipped
    #[default]
    AllowPartial,
}

/// All parameters of a corridor run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorridorParams {
    pub thresholds: TierThresholds,
    pub large: TierParameters,
    pub medium: TierParameters,
    pub small: TierParameters,
    /// Unconditional buffer around the whole network (m)
    pub minimum_buffer: f64,
    pub aggregation: AggregationParameters,
    pub smoothing: SmoothingParameters,
    /// Radius of the drainage-area sample circle at segment midpoints (m)
    pub sample_radius: f64,
    /// The network needs more segments than this
    pub min_segments: usize,
    pub threshold_policy: ThresholdPolicy,
}

impl Default for CorridorParams {
    fn default() -> Self {
        Self {
            thresholds: TierThresholds::default(),
            large: TierParameters::new(500.0, 4.0),
            medium: TierParameters::new(200.0, 7.0),
            small: TierParameters::new(100.0, 12.0),
            minimum_buffer: 20.0,
            aggregation: AggregationParameters::default(),
            smoothing: SmoothingParameters::default(),
            sample_radius: 100.0,
            min_segments: 30,
            threshold_policy: ThresholdPolicy::default(),
        }
    }
}

fn non_negative(name: &'static str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(CorridorError::InvalidParameter {
            name,
            reason: format!("must be a non-negative number, got {}", value),
        })
    }
}

impl CorridorParams {
    /// Parse parameters from TOML text; missing fields keep their defaults
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Load parameters from a TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&text)
    }

    /// Parameters of one tier
    pub fn tier(&self, kind: TierKind) -> TierParameters {
        match kind {
            TierKind::Large => self.large,
            TierKind::Medium => self.medium,
            TierKind::Small => self.small,
        }
    }

    /// Tier records, largest first
    pub fn tiers(&self) -> [Tier; 3] {
        TierKind::ALL.map(|kind| Tier::new(kind, self.tier(kind), &self.thresholds))
    }

    /// Check the configuration on its own, before any input is looked at.
    pub fn validate(&self) -> Result<()> {
        let TierThresholds { low_da, high_da } = self.thresholds;
        if !low_da.is_finite() || !high_da.is_finite() || low_da < 0.0 {
            return Err(CorridorError::InvalidParameter {
                name: "thresholds",
                reason: format!("thresholds must be finite and non-negative, got {} / {}", low_da, high_da),
            });
        }
        if low_da >= high_da {
            return Err(CorridorError::ThresholdRangeError(format!(
                "low threshold {} must be below high threshold {}",
                low_da, high_da
            )));
        }

        for kind in TierKind::ALL {
            let tier = self.tier(kind);
            non_negative("buffer", tier.buffer)?;
            if !(0.0..=90.0).contains(&tier.slope) {
                return Err(CorridorError::InvalidParameter {
                    name: "slope",
                    reason: format!("{} tier slope must lie in [0, 90] degrees, got {}", kind, tier.slope),
                });
            }
        }

        non_negative("minimum_buffer", self.minimum_buffer)?;
        non_negative("aggregation.distance", self.aggregation.distance)?;
        non_negative("aggregation.min_area", self.aggregation.min_area)?;
        non_negative("aggregation.min_hole_area", self.aggregation.min_hole_area)?;
        non_negative("sample_radius", self.sample_radius)?;

        let tolerance = self.smoothing.tolerance;
        if !tolerance.is_finite() || tolerance <= 0.0 {
            return Err(CorridorError::InvalidParameter {
                name: "smoothing.tolerance",
                reason: format!("must be positive, got {}", tolerance),
            });
        }
        Ok(())
    }
}
