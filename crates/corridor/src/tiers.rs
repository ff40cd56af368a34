//! Tiered corridor builder
//!
//! Every tier present in the network goes through the same steps:
//! buffer its segments, clip the slope surface to the buffer, admit cells
//! at or below the tier's slope threshold, polygonize the admitted cells.
//! The first three steps live in the raster layer ([`tier_mask`]); the
//! single `polygonize` call hands the result to the vector layer.

use crate::classify::ClassifiedNetwork;
use crate::engine::Engine;
use crate::error::{CorridorError, Result};
use crate::execution::ProcessingMode;
use crate::network::StreamNetwork;
use crate::params::{TierParameters, TierThresholds};
use floodplain_algorithms::mask::ReclassifyParams;
use floodplain_core::Raster;
use geo::{Geometry, MultiPolygon};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

/// Drainage-area class of a segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TierKind {
    Small,
    Medium,
    Large,
}

impl TierKind {
    /// All tiers, largest first
    pub const ALL: [TierKind; 3] = [TierKind::Large, TierKind::Medium, TierKind::Small];

    /// Tier of a drainage area: Small `[0, low)`, Medium `[low, high)`,
    /// Large `[high, inf)`. A value on a threshold belongs to the tier that
    /// starts there.
    pub fn classify(drainage_area: f64, thresholds: &TierThresholds) -> TierKind {
        if drainage_area >= thresholds.high_da {
            TierKind::Large
        } else if drainage_area >= thresholds.low_da {
            TierKind::Medium
        } else {
            TierKind::Small
        }
    }
}

impl fmt::Display for TierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            TierKind::Small => "small",
            TierKind::Medium => "medium",
            TierKind::Large => "large",
        })
    }
}

/// One tier as data: what to build and which segments it covers
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tier {
    pub kind: TierKind,
    /// Buffer distance (m)
    pub buffer: f64,
    /// Highest admitted slope (degrees)
    pub slope_threshold: f64,
    /// Half-open drainage-area interval `[lo, hi)` in km²
    pub da_range: (f64, f64),
}

impl Tier {
    pub fn new(kind: TierKind, params: TierParameters, thresholds: &TierThresholds) -> Self {
        let da_range = match kind {
            TierKind::Small => (0.0, thresholds.low_da),
            TierKind::Medium => (thresholds.low_da, thresholds.high_da),
            TierKind::Large => (thresholds.high_da, f64::INFINITY),
        };
        Self {
            kind,
            buffer: params.buffer,
            slope_threshold: params.slope,
            da_range,
        }
    }

    pub fn contains(&self, drainage_area: f64) -> bool {
        drainage_area >= self.da_range.0 && drainage_area < self.da_range.1
    }
}

/// What one tier contributed
#[derive(Debug, Clone, PartialEq)]
pub enum TierOutcome {
    Built { kind: TierKind, polygon: MultiPolygon<f64> },
    /// No cell passed the slope test
    Empty { kind: TierKind },
}

impl TierOutcome {
    pub fn kind(&self) -> TierKind {
        match self {
            TierOutcome::Built { kind, .. } | TierOutcome::Empty { kind } => *kind,
        }
    }

    pub fn polygon(&self) -> Option<&MultiPolygon<f64>> {
        match self {
            TierOutcome::Built { polygon, .. } => Some(polygon),
            TierOutcome::Empty { .. } => None,
        }
    }
}

/// Raster layer of a tier: slope clipped to `region`, admitted cells 1,
/// everything else no-data.
pub fn tier_mask<E: Engine + ?Sized>(
    engine: &E,
    slope: &Raster<f64>,
    region: &MultiPolygon<f64>,
    slope_threshold: f64,
) -> Result<Raster<f64>> {
    let clipped = engine.clip(slope, region)?;
    Ok(engine.reclassify(&clipped, &ReclassifyParams::at_or_below(slope_threshold, 1.0))?)
}

/// Build the valley mask polygon of one tier.
///
/// Returns `EmptyTierResult` when nothing is admitted.
pub fn build_tier<E: Engine + ?Sized>(
    engine: &E,
    tier: &Tier,
    network: &StreamNetwork,
    segments: &[usize],
    slope: &Raster<f64>,
) -> Result<MultiPolygon<f64>> {
    let lines = Geometry::MultiLineString(network.lines(segments.iter().copied()));
    let region = engine.buffer(&lines, tier.buffer)?;
    if region.0.is_empty() {
        return Err(CorridorError::EmptyTierResult(tier.kind));
    }

    let mask = tier_mask(engine, slope, &region, tier.slope_threshold)?;
    let polygon = engine.polygonize(&mask, true)?;
    debug!(
        "{} tier: {} segments, {} polygon parts",
        tier.kind,
        segments.len(),
        polygon.0.len()
    );

    if polygon.0.is_empty() {
        return Err(CorridorError::EmptyTierResult(tier.kind));
    }
    Ok(polygon)
}

/// Build every tier that has segments.
///
/// Tiers are independent and run under `mode`. An empty tier is reported
/// as [`TierOutcome::Empty`]; any other failure aborts.
pub fn build_tiers<E: Engine + ?Sized>(
    engine: &E,
    tiers: &[Tier],
    network: &StreamNetwork,
    classified: &ClassifiedNetwork,
    slope: &Raster<f64>,
    mode: ProcessingMode,
) -> Result<Vec<TierOutcome>> {
    let present: Vec<(Tier, Vec<usize>)> = tiers
        .iter()
        .map(|tier| (*tier, classified.indices_in(tier.kind)))
        .filter(|(_, segments)| !segments.is_empty())
        .collect();

    mode.try_map(present.len(), |i| {
        let (tier, segments) = &present[i];
        match build_tier(engine, tier, network, segments, slope) {
            Ok(polygon) => Ok(TierOutcome::Built {
                kind: tier.kind,
                polygon,
            }),
            Err(CorridorError::EmptyTierResult(kind)) => {
                warn!("{} tier admitted no terrain; the minimum buffer still covers it", kind);
                Ok(TierOutcome::Empty { kind })
            }
            Err(e) => Err(e),
        }
    })
}

/// Unconditional buffer around the whole network
pub fn minimum_buffer<E: Engine + ?Sized>(engine: &E, network: &StreamNetwork, distance: f64) -> Result<MultiPolygon<f64>> {
    Ok(engine.buffer(&Geometry::MultiLineString(network.geometry()), distance)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::ClassifiedSegment;
    use crate::engine::NativeEngine;
    use crate::network::{Segment, SegmentId};
    use crate::params::CorridorParams;
    use floodplain_core::GeoTransform;
    use geo::{line_string, Area, MultiLineString};

    #[test]
    fn test_classify_boundaries() {
        let t = TierThresholds::default();
        assert_eq!(TierKind::classify(0.0, &t), TierKind::Small);
        assert_eq!(TierKind::classify(24.0, &t), TierKind::Small);
        assert_eq!(TierKind::classify(25.0, &t), TierKind::Medium);
        assert_eq!(TierKind::classify(249.0, &t), TierKind::Medium);
        assert_eq!(TierKind::classify(250.0, &t), TierKind::Large);
        assert_eq!(TierKind::classify(1e6, &t), TierKind::Large);
    }

    #[test]
    fn test_tier_record_agrees_with_classify() {
        let params = CorridorParams::default();
        for da in [0.0, 10.0, 24.0, 25.0, 100.0, 249.0, 250.0, 5000.0] {
            let owners: Vec<TierKind> = params.tiers().iter().filter(|t| t.contains(da)).map(|t| t.kind).collect();
            assert_eq!(owners, vec![TierKind::classify(da, &params.thresholds)]);
        }
    }

    fn flat_slope(value: f64) -> Raster<f64> {
        let mut r = Raster::filled(40, 40, value);
        r.set_transform(GeoTransform::new(0.0, 400.0, 10.0, -10.0));
        r
    }

    fn one_segment() -> (StreamNetwork, ClassifiedNetwork) {
        let network = StreamNetwork::new(
            vec![Segment::new(
                "s0",
                MultiLineString::new(vec![line_string![(x: 100.0, y: 200.0), (x: 300.0, y: 200.0)]]),
            )],
            None,
        );
        let classified = ClassifiedNetwork::new(vec![ClassifiedSegment {
            index: 0,
            id: SegmentId("s0".into()),
            drainage_area: 5,
            tier: TierKind::Small,
        }]);
        (network, classified)
    }

    #[test]
    fn test_gentle_terrain_fills_buffer() {
        let (network, classified) = one_segment();
        let tiers = CorridorParams::default().tiers();
        let out = build_tiers(
            &NativeEngine::new(),
            &tiers,
            &network,
            &classified,
            &flat_slope(3.0),
            ProcessingMode::Sequential,
        )
        .unwrap();

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].kind(), TierKind::Small);
        let area = out[0].polygon().unwrap().unsigned_area();
        let exact = 200.0 * 200.0 + std::f64::consts::PI * 100.0 * 100.0;
        assert!((area - exact).abs() < 0.05 * exact, "area {} vs {}", area, exact);
    }

    #[test]
    fn test_steep_terrain_gives_empty_tier() {
        let (network, classified) = one_segment();
        let tiers = CorridorParams::default().tiers();
        let out = build_tiers(
            &NativeEngine::new(),
            &tiers,
            &network,
            &classified,
            &flat_slope(12.01),
            ProcessingMode::Parallel,
        )
        .unwrap();
        assert_eq!(out, vec![TierOutcome::Empty { kind: TierKind::Small }]);
    }

    #[test]
    fn test_threshold_slope_admitted() {
        let (network, classified) = one_segment();
        let tiers = CorridorParams::default().tiers();
        let out = build_tiers(
            &NativeEngine::new(),
            &tiers,
            &network,
            &classified,
            &flat_slope(12.0),
            ProcessingMode::Sequential,
        )
        .unwrap();
        assert!(out[0].polygon().is_some());
    }
}
