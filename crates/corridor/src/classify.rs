//! Segment classifier
//!
//! Each segment gets one representative drainage area: the maximum of the
//! drainage-area surface inside a small circle around the segment's
//! midpoint (by length). The maximum keeps a circle that straddles a
//! confluence from picking up the tributary's lower value. The value is
//! truncated to whole km² and decides the tier. It is written back onto the
//! network only once a run has succeeded.

use crate::engine::Engine;
use crate::error::{CorridorError, Result};
use crate::network::{SegmentId, StreamNetwork};
use crate::params::TierThresholds;
use crate::tiers::TierKind;
use floodplain_algorithms::statistics::ZonalStatistic;
use floodplain_algorithms::vector::midpoint_along;
use floodplain_core::Raster;
use geo::{Geometry, MultiPolygon};
use tracing::{debug, warn};

/// Classification of one segment
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedSegment {
    /// Position of the segment in the network
    pub index: usize,
    pub id: SegmentId,
    /// Truncated drainage area, km²
    pub drainage_area: i64,
    pub tier: TierKind,
}

/// Classification of a whole network, in network order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassifiedNetwork {
    segments: Vec<ClassifiedSegment>,
}

impl ClassifiedNetwork {
    pub fn new(segments: Vec<ClassifiedSegment>) -> Self {
        Self { segments }
    }

    pub fn segments(&self) -> &[ClassifiedSegment] {
        &self.segments
    }

    /// Network positions of the segments in a tier
    pub fn indices_in(&self, kind: TierKind) -> Vec<usize> {
        self.segments
            .iter()
            .filter(|s| s.tier == kind)
            .map(|s| s.index)
            .collect()
    }

    /// Stored drainage areas, in network order
    pub fn drainage_areas(&self) -> Vec<f64> {
        self.segments.iter().map(|s| s.drainage_area as f64).collect()
    }

    /// Store each segment's drainage area as `DrainageAreaSqKm`
    pub fn write_to(&self, network: &mut StreamNetwork) {
        for segment in &self.segments {
            network.set_drainage_area(segment.index, segment.drainage_area);
        }
    }

    /// Number of segments per tier, largest tier first
    pub fn tier_counts(&self) -> [(TierKind, usize); 3] {
        TierKind::ALL.map(|kind| (kind, self.segments.iter().filter(|s| s.tier == kind).count()))
    }
}

/// Truncate a sampled drainage area to whole km²
pub fn truncate_drainage_area(value: f64) -> i64 {
    value.trunc() as i64
}

/// Sample circles around segment midpoints; `None` for segments without
/// coordinates.
fn sample_zones<E: Engine + ?Sized>(
    engine: &E,
    network: &StreamNetwork,
    radius: f64,
) -> Result<Vec<Option<MultiPolygon<f64>>>> {
    network
        .segments()
        .iter()
        .map(|segment| {
            midpoint_along(&segment.geometry)
                .map(|mid| engine.buffer(&Geometry::Point(mid), radius))
                .transpose()
                .map_err(Into::into)
        })
        .collect()
}

/// Classify every segment. The network itself is left untouched.
///
/// Every segment must find at least one valid drainage-area cell inside its
/// sample circle; a surface that misses part of the network is an error.
pub fn classify<E: Engine + ?Sized>(
    engine: &E,
    network: &StreamNetwork,
    drainage_area: &Raster<f64>,
    thresholds: &TierThresholds,
    sample_radius: f64,
) -> Result<ClassifiedNetwork> {
    let zones = sample_zones(engine, network, sample_radius)?;

    let (positions, present): (Vec<usize>, Vec<MultiPolygon<f64>>) = zones
        .into_iter()
        .enumerate()
        .filter_map(|(i, z)| z.map(|z| (i, z)))
        .unzip();
    let sampled = engine.zonal_statistic(&present, drainage_area, ZonalStatistic::Max)?;

    let mut values: Vec<Option<f64>> = vec![None; network.len()];
    for (i, v) in positions.into_iter().zip(sampled) {
        values[i] = v;
    }

    let unsampled: Vec<&SegmentId> = values
        .iter()
        .zip(network.segments())
        .filter(|(v, _)| v.is_none())
        .map(|(_, s)| &s.id)
        .collect();
    if !unsampled.is_empty() {
        for id in &unsampled {
            warn!("Segment {} has no drainage area within {} m", id, sample_radius);
        }
        return Err(CorridorError::ThresholdRangeError(format!(
            "{} of {} segments have no drainage area within {} m (first: {}); \
             the drainage-area surface does not cover the network",
            unsampled.len(),
            network.len(),
            sample_radius,
            unsampled[0]
        )));
    }

    let mut segments = Vec::with_capacity(network.len());
    for (index, value) in values.into_iter().enumerate() {
        let id = network.segments()[index].id.clone();
        let da = value.map_or(0, truncate_drainage_area);

        let tier = TierKind::classify(da as f64, thresholds);
        debug!("Segment {}: {} km2, {} tier", id, da, tier);
        segments.push(ClassifiedSegment {
            index,
            id,
            drainage_area: da,
            tier,
        });
    }

    Ok(ClassifiedNetwork::new(segments))
}
