//! Input validation
//!
//! All checks run before any geometry is built. There is no recovery: the
//! first failed check ends the run.

use crate::error::{CorridorError, Result};
use crate::network::StreamNetwork;
use crate::params::{CorridorParams, ThresholdPolicy, TierThresholds};
use floodplain_core::{CrsKind, Raster};
use tracing::warn;

/// Check the network and DEM against the structural preconditions.
///
/// 1. Parameters are consistent.
/// 2. The network CRS is known and projected.
/// 3. The DEM CRS, when present, is projected and matches the network.
/// 4. The network has more than `min_segments` segments.
pub fn validate_inputs(network: &StreamNetwork, dem: &Raster<f64>, params: &CorridorParams) -> Result<()> {
    params.validate()?;

    let crs = network.crs().ok_or_else(|| {
        CorridorError::InvalidCoordinateSystem("stream network has no coordinate system".into())
    })?;
    match crs.kind() {
        CrsKind::Projected => {}
        CrsKind::Geographic => {
            return Err(CorridorError::InvalidCoordinateSystem(format!(
                "stream network uses {} with angular units; reproject it to a projected system",
                crs.identifier()
            )))
        }
        CrsKind::Unknown => {
            return Err(CorridorError::InvalidCoordinateSystem(format!(
                "cannot tell whether {} is projected",
                crs.identifier()
            )))
        }
    }

    match dem.crs() {
        Some(dem_crs) if dem_crs.kind() == CrsKind::Geographic => {
            return Err(CorridorError::InvalidCoordinateSystem(format!(
                "DEM uses {} with angular units",
                dem_crs.identifier()
            )));
        }
        Some(dem_crs) if dem_crs.epsg().is_some() && crs.epsg().is_some() && !dem_crs.is_equivalent(crs) => {
            return Err(CorridorError::InvalidCoordinateSystem(format!(
                "DEM is in {} but the network is in {}",
                dem_crs.identifier(),
                crs.identifier()
            )));
        }
        Some(_) => {}
        None => warn!("DEM has no coordinate system; assuming it matches {}", crs.identifier()),
    }

    if network.len() <= params.min_segments {
        return Err(CorridorError::InsufficientSegmentation {
            count: network.len(),
            minimum: params.min_segments,
        });
    }

    Ok(())
}

/// Check the sampled drainage areas against the tier thresholds.
///
/// The minimum must lie below the low threshold. Under
/// [`ThresholdPolicy::Strict`] the maximum must also reach past both
/// thresholds.
pub fn validate_drainage_range(
    drainage_areas: &[f64],
    thresholds: &TierThresholds,
    policy: ThresholdPolicy,
) -> Result<()> {
    let (min, max) = drainage_areas
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    if drainage_areas.is_empty() {
        return Err(CorridorError::ThresholdRangeError("no drainage area values were sampled".into()));
    }

    if min >= thresholds.low_da {
        return Err(CorridorError::ThresholdRangeError(format!(
            "minimum drainage area {} km2 is not below the low threshold {} km2",
            min, thresholds.low_da
        )));
    }

    if policy == ThresholdPolicy::Strict && (max <= thresholds.low_da || max <= thresholds.high_da) {
        return Err(CorridorError::ThresholdRangeError(format!(
            "maximum drainage area {} km2 does not exceed both thresholds ({} / {} km2)",
            max, thresholds.low_da, thresholds.high_da
        )));
    }

    Ok(())
}
