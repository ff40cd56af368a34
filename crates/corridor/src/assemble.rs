//! Corridor assembler
//!
//! Vector layer of the pipeline. Takes the tier polygons and the minimum
//! buffer through merge, connectivity filter, dissolve, aggregate and
//! smooth, then restores the minimum buffer in case smoothing or small
//! part removal cut into it.

use crate::engine::Engine;
use crate::error::Result;
use crate::params::{AggregationParameters, SmoothingParameters};
use crate::tiers::TierOutcome;
use geo::{Geometry, MultiLineString, MultiPolygon, Polygon};
use tracing::debug;

/// Union every built tier polygon with the minimum buffer.
///
/// The result may have several disjoint parts.
pub fn merge<E: Engine + ?Sized>(
    engine: &E,
    tiers: &[TierOutcome],
    floor: &MultiPolygon<f64>,
) -> Result<MultiPolygon<f64>> {
    let parts: Vec<Polygon<f64>> = tiers
        .iter()
        .filter_map(TierOutcome::polygon)
        .chain(std::iter::once(floor))
        .flat_map(|mp| mp.0.iter().cloned())
        .collect();
    Ok(engine.dissolve(&parts)?)
}

/// Keep only the parts that touch the network
pub fn filter_connected<E: Engine + ?Sized>(
    engine: &E,
    merged: &MultiPolygon<f64>,
    network: &MultiLineString<f64>,
) -> Result<Vec<Polygon<f64>>> {
    let kept = engine.select_by_intersection(&merged.0, &Geometry::MultiLineString(network.clone()))?;
    debug!("Connectivity filter kept {} of {} parts", kept.len(), merged.0.len());
    Ok(kept)
}

/// Dissolve the surviving parts into one region without seams
pub fn dissolve<E: Engine + ?Sized>(engine: &E, parts: &[Polygon<f64>]) -> Result<MultiPolygon<f64>> {
    Ok(engine.dissolve(parts)?)
}

/// Merge nearby parts, fill small holes, drop small parts
pub fn aggregate<E: Engine + ?Sized>(
    engine: &E,
    region: &MultiPolygon<f64>,
    params: &AggregationParameters,
) -> Result<MultiPolygon<f64>> {
    let out = engine.aggregate(region, params)?;
    debug!("Aggregation: {} parts -> {}", region.0.len(), out.0.len());
    Ok(out)
}

/// Relax the boundary
pub fn smooth<E: Engine + ?Sized>(
    engine: &E,
    region: &MultiPolygon<f64>,
    params: &SmoothingParameters,
) -> Result<MultiPolygon<f64>> {
    Ok(engine.smooth(region, params)?)
}

/// Union the minimum buffer back in and drop anything that no longer
/// touches the network.
pub fn reassert_floor<E: Engine + ?Sized>(
    engine: &E,
    region: &MultiPolygon<f64>,
    floor: &MultiPolygon<f64>,
    network: &MultiLineString<f64>,
) -> Result<MultiPolygon<f64>> {
    let parts: Vec<Polygon<f64>> = region.0.iter().chain(floor.0.iter()).cloned().collect();
    let restored = engine.dissolve(&parts)?;
    let connected = filter_connected(engine, &restored, network)?;
    Ok(MultiPolygon::new(connected))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::NativeEngine;
    use crate::tiers::TierKind;
    use geo::{line_string, Area, Contains, Coord, Point, Rect};

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> MultiPolygon<f64> {
        MultiPolygon::new(vec![Rect::new(Coord { x: x0, y: y0 }, Coord { x: x1, y: y1 }).to_polygon()])
    }

    fn stream() -> MultiLineString<f64> {
        MultiLineString::new(vec![line_string![(x: 0.0, y: 50.0), (x: 200.0, y: 50.0)]])
    }

    #[test]
    fn test_merge_includes_floor_and_skips_empty_tiers() {
        let engine = NativeEngine::new();
        let tiers = vec![
            TierOutcome::Built {
                kind: TierKind::Small,
                polygon: rect(0.0, 0.0, 100.0, 100.0),
            },
            TierOutcome::Empty { kind: TierKind::Medium },
        ];
        let floor = rect(90.0, 40.0, 200.0, 60.0);
        let merged = merge(&engine, &tiers, &floor).unwrap();
        assert_eq!(merged.0.len(), 1);
        assert!((merged.unsigned_area() - (10_000.0 + 100.0 * 20.0)).abs() < 1e-6);
    }

    #[test]
    fn test_disconnected_parts_removed() {
        let engine = NativeEngine::new();
        let mut merged = rect(0.0, 0.0, 200.0, 100.0);
        merged.0.extend(rect(0.0, 300.0, 100.0, 400.0));

        let kept = filter_connected(&engine, &merged, &stream()).unwrap();
        assert_eq!(kept.len(), 1);
        assert!(kept[0].contains(&Point::new(10.0, 50.0)));
    }

    #[test]
    fn test_floor_reasserted() {
        let engine = NativeEngine::new();
        // A smoothed region that lost a notch over the stream
        let mut region = rect(0.0, 0.0, 90.0, 100.0);
        region.0.extend(rect(110.0, 0.0, 200.0, 100.0).0);
        let floor = rect(-5.0, 45.0, 205.0, 55.0);

        let restored = reassert_floor(&engine, &region, &floor, &stream()).unwrap();
        assert_eq!(restored.0.len(), 1);
        assert!(restored.contains(&Point::new(100.0, 50.0)));
    }
}
