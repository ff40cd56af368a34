//! Polygon aggregation
//!
//! Merges parts lying within a distance of each other with a morphological
//! closing, then cleans up small holes and small parts. The closing is built
//! from the same round-capped capsules as the buffers: dilation adds the
//! capsules of every ring edge, erosion removes them again from the dilated
//! outline.

use super::buffer::{buffer_lines, buffer_polygons, BufferParams};
use super::spatial::union_all;
use floodplain_core::{Error, Result};
use geo::{Area, BooleanOps, LineString, MultiLineString, MultiPolygon, Polygon};

/// Capsule resolution for the closing; coarser than output buffers since
/// the closing never sets the visible outline on its own.
const CLOSING_SEGMENTS: usize = 16;

/// Parameters for aggregation
#[derive(Debug, Clone)]
pub struct AggregateParams {
    /// Parts closer than this are merged
    pub distance: f64,
    /// Parts smaller than this area are dropped
    pub min_area: f64,
    /// Holes smaller than this area are filled
    pub min_hole_area: f64,
}

impl Default for AggregateParams {
    fn default() -> Self {
        Self {
            distance: 100.0,
            min_area: 30_000.0,
            min_hole_area: 50_000.0,
        }
    }
}

impl AggregateParams {
    fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("distance", self.distance),
            ("min_area", self.min_area),
            ("min_hole_area", self.min_hole_area),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::InvalidParameter {
                    name,
                    value: value.to_string(),
                    reason: "must be a non-negative number".into(),
                });
            }
        }
        Ok(())
    }
}

fn rings(polygons: &MultiPolygon<f64>) -> MultiLineString<f64> {
    MultiLineString::new(
        polygons
            .iter()
            .flat_map(|p| std::iter::once(p.exterior().clone()).chain(p.interiors().iter().cloned()))
            .collect(),
    )
}

/// Morphological closing with a disc of radius `radius`.
///
/// The input is unioned back in, so the result always covers it even where
/// the polygonal discs over-erode.
fn close(polygons: &MultiPolygon<f64>, radius: f64) -> MultiPolygon<f64> {
    let params = BufferParams {
        distance: radius,
        segments: CLOSING_SEGMENTS,
    };

    let dilated = buffer_polygons(polygons, &params);
    let border = buffer_lines(&rings(&dilated), &params);
    let eroded = dilated.difference(&border);

    union_all(vec![eroded, polygons.clone()])
}

fn fill_small_holes(polygon: Polygon<f64>, min_hole_area: f64) -> Polygon<f64> {
    let (exterior, interiors) = polygon.into_inner();
    let kept: Vec<LineString<f64>> = interiors
        .into_iter()
        .filter(|ring| Polygon::new(ring.clone(), vec![]).unsigned_area() >= min_hole_area)
        .collect();
    Polygon::new(exterior, kept)
}

/// Aggregate polygon parts.
///
/// 1. Parts within `distance` of one another are merged (closing by half
///    the distance).
/// 2. Holes with area below `min_hole_area` are filled.
/// 3. Parts with area below `min_area` are dropped.
pub fn aggregate(polygons: &MultiPolygon<f64>, params: &AggregateParams) -> Result<MultiPolygon<f64>> {
    params.validate()?;

    let merged = if params.distance > 0.0 && !polygons.0.is_empty() {
        close(polygons, params.distance / 2.0)
    } else {
        polygons.clone()
    };

    Ok(merged
        .into_iter()
        .map(|p| fill_small_holes(p, params.min_hole_area))
        .filter(|p| p.unsigned_area() >= params.min_area)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use geo::{polygon, Contains, Coord, Point, Rect};

    fn square(x: f64, y: f64, size: f64) -> Polygon<f64> {
        Rect::new(Coord { x, y }, Coord { x: x + size, y: y + size }).to_polygon()
    }

    fn only(distance: f64) -> AggregateParams {
        AggregateParams {
            distance,
            min_area: 0.0,
            min_hole_area: 0.0,
        }
    }

    #[test]
    fn test_close_parts_merge() {
        let parts = MultiPolygon::new(vec![square(0.0, 0.0, 10.0), square(14.0, 0.0, 10.0)]);
        let merged = aggregate(&parts, &only(10.0)).unwrap();

        assert_eq!(merged.0.len(), 1);
        assert!(merged.contains(&Point::new(12.0, 5.0)));
        assert!(merged.unsigned_area() > 200.0);
    }

    #[test]
    fn test_distant_parts_stay_apart() {
        let parts = MultiPolygon::new(vec![square(0.0, 0.0, 10.0), square(40.0, 0.0, 10.0)]);
        let merged = aggregate(&parts, &only(10.0)).unwrap();

        assert_eq!(merged.0.len(), 2);
        assert!(!merged.contains(&Point::new(25.0, 5.0)));
        assert_relative_eq!(merged.unsigned_area(), 200.0, max_relative = 0.01);
    }

    #[test]
    fn test_small_hole_filled_large_hole_kept() {
        let holed = polygon!(
            exterior: [(x: 0.0, y: 0.0), (x: 100.0, y: 0.0), (x: 100.0, y: 100.0), (x: 0.0, y: 100.0)],
            interiors: [
                [(x: 10.0, y: 10.0), (x: 15.0, y: 10.0), (x: 15.0, y: 15.0), (x: 10.0, y: 15.0)],
                [(x: 40.0, y: 40.0), (x: 80.0, y: 40.0), (x: 80.0, y: 80.0), (x: 40.0, y: 80.0)],
            ],
        );
        let params = AggregateParams {
            distance: 0.0,
            min_area: 0.0,
            min_hole_area: 50.0,
        };
        let cleaned = aggregate(&MultiPolygon::new(vec![holed]), &params).unwrap();

        assert_eq!(cleaned.0[0].interiors().len(), 1);
        assert!(cleaned.contains(&Point::new(12.0, 12.0)));
        assert!(!cleaned.contains(&Point::new(60.0, 60.0)));
    }

    #[test]
    fn test_small_parts_dropped() {
        let parts = MultiPolygon::new(vec![square(0.0, 0.0, 10.0), square(50.0, 50.0, 5.0)]);
        let params = AggregateParams {
            distance: 0.0,
            min_area: 30.0,
            min_hole_area: 0.0,
        };
        let cleaned = aggregate(&parts, &params).unwrap();
        assert_eq!(cleaned.0.len(), 1);
        assert_relative_eq!(cleaned.unsigned_area(), 100.0, epsilon = 1e-9);
    }

    #[test]
    fn test_closing_covers_input() {
        let parts = MultiPolygon::new(vec![square(0.0, 0.0, 30.0), square(31.0, 10.0, 5.0)]);
        let merged = aggregate(&parts, &only(6.0)).unwrap();
        assert!(merged.unsigned_area() >= parts.unsigned_area() - 1e-6);
        assert!(merged.contains(&Point::new(33.0, 12.0)));
    }

    #[test]
    fn test_negative_parameter_rejected() {
        let params = AggregateParams {
            min_area: -1.0,
            ..Default::default()
        };
        assert!(aggregate(&MultiPolygon::new(vec![]), &params).is_err());
    }
}
