//! Douglas-Peucker generalization of polygon outlines

use geo::{LineString, MultiPolygon, Polygon, Simplify};

/// Closed rings need at least three distinct vertices plus the closing one
const MIN_RING_COORDS: usize = 4;

/// Simplify every ring of a multipolygon with Douglas-Peucker.
///
/// Rings that collapse below a triangle are dropped: a collapsed exterior
/// drops its whole polygon, a collapsed hole is filled. The result is not
/// repaired; rings may touch after simplification.
pub fn simplify_dp(polygons: &MultiPolygon<f64>, tolerance: f64) -> MultiPolygon<f64> {
    if tolerance <= 0.0 {
        return polygons.clone();
    }

    polygons
        .iter()
        .filter_map(|p| simplify_polygon(p, tolerance))
        .collect()
}

fn simplify_polygon(polygon: &Polygon<f64>, tolerance: f64) -> Option<Polygon<f64>> {
    let exterior = polygon.exterior().simplify(&tolerance);
    if exterior.0.len() < MIN_RING_COORDS {
        return None;
    }
    let interiors: Vec<LineString<f64>> = polygon
        .interiors()
        .iter()
        .map(|ring| ring.simplify(&tolerance))
        .filter(|ring| ring.0.len() >= MIN_RING_COORDS)
        .collect();
    Some(Polygon::new(exterior, interiors))
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;

    fn wobbly() -> Polygon<f64> {
        polygon![
            (x: 0.0, y: 0.0),
            (x: 1.0, y: 0.1),
            (x: 2.0, y: 0.0),
            (x: 3.0, y: 0.05),
            (x: 5.0, y: 0.0),
            (x: 5.0, y: 5.0),
            (x: 3.0, y: 5.1),
            (x: 0.0, y: 5.0),
        ]
    }

    #[test]
    fn test_reduces_vertices() {
        let mp = MultiPolygon::new(vec![wobbly()]);
        let simplified = simplify_dp(&mp, 0.15);
        assert_eq!(simplified.0.len(), 1);
        assert_eq!(simplified.0[0].exterior().0.len(), 5);
    }

    #[test]
    fn test_zero_tolerance_is_identity() {
        let mp = MultiPolygon::new(vec![wobbly()]);
        assert_eq!(simplify_dp(&mp, 0.0), mp);
    }

    #[test]
    fn test_tiny_hole_is_filled() {
        let p = polygon!(
            exterior: [(x: 0.0, y: 0.0), (x: 10.0, y: 0.0), (x: 10.0, y: 10.0), (x: 0.0, y: 10.0)],
            interiors: [[(x: 5.0, y: 5.0), (x: 5.1, y: 5.0), (x: 5.0, y: 5.1)]],
        );
        let simplified = simplify_dp(&MultiPolygon::new(vec![p]), 0.5);
        assert!(simplified.0[0].interiors().is_empty());
    }
}
