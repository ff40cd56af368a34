//! Buffer operations
//!
//! Round-capped buffers built from capsules: every line segment (or ring
//! edge) contributes the convex hull of two discs, and the capsules are
//! dissolved. Arc vertices sit on the circumscribed radius
//! `r / cos(pi / n)`, so each polygon edge is tangent to the true circle
//! and the result always covers the exact buffer.

use super::spatial::union_all;
use floodplain_core::{Error, Result};
use geo::{Coord, Geometry, Line, LineString, MultiLineString, MultiPolygon, Point, Polygon};
use std::f64::consts::PI;

/// Parameters for buffer operations
#[derive(Debug, Clone)]
pub struct BufferParams {
    /// Buffer distance; zero or negative yields an empty buffer
    pub distance: f64,
    /// Segments used to approximate a full circle
    pub segments: usize,
}

impl Default for BufferParams {
    fn default() -> Self {
        Self {
            distance: 1.0,
            segments: 32,
        }
    }
}

impl BufferParams {
    pub fn new(distance: f64) -> Self {
        Self {
            distance,
            ..Self::default()
        }
    }

    fn steps(&self) -> usize {
        // Even, so a half circle has a whole number of steps
        (self.segments.max(8) + 1) & !1
    }

    fn vertex_radius(&self) -> f64 {
        self.distance / (PI / self.steps() as f64).cos()
    }
}

/// Create a circular buffer around a point.
///
/// Vertices lie on the circumscribed radius, so the polygon contains the
/// whole disc.
pub fn buffer_points(point: &Point<f64>, params: &BufferParams) -> Polygon<f64> {
    let n = params.steps();
    let r = params.vertex_radius().abs();
    let (cx, cy) = (point.x(), point.y());

    let coords: Vec<(f64, f64)> = (0..=n)
        .map(|i| {
            let angle = 2.0 * PI * (i % n) as f64 / n as f64;
            (cx + r * angle.cos(), cy + r * angle.sin())
        })
        .collect();

    Polygon::new(LineString::from(coords), vec![])
}

/// Round-capped buffer of one segment
fn capsule(line: Line<f64>, params: &BufferParams) -> Polygon<f64> {
    let (dx, dy) = (line.end.x - line.start.x, line.end.y - line.start.y);
    if dx == 0.0 && dy == 0.0 {
        return buffer_points(&Point::from(line.start), params);
    }

    let n = params.steps();
    let half = n / 2;
    let r = params.vertex_radius();
    let heading = dy.atan2(dx);
    let step = 2.0 * PI / n as f64;

    let mut coords: Vec<Coord<f64>> = Vec::with_capacity(n + 3);
    // Cap around the end point, right side to left side
    for i in 0..=half {
        let a = heading - PI / 2.0 + step * i as f64;
        coords.push(Coord {
            x: line.end.x + r * a.cos(),
            y: line.end.y + r * a.sin(),
        });
    }
    // Cap around the start point, left side back to right side
    for i in 0..=half {
        let a = heading + PI / 2.0 + step * i as f64;
        coords.push(Coord {
            x: line.start.x + r * a.cos(),
            y: line.start.y + r * a.sin(),
        });
    }
    coords.push(coords[0]);

    Polygon::new(LineString::new(coords), vec![])
}

/// Dissolved round-capped buffer around a set of lines.
pub fn buffer_lines(lines: &MultiLineString<f64>, params: &BufferParams) -> MultiPolygon<f64> {
    if params.distance <= 0.0 {
        return MultiPolygon::new(vec![]);
    }

    let capsules: Vec<MultiPolygon<f64>> = lines
        .iter()
        .flat_map(|ls| {
            let coords = &ls.0;
            let pieces: Vec<Polygon<f64>> = match coords.len() {
                0 => Vec::new(),
                1 => vec![buffer_points(&Point::from(coords[0]), params)],
                _ => ls.lines().map(|l| capsule(l, params)).collect(),
            };
            pieces
        })
        .map(|p| MultiPolygon::new(vec![p]))
        .collect();

    union_all(capsules)
}

/// Grow polygons outward by the buffer distance.
///
/// The polygon itself plus a capsule around every ring edge; holes narrower
/// than twice the distance close up.
pub fn buffer_polygons(polygons: &MultiPolygon<f64>, params: &BufferParams) -> MultiPolygon<f64> {
    if params.distance <= 0.0 {
        return polygons.clone();
    }

    let rings: Vec<LineString<f64>> = polygons
        .iter()
        .flat_map(|p| std::iter::once(p.exterior().clone()).chain(p.interiors().iter().cloned()))
        .collect();

    let mut parts = vec![polygons.clone()];
    parts.push(buffer_lines(&MultiLineString::new(rings), params));
    union_all(parts)
}

/// Buffer any supported geometry into a dissolved multipolygon.
pub fn buffer_geometry(geom: &Geometry<f64>, params: &BufferParams) -> Result<MultiPolygon<f64>> {
    if !params.distance.is_finite() {
        return Err(Error::InvalidParameter {
            name: "distance",
            value: params.distance.to_string(),
            reason: "buffer distance must be finite".into(),
        });
    }

    let lines = |ls: Vec<LineString<f64>>| buffer_lines(&MultiLineString::new(ls), params);

    Ok(match geom {
        Geometry::Point(p) if params.distance > 0.0 => MultiPolygon::new(vec![buffer_points(p, params)]),
        Geometry::Point(_) => MultiPolygon::new(vec![]),
        Geometry::MultiPoint(mp) => lines(mp.iter().map(|p| LineString::new(vec![p.0])).collect()),
        Geometry::Line(l) => lines(vec![LineString::new(vec![l.start, l.end])]),
        Geometry::LineString(ls) => lines(vec![ls.clone()]),
        Geometry::MultiLineString(mls) => buffer_lines(mls, params),
        Geometry::Polygon(p) => buffer_polygons(&MultiPolygon::new(vec![p.clone()]), params),
        Geometry::MultiPolygon(mp) => buffer_polygons(mp, params),
        Geometry::Rect(r) => buffer_polygons(&MultiPolygon::new(vec![r.to_polygon()]), params),
        Geometry::Triangle(t) => buffer_polygons(&MultiPolygon::new(vec![t.to_polygon()]), params),
        Geometry::GeometryCollection(_) => {
            return Err(Error::UnsupportedGeometry(
                "cannot buffer a GeometryCollection".into(),
            ))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{line_string, Area, Contains};

    fn distance_to(p: Point<f64>, lines: &MultiLineString<f64>) -> f64 {
        lines
            .iter()
            .flat_map(|ls| ls.lines())
            .map(|l| {
                let (dx, dy) = (l.end.x - l.start.x, l.end.y - l.start.y);
                let len2 = dx * dx + dy * dy;
                let t = (((p.x() - l.start.x) * dx + (p.y() - l.start.y) * dy) / len2).clamp(0.0, 1.0);
                (p.x() - l.start.x - t * dx).hypot(p.y() - l.start.y - t * dy)
            })
            .fold(f64::INFINITY, f64::min)
    }

    #[test]
    fn test_buffer_point_circle() {
        let polygon = buffer_points(&Point::new(0.0, 0.0), &BufferParams { distance: 10.0, segments: 64 });

        let expected_area = PI * 100.0;
        let error = (polygon.unsigned_area() - expected_area) / expected_area;
        assert!(error >= 0.0, "polygon must cover the disc");
        assert!(error < 0.01, "circle area error {:.3}%", error * 100.0);
        assert_eq!(polygon.exterior().0.len(), 65);
    }

    #[test]
    fn test_capsule_area() {
        let line = MultiLineString::new(vec![line_string![(x: 0.0, y: 0.0), (x: 100.0, y: 0.0)]]);
        let buf = buffer_lines(&line, &BufferParams { distance: 10.0, segments: 64 });

        let exact = 100.0 * 20.0 + PI * 100.0;
        let area = buf.unsigned_area();
        assert!(area >= exact && area < exact * 1.01, "area {} vs {}", area, exact);
    }

    #[test]
    fn test_buffer_covers_every_point_within_distance() {
        let line = MultiLineString::new(vec![line_string![
            (x: 0.0, y: 0.0),
            (x: 50.0, y: 20.0),
            (x: 80.0, y: -10.0),
            (x: 120.0, y: 0.0),
        ]]);
        let buf = buffer_lines(&line, &BufferParams::new(15.0));

        // Check a grid of points; those closer than the distance must be inside
        for i in -20..140 {
            for j in -40..40 {
                let p = Point::new(i as f64, j as f64);
                let d = distance_to(p, &line);
                if d < 15.0 {
                    assert!(buf.contains(&p), "{:?} at {:.2} not covered", p, d);
                }
                if d > 16.5 {
                    assert!(!buf.contains(&p), "{:?} at {:.2} covered", p, d);
                }
            }
        }
    }

    #[test]
    fn test_wider_buffer_contains_narrower() {
        let line = MultiLineString::new(vec![line_string![(x: 0.0, y: 0.0), (x: 30.0, y: 40.0)]]);
        let narrow = buffer_lines(&line, &BufferParams::new(5.0));
        let wide = buffer_lines(&line, &BufferParams::new(10.0));
        assert!(wide.unsigned_area() > narrow.unsigned_area());
        assert!(wide.contains(&narrow));
    }

    #[test]
    fn test_zero_distance_is_empty() {
        let line = MultiLineString::new(vec![line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0)]]);
        assert!(buffer_lines(&line, &BufferParams::new(0.0)).0.is_empty());
    }

    #[test]
    fn test_polygon_buffer_grows() {
        let square = Geometry::Rect(geo::Rect::new(
            Coord { x: 0.0, y: 0.0 },
            Coord { x: 10.0, y: 10.0 },
        ));
        let grown = buffer_geometry(&square, &BufferParams::new(2.0)).unwrap();
        let exact = 100.0 + 4.0 * 10.0 * 2.0 + PI * 4.0;
        assert!(grown.unsigned_area() >= exact);
        assert!(grown.contains(&Point::new(-1.9, 5.0)));
        assert_eq!(grown.0.len(), 1);
    }

    #[test]
    fn test_unsupported_geometry() {
        let gc = Geometry::GeometryCollection(geo::GeometryCollection::new_from(vec![]));
        assert!(buffer_geometry(&gc, &BufferParams::new(1.0)).is_err());
    }
}
