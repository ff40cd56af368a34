//! Geometric measurements: area, length, perimeter, position along a line

use geo::{Area, Coord, Euclidean, Length, LineString, MultiLineString, MultiPolygon, Point, Polygon};

/// Unsigned area in CRS units squared.
pub fn area(polygons: &MultiPolygon<f64>) -> f64 {
    polygons.unsigned_area()
}

/// Total Euclidean length of all parts, in CRS units.
pub fn length(lines: &MultiLineString<f64>) -> f64 {
    lines.iter().map(|ls| ls.length::<Euclidean>()).sum()
}

fn rings_length(p: &Polygon<f64>) -> f64 {
    let ext = p.exterior().length::<Euclidean>();
    let int: f64 = p.interiors().iter().map(|r| r.length::<Euclidean>()).sum();
    ext + int
}

/// Total length of exterior and interior rings.
pub fn perimeter(polygons: &MultiPolygon<f64>) -> f64 {
    polygons.iter().map(rings_length).sum()
}

/// The point halfway along a line, by length.
///
/// Parts are walked in order as if they were one continuous path, so for a
/// multipart line the midpoint may fall in any part. Returns `None` for a
/// line with no coordinates; a zero-length line yields its first vertex.
pub fn midpoint_along(lines: &MultiLineString<f64>) -> Option<Point<f64>> {
    let first = lines.iter().find_map(|ls| ls.0.first().copied())?;
    let half = length(lines) / 2.0;
    if half <= 0.0 {
        return Some(Point::from(first));
    }

    let mut walked = 0.0;
    for segment in lines.iter().flat_map(LineString::lines) {
        let (dx, dy) = (segment.end.x - segment.start.x, segment.end.y - segment.start.y);
        let len = dx.hypot(dy);
        if len > 0.0 && walked + len >= half {
            let t = (half - walked) / len;
            return Some(Point::from(Coord {
                x: segment.start.x + t * dx,
                y: segment.start.y + t * dy,
            }));
        }
        walked += len;
    }

    // Rounding left the walk a hair short of the halfway mark
    lines.0.iter().rev().find_map(|ls| ls.0.last().copied()).map(Point::from)
}
