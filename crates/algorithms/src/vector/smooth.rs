//! Boundary smoothing
//!
//! A PAEK-style smoother: each ring is resampled at a fine uniform spacing
//! and every sample is replaced by a Gaussian-weighted average of its
//! neighbors along the ring, within half the tolerance on either side.
//! Straight runs stay put; corners are rounded over roughly the tolerance.

use super::spatial::union_all;
use floodplain_core::{Error, Result};
use geo::{BooleanOps, Coord, LineString, MultiPolygon, Polygon};

/// Resampling step as a fraction of the tolerance
const SAMPLES_PER_TOLERANCE: f64 = 8.0;

/// Parameters for smoothing
#[derive(Debug, Clone)]
pub struct SmoothParams {
    /// Length of the smoothing path along the boundary
    pub tolerance: f64,
    /// Keep the start vertex of every ring in place.
    ///
    /// Only that one vertex is pinned. Its neighbors are still relaxed
    /// across the closing seam, so the ring bends toward the pinned point
    /// over about half the tolerance on each side.
    pub fixed_endpoints: bool,
}

impl Default for SmoothParams {
    fn default() -> Self {
        Self {
            tolerance: 65.0,
            fixed_endpoints: true,
        }
    }
}

/// Resample a closed ring at `n` points evenly spaced by arc length,
/// starting at the ring's first vertex. The closing point is not repeated.
fn resample(ring: &LineString<f64>, perimeter: f64, n: usize) -> Vec<Coord<f64>> {
    let spacing = perimeter / n as f64;
    let mut out = Vec::with_capacity(n);
    let mut walked = 0.0;

    for segment in ring.lines() {
        let (dx, dy) = (segment.end.x - segment.start.x, segment.end.y - segment.start.y);
        let len = dx.hypot(dy);
        if len == 0.0 {
            continue;
        }
        while out.len() < n {
            let at = out.len() as f64 * spacing - walked;
            if at >= len {
                break;
            }
            let t = at / len;
            out.push(Coord {
                x: segment.start.x + t * dx,
                y: segment.start.y + t * dy,
            });
        }
        walked += len;
    }
    out
}

fn smooth_ring(ring: &LineString<f64>, params: &SmoothParams) -> LineString<f64> {
    let perimeter: f64 = ring
        .lines()
        .map(|l| (l.end.x - l.start.x).hypot(l.end.y - l.start.y))
        .sum();
    if ring.0.len() < 4 || perimeter <= params.tolerance {
        return ring.clone();
    }

    let n = (perimeter * SAMPLES_PER_TOLERANCE / params.tolerance).ceil() as usize;
    let samples = resample(ring, perimeter, n);
    let n = samples.len();
    if n < 4 {
        return ring.clone();
    }

    let spacing = perimeter / n as f64;
    let sigma = params.tolerance / 4.0;
    let reach = ((params.tolerance / 2.0 / spacing).round() as usize).min((n - 1) / 2);
    let weights: Vec<f64> = (0..=reach)
        .map(|j| {
            let d = j as f64 * spacing;
            (-(d * d) / (2.0 * sigma * sigma)).exp()
        })
        .collect();
    let total: f64 = weights[0] + 2.0 * weights[1..].iter().sum::<f64>();

    let mut coords: Vec<Coord<f64>> = (0..n)
        .map(|i| {
            let mut x = weights[0] * samples[i].x;
            let mut y = weights[0] * samples[i].y;
            for (j, w) in weights.iter().enumerate().skip(1) {
                let ahead = samples[(i + j) % n];
                let behind = samples[(i + n - j) % n];
                x += w * (ahead.x + behind.x);
                y += w * (ahead.y + behind.y);
            }
            Coord { x: x / total, y: y / total }
        })
        .collect();

    if params.fixed_endpoints {
        coords[0] = samples[0];
    }
    coords.push(coords[0]);
    LineString::new(coords)
}

fn smooth_polygon(polygon: &Polygon<f64>, params: &SmoothParams) -> Polygon<f64> {
    Polygon::new(
        smooth_ring(polygon.exterior(), params),
        polygon.interiors().iter().map(|r| smooth_ring(r, params)).collect(),
    )
}

/// Smooth polygon outlines.
///
/// Rings no longer than the tolerance are left as they are. The smoothed
/// parts are unioned afterwards so that relaxed rings that now touch or
/// cross still form a valid multipolygon.
pub fn smooth(polygons: &MultiPolygon<f64>, params: &SmoothParams) -> Result<MultiPolygon<f64>> {
    if !params.tolerance.is_finite() || params.tolerance < 0.0 {
        return Err(Error::InvalidParameter {
            name: "tolerance",
            value: params.tolerance.to_string(),
            reason: "smoothing tolerance must be a non-negative number".into(),
        });
    }
    if params.tolerance == 0.0 || polygons.0.is_empty() {
        return Ok(polygons.clone());
    }

    let mut parts: Vec<MultiPolygon<f64>> = polygons
        .iter()
        .map(|p| MultiPolygon::new(vec![smooth_polygon(p, params)]))
        .collect();

    Ok(match parts.len() {
        1 => parts.remove(0).union(&MultiPolygon::new(vec![])),
        _ => union_all(parts),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{Area, Contains, Point, Rect};

    fn square(size: f64) -> MultiPolygon<f64> {
        MultiPolygon::new(vec![
            Rect::new(Coord { x: 0.0, y: 0.0 }, Coord { x: size, y: size }).to_polygon(),
        ])
    }

    fn has_vertex_near(mp: &MultiPolygon<f64>, x: f64, y: f64) -> bool {
        mp.iter()
            .flat_map(|p| p.exterior().0.iter())
            .any(|c| (c.x - x).hypot(c.y - y) < 1e-6)
    }

    #[test]
    fn test_corners_are_rounded() {
        let smoothed = smooth(&square(100.0), &SmoothParams { tolerance: 20.0, fixed_endpoints: false }).unwrap();

        assert_eq!(smoothed.0.len(), 1);
        assert!(smoothed.contains(&Point::new(50.0, 50.0)));
        assert!(!smoothed.contains(&Point::new(99.5, 99.5)));
        let area = smoothed.unsigned_area();
        assert!(area < 10_000.0 && area > 9_800.0, "area {}", area);
    }

    #[test]
    fn test_straight_edges_stay_put() {
        let smoothed = smooth(&square(100.0), &SmoothParams { tolerance: 20.0, fixed_endpoints: false }).unwrap();
        assert!(smoothed.contains(&Point::new(50.0, 0.5)));
        assert!(!smoothed.contains(&Point::new(50.0, -0.5)));
    }

    #[test]
    fn test_fixed_start_vertex() {
        let input = square(100.0);
        let start = input.0[0].exterior().0[0];

        let pinned = smooth(&input, &SmoothParams::default()).unwrap();
        assert!(has_vertex_near(&pinned, start.x, start.y));

        let free = smooth(&input, &SmoothParams { tolerance: 65.0, fixed_endpoints: false }).unwrap();
        assert!(!has_vertex_near(&free, start.x, start.y));
    }

    #[test]
    fn test_seam_neighbors_relaxed() {
        let ring = square(100.0).0[0].exterior().clone();
        let start = ring.0[0];
        let smoothed = smooth_ring(&ring, &SmoothParams::default());
        let coords = &smoothed.0;
        let n = coords.len();

        assert_eq!(coords[0], start);
        assert_eq!(coords[n - 1], start);
        // Both samples on either side of the seam move off their edge
        let after = coords[1];
        let before = coords[n - 2];
        assert!(!on_square_outline(after, 100.0), "{:?}", after);
        assert!(!on_square_outline(before, 100.0), "{:?}", before);
    }

    fn on_square_outline(c: Coord<f64>, size: f64) -> bool {
        let eps = 1e-9;
        c.x.abs() < eps || c.y.abs() < eps || (c.x - size).abs() < eps || (c.y - size).abs() < eps
    }

    #[test]
    fn test_small_ring_untouched() {
        let tiny = square(10.0);
        let smoothed = smooth(&tiny, &SmoothParams::default()).unwrap();
        assert!((smoothed.unsigned_area() - 100.0).abs() < 1e-6);
    }

    #[test]
    fn test_zero_tolerance_is_identity() {
        let input = square(100.0);
        let params = SmoothParams { tolerance: 0.0, fixed_endpoints: true };
        assert_eq!(smooth(&input, &params).unwrap(), input);
    }

    #[test]
    fn test_negative_tolerance_rejected() {
        let params = SmoothParams { tolerance: -5.0, fixed_endpoints: true };
        assert!(smooth(&square(10.0), &params).is_err());
    }
}
