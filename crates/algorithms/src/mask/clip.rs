//! Clip a raster to a polygon region
//!
//! A cell belongs to the region when its center does. Membership is found
//! with an even-odd scanline through each row of cell centers, so holes are
//! honored without point-in-polygon tests per cell.

use floodplain_core::raster::{GeoTransform, Raster};
use floodplain_core::{Error, Result};
use geo::{BoundingRect, MultiPolygon, Polygon};
use ndarray::Array2;

/// Cells of a grid covered by a region, cropped to the region's extent
#[derive(Debug, Clone)]
pub struct RegionMask {
    /// Row of the grid where `inside` starts
    pub row_off: usize,
    /// Column of the grid where `inside` starts
    pub col_off: usize,
    /// `true` where the cell center lies inside the region
    pub inside: Array2<bool>,
}

impl RegionMask {
    /// Number of covered cells
    pub fn count(&self) -> usize {
        self.inside.iter().filter(|&&v| v).count()
    }

    /// Covered cells as grid `(row, col)` indices
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.inside
            .indexed_iter()
            .filter(|&(_, &v)| v)
            .map(move |((r, c), _)| (r + self.row_off, c + self.col_off))
    }
}

/// Inclusive index range of cell centers falling in `[lo, hi]` along one
/// axis, given the axis origin and (signed) step.
fn center_range(lo: f64, hi: f64, origin: f64, step: f64, len: usize) -> Option<(usize, usize)> {
    let a = (lo - origin) / step - 0.5;
    let b = (hi - origin) / step - 0.5;
    let (a, b) = if a <= b { (a, b) } else { (b, a) };

    let first = a.ceil().max(0.0);
    let last = b.floor().min(len as f64 - 1.0);
    (len > 0 && first <= last).then(|| (first as usize, last as usize))
}

fn check_transform(transform: &GeoTransform) -> Result<()> {
    if !transform.is_axis_aligned() || transform.pixel_width <= 0.0 {
        return Err(Error::Algorithm(
            "region rasterization needs an unrotated grid with positive pixel width".into(),
        ));
    }
    if transform.pixel_height == 0.0 {
        return Err(Error::Algorithm("pixel height is zero".into()));
    }
    Ok(())
}

/// Find the cells of a `rows x cols` grid whose centers lie in `region`.
///
/// Returns `None` when the region misses the grid entirely.
pub fn rasterize_region(
    transform: &GeoTransform,
    rows: usize,
    cols: usize,
    region: &MultiPolygon<f64>,
) -> Result<Option<RegionMask>> {
    check_transform(transform)?;

    let Some(rect) = region.bounding_rect() else {
        return Ok(None);
    };
    let Some((r0, r1)) = center_range(
        rect.min().y,
        rect.max().y,
        transform.origin_y,
        transform.pixel_height,
        rows,
    ) else {
        return Ok(None);
    };
    let Some((c0, c1)) = center_range(
        rect.min().x,
        rect.max().x,
        transform.origin_x,
        transform.pixel_width,
        cols,
    ) else {
        return Ok(None);
    };

    let mut inside = Array2::from_elem((r1 - r0 + 1, c1 - c0 + 1), false);
    let mut crossings: Vec<f64> = Vec::new();

    for row in r0..=r1 {
        let y = transform.origin_y + (row as f64 + 0.5) * transform.pixel_height;

        // Parity is per polygon so that touching or overlapping parts
        // never cancel each other out.
        for polygon in region {
            crossings.clear();
            scanline_crossings(polygon, y, &mut crossings);
            crossings.sort_by(|a, b| a.total_cmp(b));

            for span in crossings.chunks_exact(2) {
                let Some((a, b)) = half_open_span(span[0], span[1], transform, cols) else {
                    continue;
                };
                for col in a.max(c0)..=b.min(c1) {
                    inside[(row - r0, col - c0)] = true;
                }
            }
        }
    }

    Ok(Some(RegionMask {
        row_off: r0,
        col_off: c0,
        inside,
    }))
}

/// x positions where the horizontal line at `y` crosses the polygon's rings
fn scanline_crossings(polygon: &Polygon<f64>, y: f64, out: &mut Vec<f64>) {
    for ring in std::iter::once(polygon.exterior()).chain(polygon.interiors()) {
        for line in ring.lines() {
            let (p, q) = (line.start, line.end);
            if (p.y > y) != (q.y > y) {
                out.push(p.x + (y - p.y) * (q.x - p.x) / (q.y - p.y));
            }
        }
    }
}

/// Columns whose centers lie in `[xa, xb)`
fn half_open_span(xa: f64, xb: f64, transform: &GeoTransform, cols: usize) -> Option<(usize, usize)> {
    let first = ((xa - transform.origin_x) / transform.pixel_width - 0.5).ceil();
    let end = ((xb - transform.origin_x) / transform.pixel_width - 0.5).ceil();
    let first = first.max(0.0);
    let last = (end - 1.0).min(cols as f64 - 1.0);
    (first <= last).then(|| (first as usize, last as usize))
}

/// Clip a raster to a polygon region.
///
/// The output is the window of the input covering the region's cells,
/// georeferenced accordingly; cells outside the region are NaN. A region
/// that misses the raster yields an empty (0 x 0) raster.
pub fn clip_to_region(raster: &Raster<f64>, region: &MultiPolygon<f64>) -> Result<Raster<f64>> {
    let (rows, cols) = raster.shape();
    let Some(mask) = rasterize_region(raster.transform(), rows, cols, region)? else {
        return Ok(raster.window(0, 0, 0, 0));
    };

    let (h, w) = mask.inside.dim();
    let mut clipped = raster.window(mask.row_off, mask.col_off, h, w);
    ndarray::Zip::from(clipped.data_mut())
        .and(&mask.inside)
        .for_each(|v, &keep| {
            if !keep {
                *v = f64::NAN;
            }
        });
    clipped.set_nodata(Some(f64::NAN));
    Ok(clipped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, Coord, Rect};

    fn grid() -> Raster<f64> {
        let mut r = Raster::filled(10, 10, 1.0);
        r.set_transform(GeoTransform::new(0.0, 100.0, 10.0, -10.0));
        r
    }

    #[test]
    fn test_rectangle_covers_expected_cells() {
        // Centers at x = 25, 35 and y = 75, 65, 55
        let region = MultiPolygon::new(vec![Rect::new(
            Coord { x: 20.0, y: 50.0 },
            Coord { x: 40.0, y: 80.0 },
        )
        .to_polygon()]);

        let mask = rasterize_region(grid().transform(), 10, 10, &region).unwrap().unwrap();
        assert_eq!(mask.count(), 6);
        let cells: Vec<_> = mask.cells().collect();
        assert!(cells.contains(&(2, 2)));
        assert!(cells.contains(&(4, 3)));
        assert!(!cells.contains(&(5, 2)));
    }

    #[test]
    fn test_hole_is_excluded() {
        let region = MultiPolygon::new(vec![polygon!(
            exterior: [(x: 0.0, y: 0.0), (x: 100.0, y: 0.0), (x: 100.0, y: 100.0), (x: 0.0, y: 100.0)],
            interiors: [[(x: 40.0, y: 40.0), (x: 60.0, y: 40.0), (x: 60.0, y: 60.0), (x: 40.0, y: 60.0)]],
        )]);

        let clipped = clip_to_region(&grid(), &region).unwrap();
        assert_eq!(clipped.shape(), (10, 10));
        assert!(clipped.get(4, 4).unwrap().is_nan());
        assert!(clipped.get(5, 5).unwrap().is_nan());
        assert_eq!(clipped.get(3, 3).unwrap(), 1.0);
        assert_eq!(clipped.statistics().valid_count, 96);
    }

    #[test]
    fn test_clip_crops_and_georeferences() {
        let triangle = MultiPolygon::new(vec![polygon![
            (x: 30.0, y: 30.0),
            (x: 70.0, y: 30.0),
            (x: 30.0, y: 70.0),
        ]]);
        let source = grid();
        let clipped = clip_to_region(&source, &triangle).unwrap();

        assert_eq!(clipped.shape(), (4, 4));
        assert_eq!(clipped.pixel_to_geo(0, 0), (35.0, 65.0));
        // Lower-left corner of the triangle is inside, upper-right is not
        assert_eq!(clipped.get(3, 0).unwrap(), 1.0);
        assert!(clipped.get(0, 3).unwrap().is_nan());
    }

    #[test]
    fn test_region_outside_grid() {
        let far = MultiPolygon::new(vec![Rect::new(
            Coord { x: 500.0, y: 500.0 },
            Coord { x: 600.0, y: 600.0 },
        )
        .to_polygon()]);
        assert!(rasterize_region(grid().transform(), 10, 10, &far).unwrap().is_none());
        assert!(clip_to_region(&grid(), &far).unwrap().is_empty());
    }

    #[test]
    fn test_rotated_grid_rejected() {
        let mut t = GeoTransform::new(0.0, 100.0, 10.0, -10.0);
        t.row_rotation = 0.5;
        let region = MultiPolygon::new(vec![]);
        assert!(rasterize_region(&t, 10, 10, &region).is_err());
    }
}
