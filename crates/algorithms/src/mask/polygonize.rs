//! Raster to polygon conversion
//!
//! Valid cells are collected as horizontal runs, runs with the same column
//! span in consecutive rows are stacked into rectangles, and the
//! rectangles are dissolved into one multipolygon. Cell-exact before
//! simplification.

use crate::vector::{simplify_dp, union_all};
use floodplain_core::raster::Raster;
use floodplain_core::Result;
use geo::{Coord, MultiPolygon, Polygon, Rect};
use std::collections::HashMap;

/// Parameters for polygonization
#[derive(Debug, Clone)]
pub struct PolygonizeParams {
    /// Generalize the stair-stepped outline
    pub simplify: bool,
    /// Douglas-Peucker tolerance as a fraction of the cell size
    pub tolerance_cells: f64,
}

impl Default for PolygonizeParams {
    fn default() -> Self {
        Self {
            simplify: true,
            tolerance_cells: 0.5,
        }
    }
}

/// Column span `[start, end)` of valid cells within one row
type Run = (usize, usize);

fn row_runs(raster: &Raster<f64>, row: usize) -> Vec<Run> {
    let mut runs = Vec::new();
    let mut start: Option<usize> = None;

    for col in 0..raster.cols() {
        let v = unsafe { raster.get_unchecked(row, col) };
        match (start, raster.is_nodata(v)) {
            (None, false) => start = Some(col),
            (Some(s), true) => {
                runs.push((s, col));
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        runs.push((s, raster.cols()));
    }
    runs
}

/// Convert every valid (non no-data) cell into polygon area.
///
/// The value of a cell is irrelevant beyond being valid: a reclassified
/// mask with 1 for admitted and NaN elsewhere polygonizes to the admitted
/// region. With `simplify`, outlines are generalized at a tolerance below
/// one cell, so the polygon never strays more than that from the cell
/// edges.
pub fn polygonize(raster: &Raster<f64>, params: PolygonizeParams) -> Result<MultiPolygon<f64>> {
    let transform = *raster.transform();
    let rows = raster.rows();

    // Open rectangles keyed by column span, holding their first row
    let mut open: HashMap<Run, usize> = HashMap::new();
    let mut blocks: Vec<(usize, usize, Run)> = Vec::new();

    for row in 0..=rows {
        let runs = if row < rows { row_runs(raster, row) } else { Vec::new() };

        let mut closed: Vec<Run> = open.keys().filter(|k| !runs.contains(k)).copied().collect();
        closed.sort_unstable();
        for run in closed {
            if let Some(first) = open.remove(&run) {
                blocks.push((first, row, run));
            }
        }
        for run in runs {
            open.entry(run).or_insert(row);
        }
    }
    blocks.sort_unstable();

    let rects: Vec<MultiPolygon<f64>> = blocks
        .into_iter()
        .map(|(r0, r1, (c0, c1))| {
            let (x0, y0) = transform.pixel_to_geo_corner(c0, r0);
            let (x1, y1) = transform.pixel_to_geo_corner(c1, r1);
            let rect = Rect::new(Coord { x: x0, y: y0 }, Coord { x: x1, y: y1 });
            MultiPolygon::new(vec![rect.to_polygon()])
        })
        .collect();

    let region = union_all(rects);
    if !params.simplify || region.0.is_empty() {
        return Ok(region);
    }

    let tolerance = params.tolerance_cells * raster.cell_size();
    let simplified = simplify_dp(&region, tolerance);
    // Simplification may leave rings touching or crossing; a union
    // rebuilds a valid multipolygon.
    let parts: Vec<MultiPolygon<f64>> = simplified
        .0
        .into_iter()
        .filter(|p: &Polygon<f64>| p.exterior().0.len() >= 4)
        .map(|p| MultiPolygon::new(vec![p]))
        .collect();
    Ok(union_all(parts))
}
