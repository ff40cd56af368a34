//! D8 flow direction
//!
//! Each cell drains to the neighbor with the steepest distance-weighted
//! drop. Codes follow the layout documented on [`super::D8_OFFSETS`];
//! `0` marks a pit, a flat or a no-data cell.

use super::{d8_neighbor, is_void, D8_DIST};
use crate::maybe_rayon::*;
use ndarray::Array2;
use floodplain_core::raster::Raster;
use floodplain_core::{Algorithm, Error, Result};

/// Flow direction algorithm (D8)
#[derive(Debug, Clone, Default)]
pub struct FlowDirection;

impl Algorithm for FlowDirection {
    type Input = Raster<f64>;
    type Output = Raster<u8>;
    type Params = ();
    type Error = Error;

    fn name(&self) -> &'static str {
        "Flow Direction (D8)"
    }

    fn description(&self) -> &'static str {
        "Calculate D8 flow direction from a filled DEM"
    }

    fn execute(&self, input: Self::Input, _params: Self::Params) -> Result<Self::Output> {
        flow_direction(&input)
    }
}

/// Calculate D8 flow direction codes from a (preferably filled) DEM.
///
/// Ties between equally steep neighbors go to the lowest code, so the
/// result is deterministic regardless of thread count.
pub fn flow_direction(dem: &Raster<f64>) -> Result<Raster<u8>> {
    let (rows, cols) = dem.shape();
    let nodata = dem.nodata();
    let cell_size = dem.cell_size().abs();

    let codes: Vec<u8> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            (0..cols)
                .map(|col| steepest_descent(dem, nodata, cell_size, row, col))
                .collect::<Vec<u8>>()
        })
        .collect();

    let mut output = dem.with_same_meta::<u8>(rows, cols);
    output.set_nodata(Some(0));
    *output.data_mut() = Array2::from_shape_vec((rows, cols), codes)
        .map_err(|e| Error::Other(e.to_string()))?;

    Ok(output)
}

fn steepest_descent(dem: &Raster<f64>, nodata: Option<f64>, cell_size: f64, row: usize, col: usize) -> u8 {
    let (rows, cols) = dem.shape();
    // SAFETY: row/col come from the raster's own shape
    let center = unsafe { dem.get_unchecked(row, col) };
    if is_void(center, nodata) {
        return 0;
    }

    let mut max_drop = 0.0_f64;
    let mut best: u8 = 0;

    for (idx, step) in D8_DIST.iter().enumerate() {
        let Some((nr, nc)) = d8_neighbor(row, col, idx, rows, cols) else {
            continue;
        };
        let neighbor = unsafe { dem.get_unchecked(nr, nc) };
        if is_void(neighbor, nodata) {
            continue;
        }

        let drop = (center - neighbor) / (step * cell_size);
        if drop > max_drop {
            max_drop = drop;
            best = (idx + 1) as u8;
        }
    }

    best
}
