//! Flow accumulation
//!
//! Counts, for every cell, how many cells drain through it. The count
//! excludes the cell itself, so headwater cells are 0.

use super::d8_neighbor;
use ndarray::Array2;
use floodplain_core::raster::Raster;
use floodplain_core::{Algorithm, Error, Result};

/// Flow accumulation algorithm
#[derive(Debug, Clone, Default)]
pub struct FlowAccumulation;

impl Algorithm for FlowAccumulation {
    type Input = Raster<u8>;
    type Output = Raster<f64>;
    type Params = ();
    type Error = Error;

    fn name(&self) -> &'static str {
        "Flow Accumulation"
    }

    fn description(&self) -> &'static str {
        "Calculate upstream cell counts from D8 flow direction"
    }

    fn execute(&self, input: Self::Input, _params: Self::Params) -> Result<Self::Output> {
        flow_accumulation(&input)
    }
}

/// Downstream cell of `(row, col)` for a D8 code, if it stays on the grid
#[inline]
fn receiver(code: u8, row: usize, col: usize, rows: usize, cols: usize) -> Option<(usize, usize)> {
    match code {
        1..=8 => d8_neighbor(row, col, (code - 1) as usize, rows, cols),
        _ => None,
    }
}

/// Accumulate upstream cell counts over a D8 direction raster.
///
/// Cells are visited in topological order (Kahn): a cell passes its total
/// downstream only after every donor has been counted. Cycles cannot occur
/// in a D8 field derived from elevations, but if a hand-made one contains
/// them the cells on the cycle are simply never released.
pub fn flow_accumulation(flow_dir: &Raster<u8>) -> Result<Raster<f64>> {
    let (rows, cols) = flow_dir.shape();
    let dirs = flow_dir.data();

    let mut donors = Array2::<u8>::zeros((rows, cols));
    for ((row, col), &code) in dirs.indexed_iter() {
        if let Some(down) = receiver(code, row, col, rows, cols) {
            donors[down] += 1;
        }
    }

    let mut ready: Vec<(usize, usize)> = donors
        .indexed_iter()
        .filter(|&(_, &n)| n == 0)
        .map(|(idx, _)| idx)
        .collect();
    let mut accumulation = Array2::<f64>::zeros((rows, cols));

    while let Some((row, col)) = ready.pop() {
        let Some(down) = receiver(dirs[(row, col)], row, col, rows, cols) else {
            continue;
        };

        accumulation[down] += accumulation[(row, col)] + 1.0;
        donors[down] -= 1;
        if donors[down] == 0 {
            ready.push(down);
        }
    }

    let mut output = flow_dir.with_same_meta::<f64>(rows, cols);
    *output.data_mut() = accumulation;
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hydrology::flow_direction::flow_direction;
    use floodplain_core::GeoTransform;

    #[test]
    fn test_linear_strip() {
        let mut dem = Raster::new(1, 5);
        dem.set_transform(GeoTransform::new(0.0, 1.0, 1.0, -1.0));
        for col in 0..5 {
            dem.set(0, col, (5 - col) as f64).unwrap();
        }

        let acc = flow_accumulation(&flow_direction(&dem).unwrap()).unwrap();
        let values: Vec<f64> = (0..5).map(|c| acc.get(0, c).unwrap()).collect();
        assert_eq!(values, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_convergent_center() {
        let mut dem = Raster::filled(3, 3, 5.0);
        dem.set_transform(GeoTransform::new(0.0, 3.0, 1.0, -1.0));
        dem.set(1, 1, 1.0).unwrap();

        let acc = flow_accumulation(&flow_direction(&dem).unwrap()).unwrap();
        assert_eq!(acc.get(1, 1).unwrap(), 8.0);
        assert_eq!(acc.get(0, 0).unwrap(), 0.0);
    }

    #[test]
    fn test_total_is_conserved() {
        // A 4x4 plane draining south: each bottom cell collects its column
        let mut dem = Raster::new(4, 4);
        dem.set_transform(GeoTransform::new(0.0, 4.0, 1.0, -1.0));
        for row in 0..4 {
            for col in 0..4 {
                dem.set(row, col, (4 - row) as f64 * 10.0).unwrap();
            }
        }

        let acc = flow_accumulation(&flow_direction(&dem).unwrap()).unwrap();
        for col in 0..4 {
            assert_eq!(acc.get(0, col).unwrap(), 0.0);
            assert_eq!(acc.get(3, col).unwrap(), 3.0);
        }
    }

    #[test]
    fn test_hand_made_direction_grid() {
        // 1 -> 1 -> 7 ; the last column drains south into a pit
        let mut fdir: Raster<u8> = Raster::new(2, 3);
        fdir.set(0, 0, 1).unwrap();
        fdir.set(0, 1, 1).unwrap();
        fdir.set(0, 2, 7).unwrap();

        let acc = FlowAccumulation.execute(fdir, ()).unwrap();
        assert_eq!(acc.get(0, 2).unwrap(), 2.0);
        assert_eq!(acc.get(1, 2).unwrap(), 3.0);
        assert_eq!(acc.get(1, 0).unwrap(), 0.0);
    }
}
