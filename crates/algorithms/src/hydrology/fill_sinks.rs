//! Depression filling
//!
//! Planchon-Darboux (2001): start from a surface that is infinitely high
//! everywhere except at the outlets, then repeatedly lower each cell to the
//! lowest value that still drains to an already-settled neighbor.
//!
//! Reference:
//! Planchon, O., Darboux, F. (2001). A fast, simple and versatile algorithm
//! to fill the depressions of digital elevation models.
//! Catena, 46(2-3), 159-176.

use super::{d8_neighbor, is_void, D8_DIST};
use ndarray::Array2;
use floodplain_core::raster::Raster;
use floodplain_core::{Algorithm, Error, Result};

/// Parameters for sink filling
#[derive(Debug, Clone)]
pub struct FillSinksParams {
    /// Gradient imposed across filled areas (elevation units per cell-size
    /// unit). Zero leaves filled depressions perfectly flat, which D8 cannot
    /// route across.
    pub min_slope: f64,
}

impl Default for FillSinksParams {
    fn default() -> Self {
        Self { min_slope: 0.01 }
    }
}

/// Fill sinks algorithm
#[derive(Debug, Clone, Default)]
pub struct FillSinks;

impl Algorithm for FillSinks {
    type Input = Raster<f64>;
    type Output = Raster<f64>;
    type Params = FillSinksParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Fill Sinks"
    }

    fn description(&self) -> &'static str {
        "Fill depressions in a DEM using the Planchon-Darboux (2001) method"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        fill_sinks(&input, params)
    }
}

/// Water surface value for cells not yet settled
const UNSETTLED: f64 = f64::MAX / 2.0;

/// Fill depressions so that every valid cell has a non-ascending path to
/// an outlet.
///
/// Outlets are cells on the grid edge and cells adjacent to no-data, so
/// clipped DEMs drain into their voids. No-data cells stay NaN.
pub fn fill_sinks(dem: &Raster<f64>, params: FillSinksParams) -> Result<Raster<f64>> {
    if !params.min_slope.is_finite() || params.min_slope < 0.0 {
        return Err(Error::InvalidParameter {
            name: "min_slope",
            value: params.min_slope.to_string(),
            reason: "must be a finite, non-negative gradient".into(),
        });
    }

    let (rows, cols) = dem.shape();
    let nodata = dem.nodata();
    let epsilon = params.min_slope * dem.cell_size().abs();
    let z = dem.data();

    let mut w = Array2::from_elem((rows, cols), UNSETTLED);
    for row in 0..rows {
        for col in 0..cols {
            let value = z[(row, col)];
            if is_void(value, nodata) {
                w[(row, col)] = f64::NAN;
            } else if is_outlet(z, nodata, row, col) {
                w[(row, col)] = value;
            }
        }
    }

    let forward: Vec<(usize, usize)> = (0..rows)
        .flat_map(|row| (0..cols).map(move |col| (row, col)))
        .collect();

    loop {
        let mut changed = relax(&mut w, z, epsilon, forward.iter().copied());
        changed |= relax(&mut w, z, epsilon, forward.iter().rev().copied());
        if !changed {
            break;
        }
    }

    let mut output = dem.like(f64::NAN);
    output.set_nodata(Some(f64::NAN));
    *output.data_mut() = w;
    Ok(output)
}

/// Edge of the grid or touching a void cell
fn is_outlet(z: &Array2<f64>, nodata: Option<f64>, row: usize, col: usize) -> bool {
    let (rows, cols) = z.dim();
    if row == 0 || col == 0 || row + 1 == rows || col + 1 == cols {
        return true;
    }
    (0..8).any(|idx| {
        d8_neighbor(row, col, idx, rows, cols).is_some_and(|(nr, nc)| is_void(z[(nr, nc)], nodata))
    })
}

/// One sweep over `order`. Returns whether any cell was lowered.
fn relax(
    w: &mut Array2<f64>,
    z: &Array2<f64>,
    epsilon: f64,
    order: impl Iterator<Item = (usize, usize)>,
) -> bool {
    let (rows, cols) = w.dim();
    let mut changed = false;

    for (row, col) in order {
        let ground = z[(row, col)];
        let current = w[(row, col)];
        if current.is_nan() || current <= ground {
            continue;
        }

        for (idx, step) in D8_DIST.iter().enumerate() {
            let Some((nr, nc)) = d8_neighbor(row, col, idx, rows, cols) else {
                continue;
            };
            let wn = w[(nr, nc)];
            if wn.is_nan() || wn >= UNSETTLED {
                continue;
            }

            let spill = wn + epsilon * step;
            if ground >= spill {
                w[(row, col)] = ground;
                changed = true;
                break;
            }
            if w[(row, col)] > spill {
                w[(row, col)] = spill;
                changed = true;
            }
        }
    }

    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use floodplain_core::GeoTransform;

    fn bowl() -> Raster<f64> {
        // 9 on the rim, 7 inside, a 3 in the middle
        let mut dem = Raster::filled(7, 7, 7.0);
        dem.set_transform(GeoTransform::new(0.0, 7.0, 1.0, -1.0));
        for i in 0..7 {
            dem.set(0, i, 9.0).unwrap();
            dem.set(6, i, 9.0).unwrap();
            dem.set(i, 0, 9.0).unwrap();
            dem.set(i, 6, 9.0).unwrap();
        }
        dem.set(3, 3, 3.0).unwrap();
        dem
    }

    #[test]
    fn test_fill_raises_pit_to_spill_level() {
        let filled = fill_sinks(&bowl(), FillSinksParams { min_slope: 0.0 }).unwrap();
        // The whole interior ponds up to the rim
        assert_eq!(filled.get(3, 3).unwrap(), 9.0);
        assert_eq!(filled.get(2, 4).unwrap(), 9.0);
        assert_eq!(filled.get(0, 0).unwrap(), 9.0);
    }

    #[test]
    fn test_fill_with_outlet_stops_at_outlet() {
        let mut dem = bowl();
        dem.set(6, 3, 2.0).unwrap();
        let filled = fill_sinks(&dem, FillSinksParams { min_slope: 0.0 }).unwrap();

        // Interior drains through the notch; only the pit is raised
        assert_eq!(filled.get(3, 3).unwrap(), 7.0);
        assert_eq!(filled.get(1, 1).unwrap(), 7.0);
        assert_eq!(filled.get(6, 3).unwrap(), 2.0);
    }

    #[test]
    fn test_fill_never_lowers_and_keeps_clean_plane() {
        let mut dem = Raster::new(10, 10);
        dem.set_transform(GeoTransform::new(0.0, 10.0, 1.0, -1.0));
        for row in 0..10 {
            for col in 0..10 {
                dem.set(row, col, (row + col) as f64).unwrap();
            }
        }

        let filled = fill_sinks(&dem, FillSinksParams::default()).unwrap();
        for row in 0..10 {
            for col in 0..10 {
                assert_eq!(filled.get(row, col).unwrap(), dem.get(row, col).unwrap());
            }
        }
    }

    #[test]
    fn test_min_slope_leaves_gradient_across_fill() {
        let filled = fill_sinks(&bowl(), FillSinksParams { min_slope: 0.01 }).unwrap();
        let center = filled.get(3, 3).unwrap();
        let near_rim = filled.get(1, 3).unwrap();
        assert!(center > near_rim, "center {} should sit above {}", center, near_rim);
        assert!(center < 9.1);
    }

    #[test]
    fn test_void_cells_act_as_outlets() {
        let mut dem = bowl();
        dem.set(3, 4, f64::NAN).unwrap();
        let filled = fill_sinks(&dem, FillSinksParams { min_slope: 0.0 }).unwrap();

        assert!(filled.get(3, 4).unwrap().is_nan());
        // The pit touches the void and keeps its elevation
        assert_eq!(filled.get(3, 3).unwrap(), 3.0);
    }

    #[test]
    fn test_negative_min_slope_rejected() {
        let result = fill_sinks(&bowl(), FillSinksParams { min_slope: -1.0 });
        assert!(matches!(result, Err(Error::InvalidParameter { name: "min_slope", .. })));
    }

    #[test]
    fn test_algorithm_trait() {
        let algo = FillSinks;
        assert_eq!(algo.name(), "Fill Sinks");
        let filled = algo.execute_default(bowl()).unwrap();
        assert!(filled.get(3, 3).unwrap() >= 9.0);
    }
}
