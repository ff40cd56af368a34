//! Slope from a DEM
//!
//! Horn (1981) third-order finite differences over the 3x3 window:
//! ```text
//! a b c
//! d e f
//! g h i
//! ```
//! dz/dx = ((c + 2f + i) - (a + 2d + g)) / (8 * cellsize)
//! dz/dy = ((g + 2h + i) - (a + 2b + c)) / (8 * cellsize)
//!
//! Neighbors that fall off the grid or on no-data take the center value,
//! so edge cells and cells next to voids still get a (one-sided) slope.

use crate::maybe_rayon::*;
use ndarray::Array2;
use floodplain_core::raster::Raster;
use floodplain_core::{Algorithm, Error, Result};

/// Units for slope output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SlopeUnits {
    #[default]
    Degrees,
    Percent,
    Radians,
}

/// Parameters for slope calculation
#[derive(Debug, Clone)]
pub struct SlopeParams {
    pub units: SlopeUnits,
    /// Multiplier applied to elevations (e.g. 0.3048 for feet over meters)
    pub z_factor: f64,
}

impl Default for SlopeParams {
    fn default() -> Self {
        Self {
            units: SlopeUnits::Degrees,
            z_factor: 1.0,
        }
    }
}

/// Slope algorithm
#[derive(Debug, Clone, Default)]
pub struct Slope;

impl Algorithm for Slope {
    type Input = Raster<f64>;
    type Output = Raster<f64>;
    type Params = SlopeParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Slope"
    }

    fn description(&self) -> &'static str {
        "Terrain slope from a DEM using Horn's method"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        slope(&input, params)
    }
}

/// Calculate slope in the requested units. No-data cells are NaN.
pub fn slope(dem: &Raster<f64>, params: SlopeParams) -> Result<Raster<f64>> {
    let (rows, cols) = dem.shape();
    let eight_cell = 8.0 * dem.cell_size().abs();
    if eight_cell == 0.0 || !eight_cell.is_finite() {
        return Err(Error::InvalidParameter {
            name: "cell_size",
            value: dem.cell_size().to_string(),
            reason: "slope needs a non-zero cell size".into(),
        });
    }

    let valid = |v: f64| !dem.is_nodata(v);

    let output_data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];

            for (col, out) in row_data.iter_mut().enumerate() {
                let e = unsafe { dem.get_unchecked(row, col) };
                if !valid(e) {
                    continue;
                }

                let at = |dr: isize, dc: isize| -> f64 {
                    let r = row as isize + dr;
                    let c = col as isize + dc;
                    if r < 0 || c < 0 || r >= rows as isize || c >= cols as isize {
                        return e;
                    }
                    let v = unsafe { dem.get_unchecked(r as usize, c as usize) };
                    if valid(v) {
                        v
                    } else {
                        e
                    }
                };

                let (a, b, c) = (at(-1, -1), at(-1, 0), at(-1, 1));
                let (d, f) = (at(0, -1), at(0, 1));
                let (g, h, i) = (at(1, -1), at(1, 0), at(1, 1));

                let dz_dx = ((c + 2.0 * f + i) - (a + 2.0 * d + g)) / eight_cell * params.z_factor;
                let dz_dy = ((g + 2.0 * h + i) - (a + 2.0 * b + c)) / eight_cell * params.z_factor;
                let rise = dz_dx.hypot(dz_dy);

                *out = match params.units {
                    SlopeUnits::Degrees => rise.atan().to_degrees(),
                    SlopeUnits::Percent => rise * 100.0,
                    SlopeUnits::Radians => rise.atan(),
                };
            }

            row_data
        })
        .collect();

    let mut output = dem.with_same_meta::<f64>(rows, cols);
    output.set_nodata(Some(f64::NAN));
    *output.data_mut() = Array2::from_shape_vec((rows, cols), output_data)
        .map_err(|e| Error::Other(e.to_string()))?;

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use floodplain_core::GeoTransform;

    /// Plane rising northward at `degrees`, 5 m cells
    fn inclined(rows: usize, cols: usize, degrees: f64) -> Raster<f64> {
        let rise = degrees.to_radians().tan() * 5.0;
        let mut dem = Raster::new(rows, cols);
        dem.set_transform(GeoTransform::new(0.0, rows as f64 * 5.0, 5.0, -5.0));
        for row in 0..rows {
            for col in 0..cols {
                dem.set(row, col, (rows - row) as f64 * rise).unwrap();
            }
        }
        dem
    }

    #[test]
    fn test_flat_is_zero() {
        let dem: Raster<f64> = Raster::filled(10, 10, 100.0);
        let result = slope(&dem, SlopeParams::default()).unwrap();
        assert_eq!(result.get(5, 5).unwrap(), 0.0);
        assert_eq!(result.get(0, 0).unwrap(), 0.0);
    }

    #[test]
    fn test_uniform_plane_recovers_angle() {
        let dem = inclined(12, 12, 3.0);
        let result = slope(&dem, SlopeParams::default()).unwrap();
        for row in 1..11 {
            for col in 1..11 {
                assert_relative_eq!(result.get(row, col).unwrap(), 3.0, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn test_edges_are_one_sided() {
        let dem = inclined(6, 6, 10.0);
        let result = slope(&dem, SlopeParams::default()).unwrap();
        let edge = result.get(0, 3).unwrap();
        assert!(edge > 0.0 && edge < 10.0, "edge slope {}", edge);
    }

    #[test]
    fn test_units_agree() {
        let dem = inclined(8, 8, 20.0);
        let deg = slope(&dem, SlopeParams::default()).unwrap();
        let rad = slope(&dem, SlopeParams { units: SlopeUnits::Radians, z_factor: 1.0 }).unwrap();
        let pct = slope(&dem, SlopeParams { units: SlopeUnits::Percent, z_factor: 1.0 }).unwrap();

        let r = rad.get(4, 4).unwrap();
        assert_relative_eq!(deg.get(4, 4).unwrap(), r.to_degrees(), epsilon = 1e-9);
        assert_relative_eq!(pct.get(4, 4).unwrap(), r.tan() * 100.0, epsilon = 1e-9);
    }

    #[test]
    fn test_void_cells_stay_void() {
        let mut dem = inclined(8, 8, 5.0);
        dem.set(4, 4, f64::NAN).unwrap();
        let result = Slope.execute_default(dem).unwrap();
        assert!(result.get(4, 4).unwrap().is_nan());
        assert!(result.get(4, 5).unwrap().is_finite());
    }
}
