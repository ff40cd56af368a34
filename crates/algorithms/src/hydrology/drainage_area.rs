//! Drainage area in square kilometers
//!
//! Chains fill sinks, D8 direction and accumulation, then converts upstream
//! cell counts to area with the raster's own cell size.

use super::fill_sinks::{fill_sinks, FillSinksParams};
use super::flow_accumulation::flow_accumulation;
use super::flow_direction::flow_direction;
use super::is_void;
use crate::maybe_rayon::*;
use floodplain_core::raster::Raster;
use floodplain_core::{Algorithm, Error, Result};
use ndarray::Zip;

/// Square meters per square kilometer
pub const SQ_M_PER_SQ_KM: f64 = 1.0e6;

/// Parameters for deriving drainage area from a DEM
#[derive(Debug, Clone, Default)]
pub struct DrainageAreaParams {
    /// Conditioning applied before routing
    pub fill: FillSinksParams,
}

/// Drainage area algorithm: DEM in, km² out
#[derive(Debug, Clone, Default)]
pub struct DrainageArea;

impl Algorithm for DrainageArea {
    type Input = Raster<f64>;
    type Output = Raster<f64>;
    type Params = DrainageAreaParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Drainage Area"
    }

    fn description(&self) -> &'static str {
        "Upstream contributing area in km² via fill, D8 routing and accumulation"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        drainage_area(&input, params)
    }
}

/// Derive a drainage-area surface (km²) from a DEM.
///
/// The output shares the DEM's grid. Cells that are no-data in the DEM are
/// NaN in the output.
pub fn drainage_area(dem: &Raster<f64>, params: DrainageAreaParams) -> Result<Raster<f64>> {
    let filled = fill_sinks(dem, params.fill)?;
    let directions = flow_direction(&filled)?;
    let mut accumulation = flow_accumulation(&directions)?;
    mask_dem_voids(&mut accumulation, dem)?;
    accumulation_to_drainage_area(&accumulation)
}

/// Set accumulation cells to NaN wherever the DEM is no-data.
///
/// Fill sinks routes voids as outlets, so without this they would carry a
/// count of zero instead of being void.
pub fn mask_dem_voids(accumulation: &mut Raster<f64>, dem: &Raster<f64>) -> Result<()> {
    let (er, ec) = dem.shape();
    let (ar, ac) = accumulation.shape();
    if (er, ec) != (ar, ac) {
        return Err(Error::SizeMismatch { er, ec, ar, ac });
    }

    let nodata = dem.nodata();
    Zip::from(accumulation.data_mut())
        .and(dem.data())
        .for_each(|acc, &z| {
            if is_void(z, nodata) {
                *acc = f64::NAN;
            }
        });
    Ok(())
}

/// Convert an upstream cell-count raster to km² using its cell area.
///
/// No-data cells become NaN. Negative counts are rejected.
pub fn accumulation_to_drainage_area(accumulation: &Raster<f64>) -> Result<Raster<f64>> {
    let cell_area = accumulation.cell_area();
    if !(cell_area.is_finite() && cell_area > 0.0) {
        return Err(Error::InvalidParameter {
            name: "cell_area",
            value: cell_area.to_string(),
            reason: "accumulation raster needs a non-degenerate geotransform".into(),
        });
    }

    let (rows, cols) = accumulation.shape();
    let nodata = accumulation.nodata();
    let scale = cell_area / SQ_M_PER_SQ_KM;

    let converted: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            (0..cols)
                .map(|col| {
                    let count = unsafe { accumulation.get_unchecked(row, col) };
                    if is_void(count, nodata) {
                        f64::NAN
                    } else {
                        count * scale
                    }
                })
                .collect::<Vec<f64>>()
        })
        .collect();

    if let Some(bad) = converted.iter().find(|v| **v < 0.0) {
        return Err(Error::InvalidParameter {
            name: "accumulation",
            value: (bad / scale).to_string(),
            reason: "upstream cell counts cannot be negative".into(),
        });
    }

    let mut output = accumulation.with_same_meta::<f64>(rows, cols);
    output.set_nodata(Some(f64::NAN));
    *output.data_mut() = ndarray::Array2::from_shape_vec((rows, cols), converted)
        .map_err(|e| Error::Other(e.to_string()))?;
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use floodplain_core::GeoTransform;

    /// V-shaped valley draining south, 100 m cells
    fn valley(rows: usize, cols: usize) -> Raster<f64> {
        let mid = (cols / 2) as f64;
        let mut dem = Raster::new(rows, cols);
        dem.set_transform(GeoTransform::new(0.0, rows as f64 * 100.0, 100.0, -100.0));
        for row in 0..rows {
            for col in 0..cols {
                let side = (col as f64 - mid).abs() * 5.0;
                let fall = (rows - row) as f64 * 2.0;
                dem.set(row, col, 100.0 + side + fall).unwrap();
            }
        }
        dem
    }

    #[test]
    fn test_conversion_uses_cell_area() {
        let mut acc = Raster::filled(2, 2, 50.0);
        acc.set_transform(GeoTransform::new(0.0, 60.0, 30.0, -30.0));
        acc.set(1, 1, f64::NAN).unwrap();

        let da = accumulation_to_drainage_area(&acc).unwrap();
        assert_relative_eq!(da.get(0, 0).unwrap(), 50.0 * 900.0 / 1e6, epsilon = 1e-12);
        assert!(da.get(1, 1).unwrap().is_nan());
    }

    #[test]
    fn test_negative_counts_rejected() {
        let mut acc = Raster::filled(2, 2, 1.0);
        acc.set_transform(GeoTransform::new(0.0, 2.0, 1.0, -1.0));
        acc.set(0, 1, -3.0).unwrap();
        assert!(accumulation_to_drainage_area(&acc).is_err());
    }

    #[test]
    fn test_monotonic_downstream_along_thalweg() {
        let dem = valley(20, 11);
        let da = drainage_area(&dem, DrainageAreaParams::default()).unwrap();

        let thalweg: Vec<f64> = (0..20).map(|r| da.get(r, 5).unwrap()).collect();
        for pair in thalweg.windows(2) {
            assert!(pair[1] > pair[0], "drainage area must grow downstream: {:?}", thalweg);
        }
        // Outlet collects most of the grid: 0.01 km² per cell
        assert!(thalweg[19] > 1.0);
    }

    #[test]
    fn test_void_cells_stay_void() {
        let mut dem = valley(10, 7);
        dem.set(0, 0, f64::NAN).unwrap();
        let da = DrainageArea.execute_default(dem).unwrap();
        assert!(da.get(0, 0).unwrap().is_nan());
        assert!(da.get(9, 3).unwrap() > 0.0);
    }

    #[test]
    fn test_sentinel_voids_masked() {
        let mut dem = valley(6, 5);
        dem.set_nodata(Some(-9999.0));
        dem.set(2, 2, -9999.0).unwrap();

        let mut acc = Raster::filled(6, 5, 3.0);
        acc.set_transform(*dem.transform());
        mask_dem_voids(&mut acc, &dem).unwrap();
        assert!(acc.get(2, 2).unwrap().is_nan());
        assert_eq!(acc.get(2, 1).unwrap(), 3.0);

        let mut wrong = Raster::filled(3, 3, 1.0);
        assert!(matches!(mask_dem_voids(&mut wrong, &dem), Err(Error::SizeMismatch { .. })));
    }
}
