//! Drainage area provider
//!
//! Supplies upstream contributing area (km²) per cell, either derived from
//! the DEM (fill sinks, D8 direction, accumulation, cell area) or taken
//! from the caller. Derivation is the expensive part of a run, so a
//! derived surface can be cached next to the DEM.

use crate::engine::Engine;
use crate::error::Result;
use floodplain_algorithms::hydrology::{accumulation_to_drainage_area, mask_dem_voids};
use floodplain_core::io::{read_geotiff, write_geotiff};
use floodplain_core::Raster;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Where the drainage-area surface comes from
#[derive(Debug, Clone, Default)]
pub enum DrainageAreaSource {
    /// Derive from the DEM on every run
    #[default]
    Derive,
    /// Derive once and persist next to the DEM
    Cached(DrainageAreaCache),
    /// Drainage area in km², used as-is
    Supplied(Raster<f64>),
    /// Upstream cell counts, converted to km² with the grid's cell area
    Accumulation(Raster<f64>),
}

/// Derive drainage area from a DEM. DEM voids are NaN in the result.
pub fn derive_drainage_area<E: Engine + ?Sized>(engine: &E, dem: &Raster<f64>) -> Result<Raster<f64>> {
    let filled = engine.fill_sinks(dem)?;
    let direction = engine.flow_direction(&filled)?;
    let mut accumulation = engine.flow_accumulation(&direction)?;
    mask_dem_voids(&mut accumulation, dem)?;
    let mut area = accumulation_to_drainage_area(&accumulation)?;
    area.set_crs(dem.crs().cloned());
    Ok(area)
}

/// Produce the drainage-area surface for a run
pub fn provide<E: Engine + ?Sized>(engine: &E, dem: &Raster<f64>, source: DrainageAreaSource) -> Result<Raster<f64>> {
    match source {
        DrainageAreaSource::Derive => {
            info!("Deriving drainage area from DEM");
            derive_drainage_area(engine, dem)
        }
        DrainageAreaSource::Cached(cache) => cache.load_or_derive(engine, dem),
        DrainageAreaSource::Supplied(raster) => {
            debug!("Using supplied drainage area ({} x {})", raster.cols(), raster.rows());
            Ok(raster)
        }
        DrainageAreaSource::Accumulation(counts) => {
            debug!("Converting supplied flow accumulation to drainage area");
            Ok(accumulation_to_drainage_area(&counts)?)
        }
    }
}

/// Derived drainage area persisted as `<dem-stem>_drainage_area.tif`
#[derive(Debug, Clone)]
pub struct DrainageAreaCache {
    dem_path: PathBuf,
    path: PathBuf,
}

impl DrainageAreaCache {
    /// Cache file next to the DEM at `dem_path`
    pub fn for_dem<P: AsRef<Path>>(dem_path: P) -> Self {
        let dem_path = dem_path.as_ref().to_path_buf();
        let stem = dem_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "dem".to_string());
        let path = dem_path.with_file_name(format!("{}_drainage_area.tif", stem));
        Self { dem_path, path }
    }

    /// Location of the cached surface
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether a cached surface exists and is at least as new as the DEM
    pub fn is_fresh(&self) -> bool {
        let modified = |p: &Path| std::fs::metadata(p).and_then(|m| m.modified()).ok();
        match (modified(&self.path), modified(&self.dem_path)) {
            (Some(cache), Some(dem)) => cache >= dem,
            (Some(_), None) => true,
            _ => false,
        }
    }

    /// Reuse the cached surface when fresh, otherwise derive and store it.
    ///
    /// A cache that cannot be read or does not match the DEM grid is
    /// rebuilt. Failing to write the cache is logged, not fatal.
    pub fn load_or_derive<E: Engine + ?Sized>(&self, engine: &E, dem: &Raster<f64>) -> Result<Raster<f64>> {
        if self.is_fresh() {
            match read_geotiff::<f64, _>(&self.path) {
                Ok(cached) if cached.shape() == dem.shape() && cached.transform() == dem.transform() => {
                    info!("Reusing cached drainage area {}", self.path.display());
                    return Ok(cached);
                }
                Ok(_) => warn!("Cached drainage area {} does not match the DEM grid", self.path.display()),
                Err(e) => warn!("Cannot read cached drainage area {}: {}", self.path.display(), e),
            }
        }

        info!("Deriving drainage area from DEM");
        let area = derive_drainage_area(engine, dem)?;
        match write_geotiff(&area, &self.path, None) {
            Ok(()) => info!("Drainage area cached at {}", self.path.display()),
            Err(e) => warn!("Cannot write drainage area cache {}: {}", self.path.display(), e),
        }
        Ok(area)
    }
}
