//! Geometry & raster engine contract
//!
//! The pipeline never calls raster or polygon algorithms directly; it goes
//! through [`Engine`], so another backend can be swapped in (or a recording
//! engine in tests). [`NativeEngine`] runs everything on
//! `floodplain-algorithms`.

use crate::params::{AggregationParameters, SmoothingParameters};
use floodplain_algorithms::hydrology::{self, FillSinksParams};
use floodplain_algorithms::mask::{self, PolygonizeParams, ReclassifyParams};
use floodplain_algorithms::statistics::{self, ZonalStatistic};
use floodplain_algorithms::terrain::{self, SlopeParams};
use floodplain_algorithms::vector::{self, AggregateParams, BufferParams, SmoothParams};
use floodplain_core::{Raster, Result};
use geo::{Geometry, MultiPolygon, Polygon};

/// Raster and vector operations the pipeline depends on.
///
/// Distances are in CRS units; buffers are round-capped and dissolved.
pub trait Engine: Send + Sync {
    fn buffer(&self, geometry: &Geometry<f64>, distance: f64) -> Result<MultiPolygon<f64>>;

    /// Slope in degrees
    fn slope(&self, dem: &Raster<f64>) -> Result<Raster<f64>>;

    fn fill_sinks(&self, dem: &Raster<f64>) -> Result<Raster<f64>>;

    /// D8 direction codes
    fn flow_direction(&self, dem: &Raster<f64>) -> Result<Raster<u8>>;

    /// Upstream cell counts
    fn flow_accumulation(&self, flow_dir: &Raster<u8>) -> Result<Raster<f64>>;

    /// One value per zone, in zone order; `None` where a zone covers no
    /// valid cell
    fn zonal_statistic(
        &self,
        zones: &[MultiPolygon<f64>],
        values: &Raster<f64>,
        statistic: ZonalStatistic,
    ) -> Result<Vec<Option<f64>>>;

    fn clip(&self, raster: &Raster<f64>, region: &MultiPolygon<f64>) -> Result<Raster<f64>>;

    fn reclassify(&self, raster: &Raster<f64>, ranges: &ReclassifyParams) -> Result<Raster<f64>>;

    /// Polygon covering the valid cells of a raster
    fn polygonize(&self, raster: &Raster<f64>, simplify: bool) -> Result<MultiPolygon<f64>>;

    fn dissolve(&self, polygons: &[Polygon<f64>]) -> Result<MultiPolygon<f64>>;

    fn aggregate(&self, polygon: &MultiPolygon<f64>, params: &AggregationParameters) -> Result<MultiPolygon<f64>>;

    fn smooth(&self, polygon: &MultiPolygon<f64>, params: &SmoothingParameters) -> Result<MultiPolygon<f64>>;

    fn select_by_intersection(&self, candidates: &[Polygon<f64>], reference: &Geometry<f64>) -> Result<Vec<Polygon<f64>>>;
}

/// Engine backed by `floodplain-algorithms`
#[derive(Debug, Clone)]
pub struct NativeEngine {
    /// Circle resolution of buffers
    pub buffer_segments: usize,
    pub fill: FillSinksParams,
}

impl NativeEngine {
    pub fn new() -> Self {
        Self {
            buffer_segments: BufferParams::default().segments,
            fill: FillSinksParams::default(),
        }
    }
}

impl Default for NativeEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine for NativeEngine {
    fn buffer(&self, geometry: &Geometry<f64>, distance: f64) -> Result<MultiPolygon<f64>> {
        let params = BufferParams {
            distance,
            segments: self.buffer_segments,
        };
        vector::buffer_geometry(geometry, &params)
    }

    fn slope(&self, dem: &Raster<f64>) -> Result<Raster<f64>> {
        terrain::slope(dem, SlopeParams::default())
    }

    fn fill_sinks(&self, dem: &Raster<f64>) -> Result<Raster<f64>> {
        hydrology::fill_sinks(dem, self.fill.clone())
    }

    fn flow_direction(&self, dem: &Raster<f64>) -> Result<Raster<u8>> {
        hydrology::flow_direction(dem)
    }

    fn flow_accumulation(&self, flow_dir: &Raster<u8>) -> Result<Raster<f64>> {
        hydrology::flow_accumulation(flow_dir)
    }

    fn zonal_statistic(
        &self,
        zones: &[MultiPolygon<f64>],
        values: &Raster<f64>,
        statistic: ZonalStatistic,
    ) -> Result<Vec<Option<f64>>> {
        statistics::zonal_statistics(values, zones, statistic)
    }

    fn clip(&self, raster: &Raster<f64>, region: &MultiPolygon<f64>) -> Result<Raster<f64>> {
        mask::clip_to_region(raster, region)
    }

    fn reclassify(&self, raster: &Raster<f64>, ranges: &ReclassifyParams) -> Result<Raster<f64>> {
        mask::reclassify(raster, ranges.clone())
    }

    fn polygonize(&self, raster: &Raster<f64>, simplify: bool) -> Result<MultiPolygon<f64>> {
        mask::polygonize(
            raster,
            PolygonizeParams {
                simplify,
                ..Default::default()
            },
        )
    }

    fn dissolve(&self, polygons: &[Polygon<f64>]) -> Result<MultiPolygon<f64>> {
        Ok(vector::dissolve(polygons))
    }

    fn aggregate(&self, polygon: &MultiPolygon<f64>, params: &AggregationParameters) -> Result<MultiPolygon<f64>> {
        vector::aggregate(
            polygon,
            &AggregateParams {
                distance: params.distance,
                min_area: params.min_area,
                min_hole_area: params.min_hole_area,
            },
        )
    }

    fn smooth(&self, polygon: &MultiPolygon<f64>, params: &SmoothingParameters) -> Result<MultiPolygon<f64>> {
        vector::smooth(
            polygon,
            &SmoothParams {
                tolerance: params.tolerance,
                fixed_endpoints: params.fixed_endpoints,
            },
        )
    }

    fn select_by_intersection(&self, candidates: &[Polygon<f64>], reference: &Geometry<f64>) -> Result<Vec<Polygon<f64>>> {
        Ok(vector::select_by_intersection(candidates, reference))
    }
}
