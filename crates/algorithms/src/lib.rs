//! # Floodplain Algorithms
//!
//! Raster and vector primitives behind the valley-bottom pipeline.
//!
//! ## Algorithm Categories
//!
//! - **hydrology**: Fill sinks, D8 flow direction, flow accumulation, drainage area
//! - **terrain**: Slope
//! - **mask**: Clip to polygon, range reclassification, polygonize
//! - **statistics**: Zonal statistics inside polygons
//! - **vector**: Buffer, union/dissolve, selection, aggregate, smooth, simplify, measurements

pub mod hydrology;
pub mod mask;
pub(crate) mod maybe_rayon;
pub mod statistics;
pub mod terrain;
pub mod vector;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::hydrology::{
        accumulation_to_drainage_area, drainage_area, fill_sinks, flow_accumulation, flow_direction,
        DrainageArea, DrainageAreaParams, FillSinks, FillSinksParams, FlowAccumulation, FlowDirection,
    };
    pub use crate::mask::{clip_to_region, polygonize, reclassify, PolygonizeParams, ReclassEntry, ReclassifyParams};
    pub use crate::statistics::{zonal_statistic, zonal_statistics, ZonalStatistic};
    pub use crate::terrain::{slope, Slope, SlopeParams, SlopeUnits};
    pub use crate::vector::{
        aggregate, buffer_geometry, buffer_lines, buffer_points, dissolve, select_by_intersection, smooth,
        union_all, AggregateParams, BufferParams, SmoothParams,
    };
    pub use floodplain_core::prelude::*;
}
