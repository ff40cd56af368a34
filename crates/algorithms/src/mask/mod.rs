//! Raster masking
//!
//! The raster half of the corridor: cut a surface down to a region, keep
//! the cells that pass a threshold, and turn what is left into polygons.
//! - Clip: cells whose centers fall inside a polygon region
//! - Reclassify: ordered range table to class values
//! - Polygonize: valid cells to a dissolved multipolygon

mod clip;
mod polygonize;
mod reclassify;

pub use clip::{clip_to_region, rasterize_region, RegionMask};
pub use polygonize::{polygonize, PolygonizeParams};
pub use reclassify::{reclassify, ReclassEntry, ReclassifyParams};
