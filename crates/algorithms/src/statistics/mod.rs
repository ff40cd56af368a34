//! Statistical summaries of raster data
//!
//! - **zonal**: statistics of a value raster inside polygon zones

pub mod zonal;

pub use zonal::{zonal_statistic, zonal_statistics, ZonalStatistic};
