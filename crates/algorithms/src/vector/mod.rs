//! Vector analysis algorithms
//!
//! Geometric operations on polygons and lines:
//! - Buffer: round-capped buffers of points, lines and polygons
//! - Union / dissolve / selection by intersection
//! - Aggregate: merge nearby parts, fill holes, drop slivers
//! - Smooth: Gaussian relaxation of polygon outlines
//! - Simplify: Douglas-Peucker
//! - Measurements: area, length, perimeter, midpoint along a line

mod aggregate;
mod buffer;
mod measurements;
mod simplify;
mod smooth;
mod spatial;

pub use aggregate::{aggregate, AggregateParams};
pub use buffer::{buffer_geometry, buffer_lines, buffer_points, buffer_polygons, BufferParams};
pub use measurements::{area, length, midpoint_along, perimeter};
pub use simplify::simplify_dp;
pub use smooth::{smooth, SmoothParams};
pub use spatial::{dissolve, select_by_intersection, union_all};
