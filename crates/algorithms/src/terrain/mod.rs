//! Terrain analysis
//!
//! Slope is the only terrain derivative the corridor needs: tiers admit
//! cells by a slope threshold in degrees.

mod slope;

pub use slope::{slope, Slope, SlopeParams, SlopeUnits};
