//! Hydrological conditioning and routing
//!
//! The chain used to derive drainage area from a bare DEM:
//! - Fill sinks: Planchon-Darboux depression removal
//! - Flow direction: D8 steepest descent
//! - Flow accumulation: upstream cell counts
//! - Drainage area: accumulation scaled to square kilometers

pub(crate) mod drainage_area;
pub(crate) mod fill_sinks;
pub(crate) mod flow_accumulation;
pub(crate) mod flow_direction;

pub use drainage_area::{
    accumulation_to_drainage_area, drainage_area, mask_dem_voids, DrainageArea, DrainageAreaParams,
    SQ_M_PER_SQ_KM,
};
pub use fill_sinks::{fill_sinks, FillSinks, FillSinksParams};
pub use flow_accumulation::{flow_accumulation, FlowAccumulation};
pub use flow_direction::{flow_direction, FlowDirection};

/// D8 neighbor offsets `(row, col)` in direction-code order.
///
/// ```text
///   4  3  2
///   5  0  1
///   6  7  8
/// ```
/// Code `k` (1..=8) moves by `D8_OFFSETS[k - 1]`.
pub(crate) const D8_OFFSETS: [(isize, isize); 8] = [
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
    (1, 0),
    (1, 1),
];

/// Step length of each D8 direction in cell units
pub(crate) const D8_DIST: [f64; 8] = [
    1.0,
    std::f64::consts::SQRT_2,
    1.0,
    std::f64::consts::SQRT_2,
    1.0,
    std::f64::consts::SQRT_2,
    1.0,
    std::f64::consts::SQRT_2,
];

/// Neighbor of `(row, col)` in D8 direction index `idx`, if inside the grid
#[inline]
pub(crate) fn d8_neighbor(
    row: usize,
    col: usize,
    idx: usize,
    rows: usize,
    cols: usize,
) -> Option<(usize, usize)> {
    let (dr, dc) = D8_OFFSETS[idx];
    let nr = row as isize + dr;
    let nc = col as isize + dc;
    (nr >= 0 && nc >= 0 && (nr as usize) < rows && (nc as usize) < cols)
        .then_some((nr as usize, nc as usize))
}

/// NaN or equal to the declared no-data sentinel
#[inline]
pub(crate) fn is_void(value: f64, nodata: Option<f64>) -> bool {
    value.is_nan() || nodata.is_some_and(|nd| (value - nd).abs() < f64::EPSILON)
}
