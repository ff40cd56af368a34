//! Grid georeferencing
//!
//! GDAL-order affine coefficients. A cell `(col, row)` spans
//! `[col, col + 1) x [row, row + 1)` in grid space; the helpers here map
//! either its corner or its center to map coordinates.

use serde::{Deserialize, Serialize};

/// Affine map from grid space to map space:
/// ```text
/// x = origin_x + col * pixel_width + row * row_rotation
/// y = origin_y + col * col_rotation + row * pixel_height
/// ```
/// North-up grids have zero rotations and a negative `pixel_height`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    /// Map x of the grid's upper-left corner
    pub origin_x: f64,
    /// Map y of the grid's upper-left corner
    pub origin_y: f64,
    pub pixel_width: f64,
    /// Usually negative
    pub pixel_height: f64,
    pub row_rotation: f64,
    pub col_rotation: f64,
}

impl GeoTransform {
    /// Unrotated transform
    pub fn new(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self {
            origin_x,
            origin_y,
            pixel_width,
            pixel_height,
            row_rotation: 0.0,
            col_rotation: 0.0,
        }
    }

    #[inline]
    fn apply(&self, col: f64, row: f64) -> (f64, f64) {
        (
            self.origin_x + col * self.pixel_width + row * self.row_rotation,
            self.origin_y + col * self.col_rotation + row * self.pixel_height,
        )
    }

    fn determinant(&self) -> f64 {
        self.pixel_width * self.pixel_height - self.row_rotation * self.col_rotation
    }

    /// Map coordinates of the center of cell `(col, row)`
    pub fn pixel_to_geo(&self, col: usize, row: usize) -> (f64, f64) {
        self.apply(col as f64 + 0.5, row as f64 + 0.5)
    }

    /// Map coordinates of the upper-left corner of cell `(col, row)`
    pub fn pixel_to_geo_corner(&self, col: usize, row: usize) -> (f64, f64) {
        self.apply(col as f64, row as f64)
    }

    /// Fractional grid position of a map point; NaN for a degenerate transform
    pub fn geo_to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        let det = self.determinant();
        if det.abs() < 1e-10 {
            return (f64::NAN, f64::NAN);
        }

        let (dx, dy) = (x - self.origin_x, y - self.origin_y);
        (
            (self.pixel_height * dx - self.row_rotation * dy) / det,
            (self.pixel_width * dy - self.col_rotation * dx) / det,
        )
    }

    /// Cell edge length along x. Distances in the pipeline assume square cells.
    pub fn cell_size(&self) -> f64 {
        self.pixel_width.abs()
    }

    /// Map area of one cell
    pub fn cell_area(&self) -> f64 {
        self.determinant().abs()
    }

    /// No rotation terms, so rows run along x and columns along y
    pub fn is_axis_aligned(&self) -> bool {
        self.row_rotation == 0.0 && self.col_rotation == 0.0
    }

    /// `(min_x, min_y, max_x, max_y)` of a `cols x rows` grid
    pub fn bounds(&self, cols: usize, rows: usize) -> (f64, f64, f64, f64) {
        [(0, 0), (cols, 0), (0, rows), (cols, rows)]
            .iter()
            .map(|&(c, r)| self.pixel_to_geo_corner(c, r))
            .fold(
                (f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
                |(x0, y0, x1, y1), (x, y)| (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
            )
    }
}

impl Default for GeoTransform {
    fn default() -> Self {
        Self::new(0.0, 0.0, 1.0, -1.0)
    }
}
