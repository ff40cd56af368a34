//! Range reclassification
//!
//! Maps cell values to class values through an ordered table of
//! `[min, max)` ranges. The last range also includes its `max`, which is
//! what makes a slope exactly at a tier threshold admissible.

use crate::maybe_rayon::*;
use ndarray::Array2;
use floodplain_core::raster::Raster;
use floodplain_core::{Error, Result};

/// A reclassification entry mapping an input range to an output value
#[derive(Debug, Clone)]
pub struct ReclassEntry {
    /// Minimum value (inclusive)
    pub min: f64,
    /// Maximum value (exclusive, except for the last class)
    pub max: f64,
    /// Output value for this class
    pub value: f64,
}

impl ReclassEntry {
    pub fn new(min: f64, max: f64, value: f64) -> Self {
        Self { min, max, value }
    }
}

/// Parameters for reclassification
#[derive(Debug, Clone)]
pub struct ReclassifyParams {
    /// Classification table, checked in order; first match wins
    pub classes: Vec<ReclassEntry>,
    /// Value for cells that match no class (NaN masks them out)
    pub default_value: f64,
}

impl Default for ReclassifyParams {
    fn default() -> Self {
        Self {
            classes: Vec::new(),
            default_value: f64::NAN,
        }
    }
}

impl ReclassifyParams {
    /// Binary admission table: `value` at or below `threshold`, NaN above.
    pub fn at_or_below(threshold: f64, value: f64) -> Self {
        Self {
            classes: vec![ReclassEntry::new(f64::NEG_INFINITY, threshold, value)],
            default_value: f64::NAN,
        }
    }

    fn classify(&self, v: f64) -> f64 {
        let last = self.classes.len().saturating_sub(1);
        self.classes
            .iter()
            .enumerate()
            .find(|(i, e)| v >= e.min && (v < e.max || (*i == last && v == e.max)))
            .map_or(self.default_value, |(_, e)| e.value)
    }
}

/// Reclassify raster values with a range table.
///
/// No-data input cells stay NaN. The output no-data is NaN.
pub fn reclassify(raster: &Raster<f64>, params: ReclassifyParams) -> Result<Raster<f64>> {
    if let Some(bad) = params.classes.iter().find(|e| e.min.is_nan() || e.max.is_nan() || e.min > e.max) {
        return Err(Error::InvalidParameter {
            name: "classes",
            value: format!("[{}, {})", bad.min, bad.max),
            reason: "range bounds must be ordered numbers".into(),
        });
    }

    let (rows, cols) = raster.shape();

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            (0..cols)
                .map(|col| {
                    let v = unsafe { raster.get_unchecked(row, col) };
                    if raster.is_nodata(v) {
                        f64::NAN
                    } else {
                        params.classify(v)
                    }
                })
                .collect::<Vec<f64>>()
        })
        .collect();

    let mut output = raster.with_same_meta::<f64>(rows, cols);
    output.set_nodata(Some(f64::NAN));
    *output.data_mut() =
        Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))?;

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use floodplain_core::GeoTransform;

    fn slopes() -> Raster<f64> {
        let values = vec![
            0.0, 2.5, 3.99, 4.0, 4.01, //
            6.9, 7.0, 7.01, 11.99, 12.0, //
            12.01, 20.0, 45.0, f64::NAN, 89.0,
        ];
        let mut r = Raster::from_vec(values, 3, 5).unwrap();
        r.set_transform(GeoTransform::new(0.0, 3.0, 1.0, -1.0));
        r
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let admitted = reclassify(&slopes(), ReclassifyParams::at_or_below(7.0, 1.0)).unwrap();
        assert_eq!(admitted.get(1, 0).unwrap(), 1.0);
        assert_eq!(admitted.get(1, 1).unwrap(), 1.0);
        assert!(admitted.get(1, 2).unwrap().is_nan(), "7.01 must be excluded");
    }

    #[test]
    fn test_hundredth_of_a_degree_over_is_excluded() {
        let admitted = reclassify(&slopes(), ReclassifyParams::at_or_below(12.0, 1.0)).unwrap();
        assert_eq!(admitted.get(1, 4).unwrap(), 1.0);
        assert!(admitted.get(2, 0).unwrap().is_nan());
        assert_eq!(admitted.statistics().valid_count, 10);
    }

    #[test]
    fn test_ordered_table() {
        let params = ReclassifyParams {
            classes: vec![
                ReclassEntry::new(0.0, 4.0, 1.0),
                ReclassEntry::new(4.0, 12.0, 2.0),
                ReclassEntry::new(12.0, 45.0, 3.0),
            ],
            default_value: 0.0,
        };
        let result = reclassify(&slopes(), params).unwrap();
        assert_eq!(result.get(0, 2).unwrap(), 1.0);
        assert_eq!(result.get(0, 3).unwrap(), 2.0);
        assert_eq!(result.get(1, 4).unwrap(), 3.0);
        // Last class keeps its upper bound; beyond it falls to the default
        assert_eq!(result.get(2, 2).unwrap(), 3.0);
        assert_eq!(result.get(2, 4).unwrap(), 0.0);
        assert!(result.get(2, 3).unwrap().is_nan());
    }

    #[test]
    fn test_empty_table_uses_default() {
        let params = ReclassifyParams {
            classes: vec![],
            default_value: -1.0,
        };
        let result = reclassify(&slopes(), params).unwrap();
        assert_eq!(result.get(0, 0).unwrap(), -1.0);
    }

    #[test]
    fn test_inverted_range_rejected() {
        let params = ReclassifyParams {
            classes: vec![ReclassEntry::new(5.0, 1.0, 1.0)],
            default_value: f64::NAN,
        };
        assert!(reclassify(&slopes(), params).is_err());
    }
}
