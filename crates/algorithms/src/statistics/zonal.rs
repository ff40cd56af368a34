//! Zonal statistics
//!
//! Summarizes the cells of a value raster that fall inside a polygon zone.
//! A cell belongs to the zone when its center does; a zone too small to
//! contain any cell center is represented by the cell under its centroid.

use crate::mask::rasterize_region;
use crate::maybe_rayon::*;
use floodplain_core::raster::Raster;
use floodplain_core::{Error, Result};
use geo::{Centroid, MultiPolygon};

/// Available zonal statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ZonalStatistic {
    #[default]
    Max,
    Mean,
    Min,
    Sum,
    Count,
}

impl ZonalStatistic {
    fn summarize(self, vals: &[f64]) -> Option<f64> {
        if vals.is_empty() {
            return match self {
                ZonalStatistic::Count => Some(0.0),
                _ => None,
            };
        }
        Some(match self {
            ZonalStatistic::Max => vals.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            ZonalStatistic::Min => vals.iter().copied().fold(f64::INFINITY, f64::min),
            ZonalStatistic::Sum => vals.iter().sum(),
            ZonalStatistic::Mean => vals.iter().sum::<f64>() / vals.len() as f64,
            ZonalStatistic::Count => vals.len() as f64,
        })
    }
}

impl std::str::FromStr for ZonalStatistic {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "max" | "maximum" => Ok(ZonalStatistic::Max),
            "mean" => Ok(ZonalStatistic::Mean),
            "min" | "minimum" => Ok(ZonalStatistic::Min),
            "sum" => Ok(ZonalStatistic::Sum),
            "count" => Ok(ZonalStatistic::Count),
            _ => Err(Error::InvalidParameter {
                name: "statistic",
                value: s.to_string(),
                reason: "expected one of max, mean, min, sum, count".into(),
            }),
        }
    }
}

/// Valid values under the zone
fn zone_values(values: &Raster<f64>, zone: &MultiPolygon<f64>) -> Result<Vec<f64>> {
    let (rows, cols) = values.shape();
    let valid = |v: f64| (!values.is_nodata(v)).then_some(v);

    if let Some(mask) = rasterize_region(values.transform(), rows, cols, zone)? {
        if mask.count() > 0 {
            return Ok(mask
                .cells()
                .filter_map(|(r, c)| valid(unsafe { values.get_unchecked(r, c) }))
                .collect());
        }
    }

    Ok(zone
        .centroid()
        .and_then(|c| values.cell_at(c.x(), c.y()))
        .and_then(|(r, c)| valid(unsafe { values.get_unchecked(r, c) }))
        .into_iter()
        .collect())
}

/// Compute one statistic of `values` inside `zone`.
///
/// No-data cells are ignored. Returns `None` when the zone covers no valid
/// cell (for `Count`, `Some(0.0)`).
pub fn zonal_statistic(
    values: &Raster<f64>,
    zone: &MultiPolygon<f64>,
    statistic: ZonalStatistic,
) -> Result<Option<f64>> {
    let vals = zone_values(values, zone)?;
    Ok(statistic.summarize(&vals))
}

/// Compute one statistic for many zones, in zone order.
pub fn zonal_statistics(
    values: &Raster<f64>,
    zones: &[MultiPolygon<f64>],
    statistic: ZonalStatistic,
) -> Result<Vec<Option<f64>>> {
    (0..zones.len())
        .into_par_iter()
        .map(|i| zonal_statistic(values, &zones[i], statistic))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use floodplain_core::GeoTransform;
    use geo::{Coord, Rect};

    fn ramp() -> Raster<f64> {
        // Value = row * 10 + col on a 10 x 10 grid of 10 m cells
        let values: Vec<f64> = (0..100).map(|i| ((i / 10) * 10 + i % 10) as f64).collect();
        let mut r = Raster::from_vec(values, 10, 10).unwrap();
        r.set_transform(GeoTransform::new(0.0, 100.0, 10.0, -10.0));
        r.set_nodata(Some(f64::NAN));
        r
    }

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> MultiPolygon<f64> {
        MultiPolygon::new(vec![Rect::new(Coord { x: x0, y: y0 }, Coord { x: x1, y: y1 }).to_polygon()])
    }

    #[test]
    fn test_max_and_mean() {
        // Rows 2-3, cols 1-2
        let zone = rect(10.0, 60.0, 30.0, 80.0);
        let r = ramp();
        assert_eq!(zonal_statistic(&r, &zone, ZonalStatistic::Max).unwrap(), Some(32.0));
        assert_eq!(zonal_statistic(&r, &zone, ZonalStatistic::Min).unwrap(), Some(21.0));
        assert_eq!(zonal_statistic(&r, &zone, ZonalStatistic::Mean).unwrap(), Some(26.5));
        assert_eq!(zonal_statistic(&r, &zone, ZonalStatistic::Count).unwrap(), Some(4.0));
        assert_eq!(zonal_statistic(&r, &zone, ZonalStatistic::Sum).unwrap(), Some(106.0));
    }

    #[test]
    fn test_nodata_ignored() {
        let mut r = ramp();
        r.set(3, 2, f64::NAN).unwrap();
        let zone = rect(10.0, 60.0, 30.0, 80.0);
        assert_eq!(zonal_statistic(&r, &zone, ZonalStatistic::Max).unwrap(), Some(31.0));
        assert_eq!(zonal_statistic(&r, &zone, ZonalStatistic::Count).unwrap(), Some(3.0));
    }

    #[test]
    fn test_tiny_zone_uses_centroid_cell() {
        let zone = rect(41.0, 41.0, 43.0, 43.0);
        assert_eq!(zonal_statistic(&ramp(), &zone, ZonalStatistic::Max).unwrap(), Some(54.0));
    }

    #[test]
    fn test_zone_outside() {
        let zone = rect(500.0, 500.0, 600.0, 600.0);
        assert_eq!(zonal_statistic(&ramp(), &zone, ZonalStatistic::Max).unwrap(), None);
        assert_eq!(zonal_statistic(&ramp(), &zone, ZonalStatistic::Count).unwrap(), Some(0.0));
    }

    #[test]
    fn test_many_zones_keep_order() {
        let zones = vec![rect(0.0, 90.0, 10.0, 100.0), rect(90.0, 0.0, 100.0, 10.0)];
        let out = zonal_statistics(&ramp(), &zones, ZonalStatistic::Max).unwrap();
        assert_eq!(out, vec![Some(0.0), Some(99.0)]);
    }

    #[test]
    fn test_parse_statistic() {
        assert_eq!("MAX".parse::<ZonalStatistic>().unwrap(), ZonalStatistic::Max);
        assert!("median".parse::<ZonalStatistic>().is_err());
    }
}
