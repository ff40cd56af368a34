//! Stream networks
//!
//! A network is an ordered list of line segments with stable identifiers
//! and attributes. The pipeline reads geometry and writes one attribute,
//! `DrainageAreaSqKm`; geometry is never modified.

use crate::error::{CorridorError, Result};
use floodplain_core::io::{read_geojson, write_geojson};
use floodplain_core::vector::{AttributeValue, Feature, FeatureCollection};
use floodplain_core::CRS;
use geo::{Geometry, MultiLineString};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

/// Attribute holding the truncated drainage area (km²) of a segment
pub const DRAINAGE_AREA_FIELD: &str = "DrainageAreaSqKm";

/// Stable identifier of a segment
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SegmentId(pub String);

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One stream segment
#[derive(Debug, Clone)]
pub struct Segment {
    pub id: SegmentId,
    pub geometry: MultiLineString<f64>,
    pub attributes: BTreeMap<String, AttributeValue>,
}

impl Segment {
    pub fn new(id: impl Into<String>, geometry: MultiLineString<f64>) -> Self {
        Self {
            id: SegmentId(id.into()),
            geometry,
            attributes: BTreeMap::new(),
        }
    }

    /// Drainage area written by the classifier, if any
    pub fn drainage_area(&self) -> Option<i64> {
        self.attributes.get(DRAINAGE_AREA_FIELD).and_then(AttributeValue::as_i64)
    }
}

/// Ordered collection of stream segments in one CRS
#[derive(Debug, Clone, Default)]
pub struct StreamNetwork {
    segments: Vec<Segment>,
    crs: Option<CRS>,
}

impl StreamNetwork {
    pub fn new(segments: Vec<Segment>, crs: Option<CRS>) -> Self {
        Self { segments, crs }
    }

    /// Build a network from features.
    ///
    /// Every feature must carry a LineString or MultiLineString. Segment ids
    /// come from the feature id, falling back to the position in the
    /// collection.
    pub fn from_features(features: FeatureCollection, crs: Option<CRS>) -> Result<Self> {
        let segments = features
            .into_iter()
            .enumerate()
            .map(|(i, feature)| {
                let id = feature.id.clone().unwrap_or_else(|| i.to_string());
                let geometry = match feature.geometry {
                    Some(Geometry::LineString(ls)) => MultiLineString::new(vec![ls]),
                    Some(Geometry::MultiLineString(mls)) => mls,
                    Some(Geometry::Line(l)) => MultiLineString::new(vec![l.into()]),
                    Some(other) => {
                        return Err(CorridorError::InvalidNetwork(format!(
                            "segment {} is a {}, expected a line",
                            id,
                            geometry_name(&other)
                        )))
                    }
                    None => {
                        return Err(CorridorError::InvalidNetwork(format!("segment {} has no geometry", id)))
                    }
                };
                Ok(Segment {
                    id: SegmentId(id),
                    geometry,
                    attributes: feature.properties,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self::new(segments, crs))
    }

    /// Read a network from GeoJSON. `crs` overrides the CRS declared in the
    /// file.
    pub fn from_geojson_file<P: AsRef<Path>>(path: P, crs: Option<CRS>) -> Result<Self> {
        let (features, declared) = read_geojson(path)?;
        Self::from_features(features, crs.or(declared))
    }

    /// Segments with their current attributes
    pub fn to_features(&self) -> FeatureCollection {
        self.segments
            .iter()
            .map(|s| Feature {
                geometry: Some(Geometry::MultiLineString(s.geometry.clone())),
                properties: s.attributes.clone(),
                id: Some(s.id.0.clone()),
            })
            .collect()
    }

    /// Write the network, attributes included, as GeoJSON
    pub fn write_geojson<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        write_geojson(path, &self.to_features(), self.crs.as_ref())?;
        Ok(())
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn crs(&self) -> Option<&CRS> {
        self.crs.as_ref()
    }

    pub fn set_crs(&mut self, crs: Option<CRS>) {
        self.crs = crs;
    }

    /// Store the drainage area of the segment at `index`
    pub fn set_drainage_area(&mut self, index: usize, value: i64) {
        if let Some(segment) = self.segments.get_mut(index) {
            segment
                .attributes
                .insert(DRAINAGE_AREA_FIELD.to_string(), AttributeValue::Int(value));
        }
    }

    /// All segment lines as one geometry
    pub fn geometry(&self) -> MultiLineString<f64> {
        self.lines(0..self.len())
    }

    /// Lines of the segments at the given positions
    pub fn lines(&self, indices: impl IntoIterator<Item = usize>) -> MultiLineString<f64> {
        MultiLineString::new(
            indices
                .into_iter()
                .filter_map(|i| self.segments.get(i))
                .flat_map(|s| s.geometry.0.iter().cloned())
                .collect(),
        )
    }
}

fn geometry_name(g: &Geometry<f64>) -> &'static str {
    match g {
        Geometry::Point(_) => "Point",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::Polygon(_) => "Polygon",
        Geometry::MultiPolygon(_) => "MultiPolygon",
        Geometry::Rect(_) => "Rect",
        Geometry::Triangle(_) => "Triangle",
        Geometry::GeometryCollection(_) => "GeometryCollection",
        Geometry::Line(_) | Geometry::LineString(_) | Geometry::MultiLineString(_) => "line",
    }
}
