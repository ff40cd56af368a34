//! GeoJSON feature collections
//!
//! Projected data in GeoJSON predates RFC 7946, so the legacy top-level
//! `crs` member (`{"type": "name", "properties": {"name": "EPSG:26911"}}`)
//! is read on input and written on output.

use crate::crs::CRS;
use crate::error::Result;
use crate::vector::{AttributeValue, Feature, FeatureCollection};
use geojson::{feature::Id, GeoJson, JsonObject, JsonValue};
use serde_json::json;
use std::fs;
use std::path::Path;

/// Read a GeoJSON file into features plus the declared CRS, if any
pub fn read_geojson<P: AsRef<Path>>(path: P) -> Result<(FeatureCollection, Option<CRS>)> {
    let text = fs::read_to_string(path.as_ref())?;
    read_geojson_str(&text)
}

/// Parse GeoJSON text. A bare Feature or Geometry is wrapped into a
/// one-element collection.
pub fn read_geojson_str(text: &str) -> Result<(FeatureCollection, Option<CRS>)> {
    let parsed: GeoJson = text.parse()?;

    let (features, crs) = match parsed {
        GeoJson::FeatureCollection(fc) => {
            let crs = fc.foreign_members.as_ref().and_then(crs_member);
            (fc.features, crs)
        }
        GeoJson::Feature(f) => {
            let crs = f.foreign_members.as_ref().and_then(crs_member);
            (vec![f], crs)
        }
        GeoJson::Geometry(g) => (vec![geojson::Feature::from(g)], None),
    };

    let collection = features
        .into_iter()
        .map(convert_feature)
        .collect::<Result<FeatureCollection>>()?;
    Ok((collection, crs))
}

/// Serialize features as a GeoJSON FeatureCollection string
pub fn to_geojson_string(features: &FeatureCollection, crs: Option<&CRS>) -> String {
    let out: Vec<geojson::Feature> = features.iter().map(export_feature).collect();

    let foreign_members = crs.map(|crs| {
        let mut members = JsonObject::new();
        members.insert(
            "crs".to_string(),
            json!({ "type": "name", "properties": { "name": crs.identifier() } }),
        );
        members
    });

    GeoJson::FeatureCollection(geojson::FeatureCollection {
        bbox: None,
        features: out,
        foreign_members,
    })
    .to_string()
}

/// Write features to a GeoJSON file
pub fn write_geojson<P: AsRef<Path>>(path: P, features: &FeatureCollection, crs: Option<&CRS>) -> Result<()> {
    fs::write(path.as_ref(), to_geojson_string(features, crs))?;
    Ok(())
}

fn crs_member(members: &JsonObject) -> Option<CRS> {
    let name = members.get("crs")?.get("properties")?.get("name")?.as_str()?;
    CRS::parse(name)
}

fn convert_feature(feature: geojson::Feature) -> Result<Feature> {
    let geometry = feature
        .geometry
        .map(geo_types::Geometry::<f64>::try_from)
        .transpose()?;

    let id = feature.id.map(|id| match id {
        Id::String(s) => s,
        Id::Number(n) => n.to_string(),
    });

    let properties = feature
        .properties
        .unwrap_or_default()
        .into_iter()
        .map(|(k, v)| (k, attribute_from_json(v)))
        .collect();

    Ok(Feature {
        geometry,
        properties,
        id,
    })
}

fn export_feature(feature: &Feature) -> geojson::Feature {
    let properties: JsonObject = feature
        .properties
        .iter()
        .map(|(k, v)| (k.clone(), attribute_to_json(v)))
        .collect();

    geojson::Feature {
        bbox: None,
        geometry: feature
            .geometry
            .as_ref()
            .map(|g| geojson::Geometry::new(geojson::Value::from(g))),
        id: feature.id.clone().map(Id::String),
        properties: Some(properties),
        foreign_members: None,
    }
}

fn attribute_from_json(value: JsonValue) -> AttributeValue {
    match value {
        JsonValue::Null => AttributeValue::Null,
        JsonValue::Bool(b) => AttributeValue::Bool(b),
        JsonValue::Number(n) => match n.as_i64() {
            Some(i) => AttributeValue::Int(i),
            None => AttributeValue::Float(n.as_f64().unwrap_or(f64::NAN)),
        },
        JsonValue::String(s) => AttributeValue::String(s),
        other => AttributeValue::String(other.to_string()),
    }
}

fn attribute_to_json(value: &AttributeValue) -> JsonValue {
    match value {
        AttributeValue::Null => JsonValue::Null,
        AttributeValue::Bool(b) => JsonValue::Bool(*b),
        AttributeValue::Int(i) => json!(i),
        AttributeValue::Float(f) => serde_json::Number::from_f64(*f)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        AttributeValue::String(s) => JsonValue::String(s.clone()),
    }
}

impl From<&Feature> for geojson::Feature {
    fn from(feature: &Feature) -> Self {
        export_feature(feature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use geo_types::Geometry;

    const NETWORK: &str = r#"{
        "type": "FeatureCollection",
        "crs": { "type": "name", "properties": { "name": "urn:ogc:def:crs:EPSG::26911" } },
        "features": [
            { "type": "Feature", "id": 17,
              "properties": { "ReachID": 17, "GNIS_Name": "Asotin Creek", "Slope": 0.012 },
              "geometry": { "type": "LineString", "coordinates": [[0.0, 0.0], [100.0, 5.0]] } },
            { "type": "Feature",
              "properties": null,
              "geometry": { "type": "MultiLineString", "coordinates": [[[100.0, 5.0], [180.0, 9.0]], [[180.0, 9.0], [250.0, 0.0]]] } }
        ]
    }"#;

    #[test]
    fn test_read_network_with_crs() {
        let (fc, crs) = read_geojson_str(NETWORK).unwrap();
        assert_eq!(crs.and_then(|c| c.epsg()), Some(26911));
        assert_eq!(fc.len(), 2);

        let first = &fc.features[0];
        assert_eq!(first.id.as_deref(), Some("17"));
        assert_eq!(first.get_property("ReachID"), Some(&AttributeValue::Int(17)));
        assert_eq!(first.get_property("Slope"), Some(&AttributeValue::Float(0.012)));
        assert!(matches!(first.geometry, Some(Geometry::LineString(_))));
        assert!(matches!(fc.features[1].geometry, Some(Geometry::MultiLineString(_))));
        assert!(fc.features[1].properties.is_empty());
    }

    #[test]
    fn test_write_then_read_keeps_crs_and_attributes() {
        let (fc, crs) = read_geojson_str(NETWORK).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("network.geojson");
        write_geojson(&path, &fc, crs.as_ref()).unwrap();

        let (back, back_crs) = read_geojson(&path).unwrap();
        assert_eq!(back_crs.and_then(|c| c.epsg()), Some(26911));
        assert_eq!(back.len(), 2);
        assert_eq!(
            back.features[0].get_property("GNIS_Name"),
            Some(&AttributeValue::String("Asotin Creek".into()))
        );
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        assert!(matches!(read_geojson_str("{ not json"), Err(Error::GeoJson(_))));
    }
}
