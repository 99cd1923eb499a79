//! Raw GeoJSON shapes as delivered by upstream sources.
//!
//! Geometry is parsed leniently: anything that does not form a valid
//! geometry of its declared type becomes `None` instead of an error.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{FeatureGeometry, GeoPoint, PolygonRings};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(rename = "type", default = "collection_type")]
    pub collection_type: String,
    #[serde(default)]
    pub features: Vec<RawFeature>,
}

fn collection_type() -> String {
    "FeatureCollection".to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawFeature {
    #[serde(default)]
    pub geometry: Option<RawGeometry>,
    #[serde(default)]
    pub properties: Option<Map<String, Value>>,
}

impl RawFeature {
    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.as_ref()?.get(key).filter(|v| !v.is_null())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawGeometry {
    #[serde(rename = "type")]
    pub geometry_type: String,
    #[serde(default)]
    pub coordinates: Value,
}

impl RawGeometry {
    /// Parse into a typed geometry; `None` for unknown types or bad coordinates
    pub fn parse(&self) -> Option<FeatureGeometry> {
        let c = &self.coordinates;
        let geometry = match self.geometry_type.as_str() {
            "Point" => FeatureGeometry::Point(parse_position(c)?),
            "LineString" => FeatureGeometry::LineString(parse_line(c)?),
            "MultiLineString" => FeatureGeometry::MultiLineString(
                c.as_array()?.iter().map(parse_line).collect::<Option<_>>()?,
            ),
            "Polygon" => FeatureGeometry::Polygon(parse_rings(c)?),
            "MultiPolygon" => FeatureGeometry::MultiPolygon(
                c.as_array()?.iter().map(parse_rings).collect::<Option<_>>()?,
            ),
            _ => return None,
        };
        Some(geometry)
    }
}

fn parse_position(value: &Value) -> Option<GeoPoint> {
    let position: Vec<f64> = value
        .as_array()?
        .iter()
        .map(Value::as_f64)
        .collect::<Option<_>>()?;
    GeoPoint::from_position(&position).filter(GeoPoint::is_finite)
}

fn parse_line(value: &Value) -> Option<Vec<GeoPoint>> {
    value.as_array()?.iter().map(parse_position).collect()
}

fn parse_rings(value: &Value) -> Option<PolygonRings> {
    value.as_array()?.iter().map(parse_line).collect()
}
