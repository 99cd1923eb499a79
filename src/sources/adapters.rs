//! Map raw GeoJSON features onto [`UtilityFeature`].
//!
//! Sources publish the same attribute under different names (`CAPACITYKV`,
//! `voltage`, ...); each field is looked up through a list of aliases, first
//! hit wins. Features whose geometry cannot serve their kind are skipped.

use serde_json::Value;
use tracing::debug;

use crate::geometry::{closest_point_on_lines, haversine_km};
use crate::models::{
    Distance, DistributionZone, EnergyFacility, FeatureCollection, FeatureGeometry, FeatureKind,
    GeoPoint, Hydrant, RawFeature, TransmissionLine, UtilityFeature, WaterMain,
};

const ID_KEYS: &[&str] = &["ASSET_ID", "ASSETID", "asset_id", "id", "OBJECTID"];
const NAME_KEYS: &[&str] = &["name", "NAME", "FEATURE_NAME"];
const FACILITY_TYPE_KEYS: &[&str] = &["featureType", "FEATURETYPE", "power", "CLASS"];
const FACILITY_SUB_TYPE_KEYS: &[&str] = &["featureSubType", "FEATURESUBTYPE", "substation"];
const FACILITY_VOLTAGE_KEYS: &[&str] = &["voltage", "VOLTAGE", "CAPACITYKV"];
const LINE_CAPACITY_KEYS: &[&str] = &[
    "CAPACITYKV",
    "capacityKv",
    "capacity_kv",
    "voltage",
    "VOLTAGE",
];
const DIAMETER_KEYS: &[&str] = &["PIPE_DIAMETER", "DIAMETER", "diameter"];
const MATERIAL_KEYS: &[&str] = &["MATERIAL", "PIPE_MATERIAL", "material"];
const PIPE_TYPE_KEYS: &[&str] = &["PIPE_TYPE", "ASSET_TYPE", "type"];
const STATUS_KEYS: &[&str] = &["SERVICE_STATUS", "STATUS", "status"];
const HYDRANT_ID_KEYS: &[&str] = &["ASSET_ID", "HYDRANT_ID", "asset_id", "OBJECTID"];

/// First alias present, rendered as a trimmed, non-empty string
fn prop_str(raw: &RawFeature, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match raw.property(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// First alias present that parses as a number (leading digits of strings like "150mm")
fn prop_f64(raw: &RawFeature, keys: &[&str]) -> Option<f64> {
    keys.iter().find_map(|key| match raw.property(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => leading_number(s),
        _ => None,
    })
}

fn leading_number(s: &str) -> Option<f64> {
    let s = s.trim();
    let end = s
        .char_indices()
        .find(|(_, c)| !(c.is_ascii_digit() || *c == '.' || *c == '-'))
        .map_or(s.len(), |(i, _)| i);
    s[..end].parse().ok().filter(|v: &f64| v.is_finite())
}

/// Parse a voltage into kV.
///
/// Values above 1000 are taken as volts. OSM-style multi-circuit tags
/// (`"220000;66000"`) yield the highest circuit.
pub fn parse_kv(value: &Value) -> Option<f64> {
    let normalize = |v: f64| if v > 1000.0 { v / 1000.0 } else { v };
    match value {
        Value::Number(n) => n.as_f64().map(normalize),
        Value::String(s) => s
            .split(';')
            .filter_map(leading_number)
            .map(normalize)
            .reduce(f64::max),
        _ => None,
    }
}

fn capacity_kv(raw: &RawFeature) -> Option<f64> {
    LINE_CAPACITY_KEYS
        .iter()
        .find_map(|key| raw.property(key).and_then(parse_kv))
}

fn facility_voltage(raw: &RawFeature) -> Option<String> {
    FACILITY_VOLTAGE_KEYS
        .iter()
        .find_map(|key| match raw.property(key)? {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            v @ Value::Number(_) => parse_kv(v).map(|kv| format!("{}kV", kv)),
            _ => None,
        })
}

/// Distance from the property to the nearest vertex, in km
fn nearest_vertex_km(property: GeoPoint, geometry: &FeatureGeometry) -> Option<f64> {
    geometry
        .vertices()
        .into_iter()
        .map(|v| haversine_km(property, v))
        .filter(|d| d.is_finite())
        .reduce(f64::min)
}

fn adapt_facility(
    raw: &RawFeature,
    geometry: Option<FeatureGeometry>,
    property: GeoPoint,
) -> Option<EnergyFacility> {
    let location = match &geometry {
        Some(FeatureGeometry::Point(p)) => Some(*p),
        _ => None,
    };
    let distance = prop_f64(raw, &["distance"])
        .or_else(|| geometry.as_ref().and_then(|g| nearest_vertex_km(property, g)));

    if location.is_none() && distance.is_none() {
        return None;
    }

    Some(EnergyFacility {
        id: prop_str(raw, ID_KEYS),
        name: prop_str(raw, NAME_KEYS),
        feature_type: prop_str(raw, FACILITY_TYPE_KEYS).unwrap_or_default(),
        feature_sub_type: prop_str(raw, FACILITY_SUB_TYPE_KEYS),
        voltage: facility_voltage(raw),
        distance,
        location,
    })
}

fn adapt_transmission_line(
    raw: &RawFeature,
    geometry: Option<FeatureGeometry>,
    property: GeoPoint,
) -> Option<TransmissionLine> {
    let published = raw.property("distance").and_then(|v| match v {
        Value::Number(n) => n.as_f64().map(Distance::meters),
        other => serde_json::from_value::<Distance>(other.clone()).ok(),
    });

    let computed = || match geometry.as_ref()? {
        FeatureGeometry::Point(p) => Some(Distance::meters(haversine_km(property, *p) * 1000.0)),
        g => closest_point_on_lines(property, g.lines()?)
            .map(|closest| Distance::meters(closest.distance_meters)),
    };

    let distance = published.or_else(computed)?;

    Some(TransmissionLine {
        id: prop_str(raw, ID_KEYS),
        name: prop_str(raw, NAME_KEYS),
        capacity_kv: capacity_kv(raw),
        distance: Some(distance),
        geometry,
    })
}

fn adapt_water_main(raw: &RawFeature, geometry: Option<FeatureGeometry>) -> Option<WaterMain> {
    let geometry = geometry.filter(|g| g.lines().is_some())?;

    Some(WaterMain {
        asset_id: prop_str(raw, ID_KEYS),
        diameter: prop_f64(raw, DIAMETER_KEYS),
        material: prop_str(raw, MATERIAL_KEYS),
        pipe_type: prop_str(raw, PIPE_TYPE_KEYS),
        service_status: prop_str(raw, STATUS_KEYS),
        pressure_zone: prop_str(raw, &["PRESSURE_ZONE", "pressure_zone"]),
        geometry: Some(geometry),
    })
}

fn adapt_hydrant(raw: &RawFeature, geometry: Option<FeatureGeometry>) -> Option<Hydrant> {
    match geometry? {
        FeatureGeometry::Point(location) => Some(Hydrant {
            asset_id: prop_str(raw, HYDRANT_ID_KEYS),
            location: Some(location),
        }),
        _ => None,
    }
}

fn adapt_zone(raw: &RawFeature, geometry: Option<FeatureGeometry>) -> Option<DistributionZone> {
    let geometry = geometry.filter(|g| g.polygons().is_some())?;

    Some(DistributionZone {
        pressure_zone: prop_str(raw, &["PRESSURE_ZONE"]),
        zone_name: prop_str(raw, &["ZONE_NAME"]),
        zone_id: prop_str(raw, &["ZONE_ID"]),
        geometry: Some(geometry),
    })
}

/// Adapt one raw feature; `None` if it cannot serve `kind`
pub fn adapt_feature(
    raw: &RawFeature,
    kind: FeatureKind,
    property: GeoPoint,
) -> Option<UtilityFeature> {
    let geometry = raw.geometry.as_ref().and_then(|g| g.parse());

    match kind {
        FeatureKind::EnergyFacility => {
            adapt_facility(raw, geometry, property).map(UtilityFeature::EnergyFacility)
        }
        FeatureKind::TransmissionLine => {
            adapt_transmission_line(raw, geometry, property).map(UtilityFeature::TransmissionLine)
        }
        FeatureKind::WaterMain => adapt_water_main(raw, geometry).map(UtilityFeature::WaterMain),
        FeatureKind::Hydrant => adapt_hydrant(raw, geometry).map(UtilityFeature::Hydrant),
        FeatureKind::DistributionZone => {
            adapt_zone(raw, geometry).map(UtilityFeature::DistributionZone)
        }
    }
}

/// Adapt a whole collection, skipping malformed features.
///
/// Energy facilities come back nearest-first.
pub fn adapt_collection(
    collection: &FeatureCollection,
    kind: FeatureKind,
    property: GeoPoint,
) -> Vec<UtilityFeature> {
    let mut features: Vec<UtilityFeature> = collection
        .features
        .iter()
        .filter_map(|raw| adapt_feature(raw, kind, property))
        .collect();

    let skipped = collection.features.len() - features.len();
    if skipped > 0 {
        debug!("Skipped {} malformed {} features", skipped, kind);
    }

    if kind == FeatureKind::EnergyFacility {
        features.sort_by(|a, b| {
            let key = |f: &UtilityFeature| match f {
                UtilityFeature::EnergyFacility(f) => f.valid_distance().unwrap_or(f64::INFINITY),
                _ => f64::INFINITY,
            };
            key(a).total_cmp(&key(b))
        });
    }

    features
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(json: &str) -> RawFeature {
        serde_json::from_str(json).unwrap()
    }

    fn property() -> GeoPoint {
        GeoPoint::new(-37.8, 145.0)
    }

    #[test]
    fn test_parse_kv() {
        assert_eq!(parse_kv(&Value::from(275)), Some(275.0));
        assert_eq!(parse_kv(&Value::from(330000)), Some(330.0));
        assert_eq!(parse_kv(&Value::from("220000;66000")), Some(220.0));
        assert_eq!(parse_kv(&Value::from("66kV")), Some(66.0));
        assert_eq!(parse_kv(&Value::from("unknown")), None);
        assert_eq!(parse_kv(&Value::Null), None);
    }

    #[test]
    fn test_transmission_line_aliases() {
        let feature = raw(
            r#"{"geometry":{"type":"LineString","coordinates":[[144.99,-37.8],[145.01,-37.8]]},
                "properties":{"CAPACITYKV":"330","NAME":"Eastern 330kV"}}"#,
        );
        let Some(UtilityFeature::TransmissionLine(line)) =
            adapt_feature(&feature, FeatureKind::TransmissionLine, property())
        else {
            panic!("expected a transmission line");
        };
        assert_eq!(line.capacity_kv, Some(330.0));
        assert_eq!(line.name.as_deref(), Some("Eastern 330kV"));
        assert!(line.distance_meters().unwrap() < 1.0);
    }

    #[test]
    fn test_published_line_distance_wins() {
        let feature = raw(
            r#"{"geometry":null,"properties":{"voltage":"275000","distance":{"measurement":600,"unit":"m"}}}"#,
        );
        let Some(UtilityFeature::TransmissionLine(line)) =
            adapt_feature(&feature, FeatureKind::TransmissionLine, property())
        else {
            panic!("expected a transmission line");
        };
        assert_eq!(line.capacity_kv, Some(275.0));
        assert_eq!(line.distance, Some(Distance::meters(600.0)));
    }

    #[test]
    fn test_facility_distance_computed() {
        let feature = raw(
            r#"{"geometry":{"type":"Point","coordinates":[145.0,-37.79]},
                "properties":{"power":"substation","voltage":66000}}"#,
        );
        let Some(UtilityFeature::EnergyFacility(facility)) =
            adapt_feature(&feature, FeatureKind::EnergyFacility, property())
        else {
            panic!("expected a facility");
        };
        assert!(facility.is_substation());
        assert_eq!(facility.voltage.as_deref(), Some("66kV"));
        let d = facility.distance.unwrap();
        assert!((d - 1.112).abs() < 0.01);
    }

    #[test]
    fn test_facilities_sorted_nearest_first() {
        let collection: FeatureCollection = serde_json::from_str(
            r#"{"type":"FeatureCollection","features":[
                {"geometry":null,"properties":{"featureType":"substation","distance":2.5}},
                {"geometry":null,"properties":{"featureType":"transformer"}},
                {"geometry":null,"properties":{"featureType":"substation","distance":0.7}}
            ]}"#,
        )
        .unwrap();
        let features = adapt_collection(&collection, FeatureKind::EnergyFacility, property());
        assert_eq!(features.len(), 2);
        match &features[0] {
            UtilityFeature::EnergyFacility(f) => assert_eq!(f.distance, Some(0.7)),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_water_main_fields() {
        let feature = raw(
            r#"{"geometry":{"type":"MultiLineString","coordinates":[[[144.99,-37.8],[145.01,-37.8]]]},
                "properties":{"ASSET_ID":12345,"PIPE_DIAMETER":"150mm","MATERIAL":"PVC",
                              "SERVICE_STATUS":"In Service","PRESSURE_ZONE":"Zone 4"}}"#,
        );
        let Some(UtilityFeature::WaterMain(main)) =
            adapt_feature(&feature, FeatureKind::WaterMain, property())
        else {
            panic!("expected a water main");
        };
        assert_eq!(main.asset_id.as_deref(), Some("12345"));
        assert_eq!(main.diameter, Some(150.0));
        assert_eq!(main.material.as_deref(), Some("PVC"));
        assert_eq!(main.pressure_zone.as_deref(), Some("Zone 4"));
    }

    #[test]
    fn test_malformed_features_are_skipped() {
        let point_main = raw(r#"{"geometry":{"type":"Point","coordinates":[145.0,-37.8]}}"#);
        assert!(adapt_feature(&point_main, FeatureKind::WaterMain, property()).is_none());

        let short_line =
            raw(r#"{"geometry":{"type":"LineString","coordinates":[[145.0,-37.8]]}}"#);
        assert!(adapt_feature(&short_line, FeatureKind::WaterMain, property()).is_none());
        assert!(adapt_feature(&short_line, FeatureKind::TransmissionLine, property()).is_none());

        let no_geometry = raw(r#"{"properties":{"ZONE_NAME":"North"}}"#);
        assert!(adapt_feature(&no_geometry, FeatureKind::DistributionZone, property()).is_none());
        assert!(adapt_feature(&no_geometry, FeatureKind::Hydrant, property()).is_none());
    }

    #[test]
    fn test_zone_keeps_name_fields() {
        let feature = raw(
            r#"{"geometry":{"type":"Polygon","coordinates":[[[144.9,-37.9],[145.1,-37.9],[145.1,-37.7],[144.9,-37.9]]]},
                "properties":{"ZONE_NAME":"North","ZONE_ID":"N1"}}"#,
        );
        let Some(UtilityFeature::DistributionZone(zone)) =
            adapt_feature(&feature, FeatureKind::DistributionZone, property())
        else {
            panic!("expected a zone");
        };
        assert_eq!(zone.display_name(), Some("North"));
        assert_eq!(zone.zone_id.as_deref(), Some("N1"));
    }
}
