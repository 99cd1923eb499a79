//! Utility feature types consumed by the analyzers.

use serde::{Deserialize, Serialize};

use super::{FeatureGeometry, GeoPoint};

/// Unit of a precomputed distance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DistanceUnit {
    #[serde(rename = "m")]
    Meters,
    #[serde(rename = "km")]
    Kilometers,
}

/// Distance with an explicit unit, e.g. `{"measurement": 120, "unit": "m"}`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Distance {
    pub measurement: f64,
    pub unit: DistanceUnit,
}

impl Distance {
    pub fn meters(measurement: f64) -> Self {
        Self {
            measurement,
            unit: DistanceUnit::Meters,
        }
    }

    pub fn kilometers(measurement: f64) -> Self {
        Self {
            measurement,
            unit: DistanceUnit::Kilometers,
        }
    }

    /// Value normalized to meters
    pub fn as_meters(&self) -> f64 {
        match self.unit {
            DistanceUnit::Meters => self.measurement,
            DistanceUnit::Kilometers => self.measurement * 1000.0,
        }
    }
}

/// Which collection a feature belongs to.
///
/// Each kind has its own provider waterfall.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureKind {
    EnergyFacility,
    TransmissionLine,
    WaterMain,
    Hydrant,
    DistributionZone,
}

impl FeatureKind {
    pub fn all() -> &'static [FeatureKind] {
        &[
            FeatureKind::EnergyFacility,
            FeatureKind::TransmissionLine,
            FeatureKind::WaterMain,
            FeatureKind::Hydrant,
            FeatureKind::DistributionZone,
        ]
    }

    pub fn field_name(&self) -> &'static str {
        match self {
            FeatureKind::EnergyFacility => "energy_facility",
            FeatureKind::TransmissionLine => "transmission_line",
            FeatureKind::WaterMain => "water_main",
            FeatureKind::Hydrant => "hydrant",
            FeatureKind::DistributionZone => "distribution_zone",
        }
    }

    /// Human-readable label used in alerts
    pub fn label(&self) -> &'static str {
        match self {
            FeatureKind::EnergyFacility => "Energy facility",
            FeatureKind::TransmissionLine => "Transmission line",
            FeatureKind::WaterMain => "Water main",
            FeatureKind::Hydrant => "Hydrant",
            FeatureKind::DistributionZone => "Pressure zone",
        }
    }
}

impl std::fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.field_name())
    }
}

/// Substation, power station, transformer, etc.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnergyFacility {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub feature_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_sub_type: Option<String>,
    /// Voltage label as published by the source (e.g. "66kV")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voltage: Option<String>,
    /// Distance from the property in kilometers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoPoint>,
}

impl EnergyFacility {
    /// Case-insensitive "substation" match on type or sub-type
    pub fn is_substation(&self) -> bool {
        let matches = |s: &str| s.to_lowercase().contains("substation");
        matches(&self.feature_type) || self.feature_sub_type.as_deref().map_or(false, matches)
    }

    /// Distance in km, ignoring NaN/negative values
    pub fn valid_distance(&self) -> Option<f64> {
        self.distance.filter(|d| d.is_finite() && *d >= 0.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransmissionLine {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity_kv: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<Distance>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<FeatureGeometry>,
}

impl TransmissionLine {
    /// Distance in meters, ignoring NaN/negative values
    pub fn distance_meters(&self) -> Option<f64> {
        self.distance
            .map(|d| d.as_meters())
            .filter(|d| d.is_finite() && *d >= 0.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaterMain {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diameter: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pipe_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pressure_zone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<FeatureGeometry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hydrant {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoPoint>,
}

/// Water distribution / pressure zone polygon
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistributionZone {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pressure_zone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<FeatureGeometry>,
}

impl DistributionZone {
    /// Zone name, preferring PRESSURE_ZONE, then ZONE_NAME, then ZONE_ID
    pub fn display_name(&self) -> Option<&str> {
        [&self.pressure_zone, &self.zone_name, &self.zone_id]
            .into_iter()
            .filter_map(|v| v.as_deref())
            .map(str::trim)
            .find(|v| !v.is_empty())
    }
}

/// A single feature, tagged by utility domain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UtilityFeature {
    EnergyFacility(EnergyFacility),
    TransmissionLine(TransmissionLine),
    WaterMain(WaterMain),
    Hydrant(Hydrant),
    DistributionZone(DistributionZone),
}

impl UtilityFeature {
    pub fn kind(&self) -> FeatureKind {
        match self {
            UtilityFeature::EnergyFacility(_) => FeatureKind::EnergyFacility,
            UtilityFeature::TransmissionLine(_) => FeatureKind::TransmissionLine,
            UtilityFeature::WaterMain(_) => FeatureKind::WaterMain,
            UtilityFeature::Hydrant(_) => FeatureKind::Hydrant,
            UtilityFeature::DistributionZone(_) => FeatureKind::DistributionZone,
        }
    }
}

/// Feature sets for one request, split by kind
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureSet {
    pub energy_facilities: Vec<EnergyFacility>,
    pub transmission_lines: Vec<TransmissionLine>,
    pub water_mains: Vec<WaterMain>,
    pub hydrants: Vec<Hydrant>,
    pub distribution_zones: Vec<DistributionZone>,
}

impl FeatureSet {
    pub fn push(&mut self, feature: UtilityFeature) {
        match feature {
            UtilityFeature::EnergyFacility(f) => self.energy_facilities.push(f),
            UtilityFeature::TransmissionLine(f) => self.transmission_lines.push(f),
            UtilityFeature::WaterMain(f) => self.water_mains.push(f),
            UtilityFeature::Hydrant(f) => self.hydrants.push(f),
            UtilityFeature::DistributionZone(f) => self.distribution_zones.push(f),
        }
    }

    /// Move every feature of `other` into `self`
    pub fn append(&mut self, mut other: FeatureSet) {
        self.energy_facilities.append(&mut other.energy_facilities);
        self.transmission_lines.append(&mut other.transmission_lines);
        self.water_mains.append(&mut other.water_mains);
        self.hydrants.append(&mut other.hydrants);
        self.distribution_zones.append(&mut other.distribution_zones);
    }
}

impl Extend<UtilityFeature> for FeatureSet {
    fn extend<I: IntoIterator<Item = UtilityFeature>>(&mut self, iter: I) {
        for feature in iter {
            self.push(feature);
        }
    }
}

impl FromIterator<UtilityFeature> for FeatureSet {
    fn from_iter<I: IntoIterator<Item = UtilityFeature>>(iter: I) -> Self {
        let mut set = FeatureSet::default();
        set.extend(iter);
        set
    }
}
