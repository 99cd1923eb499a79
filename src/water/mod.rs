//! Water network access: nearest main, nearest hydrant, pressure zone.

use serde::Serialize;
use tracing::debug;

use crate::models::{DistributionZone, GeoPoint, Hydrant, WaterMain};
use crate::proximity::ProximityIndex;

/// A main within this many meters counts as a connection
pub const CONNECTION_THRESHOLD_METERS: f64 = 50.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NearestWaterMain {
    pub distance: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diameter: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub material: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub pipe_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pressure_zone: Option<String>,
    /// Point on the main nearest to the property
    pub closest_point: GeoPoint,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NearestHydrant {
    pub distance: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_id: Option<String>,
    pub location: GeoPoint,
}

/// Water fragment; distances are in meters
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WaterAnalysis {
    pub nearest_water_main: Option<NearestWaterMain>,
    pub nearest_hydrant: Option<NearestHydrant>,
    pub pressure_zone: Option<String>,
    pub has_water_connection: bool,
}

impl WaterAnalysis {
    /// True when none of the three sources produced anything
    pub fn is_empty(&self) -> bool {
        self.nearest_water_main.is_none()
            && self.nearest_hydrant.is_none()
            && self.pressure_zone.is_none()
    }
}

pub fn find_nearest_water_main(
    property: GeoPoint,
    mains: &[WaterMain],
) -> Option<NearestWaterMain> {
    let nearest = ProximityIndex::new(property).nearest_line(mains, |m| m.geometry.as_ref())?;
    let main = nearest.nearest_feature;

    Some(NearestWaterMain {
        distance: nearest.distance_meters,
        diameter: main.diameter,
        material: main.material.clone(),
        pipe_type: main.pipe_type.clone(),
        asset_id: main.asset_id.clone(),
        service_status: main.service_status.clone(),
        pressure_zone: main.pressure_zone.clone(),
        closest_point: nearest.closest_point,
    })
}

pub fn find_nearest_hydrant(property: GeoPoint, hydrants: &[Hydrant]) -> Option<NearestHydrant> {
    let nearest = ProximityIndex::new(property).nearest_point(hydrants, |h| h.location)?;

    Some(NearestHydrant {
        distance: nearest.distance_meters,
        asset_id: nearest.nearest_feature.asset_id.clone(),
        location: nearest.closest_point,
    })
}

/// Name of the first zone (collection order) containing the property
pub fn find_pressure_zone(property: GeoPoint, zones: &[DistributionZone]) -> Option<String> {
    ProximityIndex::new(property)
        .first_containing(zones, |z| z.geometry.as_ref())
        .and_then(DistributionZone::display_name)
        .map(str::to_string)
}

/// Analyze water access; each input is optional and computed independently
pub fn analyze_water_access(
    property: GeoPoint,
    mains: Option<&[WaterMain]>,
    hydrants: Option<&[Hydrant]>,
    zones: Option<&[DistributionZone]>,
) -> WaterAnalysis {
    let nearest_water_main = mains.and_then(|m| find_nearest_water_main(property, m));
    let nearest_hydrant = hydrants.and_then(|h| find_nearest_hydrant(property, h));
    let pressure_zone = zones.and_then(|z| find_pressure_zone(property, z));

    let has_water_connection = nearest_water_main
        .as_ref()
        .map_or(false, |m| m.distance <= CONNECTION_THRESHOLD_METERS);

    debug!(
        "Water analysis at ({}, {}): main={:?}m hydrant={:?}m zone={:?}",
        property.lat,
        property.lon,
        nearest_water_main.as_ref().map(|m| m.distance.round()),
        nearest_hydrant.as_ref().map(|h| h.distance.round()),
        pressure_zone
    );

    WaterAnalysis {
        nearest_water_main,
        nearest_hydrant,
        pressure_zone,
        has_water_connection,
    }
}
