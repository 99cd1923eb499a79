//! Nearest-feature search around a property.

use serde::Serialize;

use super::ZoneIndex;
use crate::geometry::{closest_point_on_lines, haversine_km};
use crate::models::{FeatureGeometry, GeoPoint};

/// Nearest instance of a feature kind
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProximityResult<'a, T> {
    /// Always >= 0
    pub distance_meters: f64,
    pub nearest_feature: &'a T,
    /// Point on the feature nearest to the property
    pub closest_point: GeoPoint,
    /// Position of the feature in the source collection
    #[serde(skip)]
    pub position: usize,
}

/// Proximity queries anchored at a property point
#[derive(Debug, Clone, Copy)]
pub struct ProximityIndex {
    origin: GeoPoint,
}

impl ProximityIndex {
    pub fn new(origin: GeoPoint) -> Self {
        Self { origin }
    }

    /// Nearest point feature by direct haversine distance.
    ///
    /// Features without a location are skipped; ties keep the earlier feature.
    pub fn nearest_point<'a, T, F>(
        &self,
        features: &'a [T],
        locate: F,
    ) -> Option<ProximityResult<'a, T>>
    where
        F: Fn(&T) -> Option<GeoPoint>,
    {
        let mut best: Option<ProximityResult<'a, T>> = None;

        for (position, feature) in features.iter().enumerate() {
            let Some(location) = locate(feature) else {
                continue;
            };
            let distance_meters = haversine_km(self.origin, location) * 1000.0;
            if !distance_meters.is_finite() {
                continue;
            }
            if best.as_ref().map_or(true, |b| distance_meters < b.distance_meters) {
                best = Some(ProximityResult {
                    distance_meters,
                    nearest_feature: feature,
                    closest_point: location,
                    position,
                });
            }
        }

        best
    }

    /// Nearest LineString/MultiLineString feature.
    ///
    /// Every part of a MultiLineString is measured. Features without a line
    /// of at least 2 points are skipped.
    pub fn nearest_line<'a, T, F>(
        &self,
        features: &'a [T],
        geometry: F,
    ) -> Option<ProximityResult<'a, T>>
    where
        F: Fn(&T) -> Option<&FeatureGeometry>,
    {
        let mut best: Option<ProximityResult<'a, T>> = None;

        for (position, feature) in features.iter().enumerate() {
            let Some(lines) = geometry(feature).and_then(FeatureGeometry::lines) else {
                continue;
            };
            let Some(closest) = closest_point_on_lines(self.origin, lines) else {
                continue;
            };
            if !closest.distance_meters.is_finite() {
                continue;
            }
            if best.as_ref().map_or(true, |b| closest.distance_meters < b.distance_meters) {
                best = Some(ProximityResult {
                    distance_meters: closest.distance_meters,
                    nearest_feature: feature,
                    closest_point: closest.point,
                    position,
                });
            }
        }

        best
    }

    /// First polygon feature (collection order) containing the origin
    pub fn first_containing<'a, T, F>(&self, features: &'a [T], geometry: F) -> Option<&'a T>
    where
        F: Fn(&'a T) -> Option<&'a FeatureGeometry>,
    {
        ZoneIndex::build(features, geometry)
            .lookup(self.origin)
            .map(|(_, feature)| feature)
    }
}
