//! Core data models for the proximity engine.

pub mod feature;
pub mod geojson;
pub mod point;

pub use feature::{
    Distance, DistanceUnit, DistributionZone, EnergyFacility, FeatureKind, FeatureSet, Hydrant,
    TransmissionLine, UtilityFeature, WaterMain,
};
pub use geojson::{FeatureCollection, RawFeature, RawGeometry};
pub use point::{FeatureGeometry, GeoPoint, PolygonRings};
