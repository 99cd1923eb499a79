//! Utility proximity - electricity and water infrastructure analysis for a property
//!
//! This library provides the geometry kernel, the per-utility classifiers, the
//! provider fallback layer and report assembly shared by the `server` and
//! `analyze` binaries.

pub mod alerts;
pub mod config;
pub mod electricity;
pub mod geometry;
pub mod models;
pub mod proximity;
pub mod report;
pub mod sources;
pub mod water;

pub use alerts::{compose_alerts, Alert, AlertKind};
pub use config::Config;
pub use models::{FeatureCollection, FeatureKind, FeatureSet, GeoPoint, UtilityFeature};
pub use report::{build_report, generate, UtilityReport};
pub use sources::{FeatureProvider, SourceError, SourceOrchestrator};
