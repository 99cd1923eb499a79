//! Per-property utility report.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::alerts::{compose_alerts, Alert};
use crate::electricity::{analyze_electricity_data, ElectricityAnalysis};
use crate::models::{FeatureCollection, FeatureKind, FeatureSet, GeoPoint};
use crate::sources::{
    Acquisition, FeatureProvider, MemoryCache, Provenance, SourceOrchestrator, StaticProvider,
};
use crate::water::{analyze_water_access, WaterAnalysis};

pub const ELECTRICITY_KINDS: &[FeatureKind] =
    &[FeatureKind::EnergyFacility, FeatureKind::TransmissionLine];

pub const WATER_KINDS: &[FeatureKind] = &[
    FeatureKind::WaterMain,
    FeatureKind::Hydrant,
    FeatureKind::DistributionZone,
];

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UtilityReport {
    pub property: GeoPoint,
    pub electricity: ElectricityAnalysis,
    pub water: WaterAnalysis,
    pub alerts: Vec<Alert>,
    /// Which provider supplied each feature kind
    pub provenance: BTreeMap<FeatureKind, Provenance>,
    pub generated_at: DateTime<Utc>,
}

/// Run both analyzers and the alert composer over already-acquired features
pub fn build_report(
    property: GeoPoint,
    features: &FeatureSet,
    provenance: BTreeMap<FeatureKind, Provenance>,
) -> UtilityReport {
    let electricity =
        analyze_electricity_data(&features.energy_facilities, &features.transmission_lines);
    let water = analyze_water_access(
        property,
        Some(features.water_mains.as_slice()),
        Some(features.hydrants.as_slice()),
        Some(features.distribution_zones.as_slice()),
    );
    let alerts = compose_alerts(&electricity, &water, &provenance);

    UtilityReport {
        property,
        electricity,
        water,
        alerts,
        provenance,
        generated_at: Utc::now(),
    }
}

/// Acquire features for both domains concurrently, then build the report
pub async fn generate(orchestrator: &SourceOrchestrator, property: GeoPoint) -> UtilityReport {
    let (electricity, water) = tokio::join!(
        orchestrator.acquire_kinds(ELECTRICITY_KINDS, property),
        orchestrator.acquire_kinds(WATER_KINDS, property),
    );
    let Acquisition {
        features,
        provenance,
    } = electricity.merge(water);

    let report = build_report(property, &features, provenance);
    info!(
        "Report for ({}, {}): access={:?} risk={:?} water_connection={} alerts={}",
        property.lat,
        property.lon,
        report.electricity.access_level,
        report.electricity.transmission_line_risk,
        report.water.has_water_connection,
        report.alerts.len()
    );
    report
}

/// Property plus caller-supplied GeoJSON, keyed by feature kind
/// (`{"property": {...}, "collections": {"water_main": {...}}}`)
#[derive(Debug, Clone, Deserialize)]
pub struct AnalyzeRequest {
    pub property: GeoPoint,
    #[serde(default)]
    pub collections: BTreeMap<FeatureKind, FeatureCollection>,
}

impl AnalyzeRequest {
    /// Analyze the supplied collections as a single provider named `request`
    pub async fn run(self) -> UtilityReport {
        let provider = self
            .collections
            .into_iter()
            .fold(StaticProvider::new("request"), |provider, (kind, collection)| {
                provider.with_collection(kind, collection)
            });
        let orchestrator = SourceOrchestrator::new(
            vec![Arc::new(provider) as Arc<dyn FeatureProvider>],
            Arc::new(MemoryCache::new()),
            Duration::ZERO,
        );
        generate(&orchestrator, self.property).await
    }
}
