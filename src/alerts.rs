//! Alerts attached to a utility report.
//!
//! Each rule is checked independently; alerts keep rule order.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::electricity::{ElectricityAnalysis, RiskLevel};
use crate::models::FeatureKind;
use crate::sources::Provenance;
use crate::water::WaterAnalysis;

/// Beyond this a water main extension is a material cost
pub const MAIN_EXTENSION_RISK_METERS: f64 = 1000.0;
pub const MAIN_DISTANT_METERS: f64 = 200.0;
pub const HYDRANT_DISTANT_METERS: f64 = 500.0;
pub const HYDRANT_CLOSE_METERS: f64 = 100.0;

static LOW_PRESSURE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\blow\b").expect("low pressure pattern"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    Risk,
    Note,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Alert {
    pub kind: AlertKind,
    pub message: String,
}

impl Alert {
    pub fn risk(message: impl Into<String>) -> Self {
        Self {
            kind: AlertKind::Risk,
            message: message.into(),
        }
    }

    pub fn note(message: impl Into<String>) -> Self {
        Self {
            kind: AlertKind::Note,
            message: message.into(),
        }
    }
}

fn water_alerts(water: &WaterAnalysis, alerts: &mut Vec<Alert>) {
    if water.is_empty() {
        alerts.push(Alert::note(
            "No water infrastructure data was found near the property. \
             Confirm supply with the local water authority.",
        ));
    }

    if let Some(main) = &water.nearest_water_main {
        if main.distance > MAIN_EXTENSION_RISK_METERS {
            alerts.push(Alert::risk(format!(
                "The nearest water main is {:.0}m from the property. \
                 Connection may require a costly main extension.",
                main.distance
            )));
        } else if main.distance > MAIN_DISTANT_METERS {
            alerts.push(Alert::note(format!(
                "The nearest water main is {:.0}m from the property. \
                 A service extension may be required.",
                main.distance
            )));
        }
    }

    if let Some(hydrant) = &water.nearest_hydrant {
        if hydrant.distance > HYDRANT_DISTANT_METERS {
            alerts.push(Alert::note(format!(
                "The nearest fire hydrant is {:.0}m away. \
                 Firefighting water supply may be limited.",
                hydrant.distance
            )));
        } else if hydrant.distance <= HYDRANT_CLOSE_METERS {
            alerts.push(Alert::note(format!(
                "A fire hydrant is within {:.0}m of the property.",
                hydrant.distance
            )));
        }
    }

    if let Some(zone) = &water.pressure_zone {
        if LOW_PRESSURE.is_match(zone) {
            alerts.push(Alert::note(format!(
                "The property is in the '{}' pressure zone. \
                 Water pressure may be reduced at peak demand.",
                zone
            )));
        }
    }
}

fn electricity_alerts(electricity: &ElectricityAnalysis, alerts: &mut Vec<Alert>) {
    match electricity.transmission_line_risk {
        RiskLevel::VeryHigh => alerts.push(Alert::risk(
            "A high-voltage transmission line is very close to the property. \
             Easements and building setbacks are likely to apply.",
        )),
        RiskLevel::High => alerts.push(Alert::risk(
            "A transmission line is close to the property. Check for easements.",
        )),
        _ => {}
    }
}

fn provenance_alerts(provenance: &BTreeMap<FeatureKind, Provenance>, alerts: &mut Vec<Alert>) {
    for (kind, record) in provenance {
        if !record.is_fallback() {
            continue;
        }
        if let Some(provider) = &record.provider {
            alerts.push(Alert::note(format!(
                "{} data was supplied by the fallback source '{}' \
                 because higher-priority sources returned nothing.",
                kind.label(),
                provider
            )));
        }
    }
}

/// Compose report alerts from the domain analyses and data provenance
pub fn compose_alerts(
    electricity: &ElectricityAnalysis,
    water: &WaterAnalysis,
    provenance: &BTreeMap<FeatureKind, Provenance>,
) -> Vec<Alert> {
    let mut alerts = Vec::new();
    water_alerts(water, &mut alerts);
    electricity_alerts(electricity, &mut alerts);
    provenance_alerts(provenance, &mut alerts);
    alerts
}
