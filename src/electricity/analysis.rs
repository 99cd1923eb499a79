//! Electricity report fragment.

use serde::Serialize;

use super::classify::{
    assess_electricity_access, assess_transmission_line_risk, calculate_emf_exposure,
    calculate_network_redundancy, AccessLevel, EmfLevel, RiskLevel,
};
use crate::models::{EnergyFacility, TransmissionLine};

/// Nearest substation summary
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubstationSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub feature_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voltage: Option<String>,
    pub distance_km: f64,
}

/// Nearest transmission line summary
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransmissionLineSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capacity_kv: Option<f64>,
    pub distance_meters: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ElectricityAnalysis {
    pub access_level: AccessLevel,
    pub transmission_line_risk: RiskLevel,
    pub emf_exposure: EmfLevel,
    pub network_redundancy: u8,
    pub facility_count: usize,
    pub transmission_line_count: usize,
    pub nearest_substation: Option<SubstationSummary>,
    pub nearest_transmission_line: Option<TransmissionLineSummary>,
    pub description: String,
    pub recommendations: Vec<String>,
}

/// First substation-type facility that has a distance.
///
/// Upstream adapters deliver facilities nearest-first, so "first" is "nearest".
fn nearest_substation(facilities: &[EnergyFacility]) -> Option<SubstationSummary> {
    facilities
        .iter()
        .filter(|f| f.is_substation())
        .find_map(|f| {
            f.valid_distance().map(|distance_km| SubstationSummary {
                name: f.name.clone(),
                feature_type: f.feature_type.clone(),
                voltage: f.voltage.clone(),
                distance_km,
            })
        })
}

fn nearest_transmission_line(lines: &[TransmissionLine]) -> Option<TransmissionLineSummary> {
    lines
        .iter()
        .filter_map(|line| line.distance_meters().map(|d| (line, d)))
        .fold(None, |best: Option<(&TransmissionLine, f64)>, candidate| match best {
            Some(b) if b.1 <= candidate.1 => Some(b),
            _ => Some(candidate),
        })
        .map(|(line, distance_meters)| TransmissionLineSummary {
            name: line.name.clone(),
            capacity_kv: line.capacity_kv,
            distance_meters,
        })
}

fn describe(
    access: AccessLevel,
    facilities: &[EnergyFacility],
    line: Option<&TransmissionLineSummary>,
) -> String {
    let count = facilities.len();
    let mut description = format!(
        "{} electricity access with {} energy {} nearby.",
        access.phrase(),
        count,
        if count == 1 { "facility" } else { "facilities" }
    );

    let nearest_km = facilities
        .iter()
        .filter_map(EnergyFacility::valid_distance)
        .reduce(f64::min);
    if let Some(km) = nearest_km {
        description.push_str(&format!(
            " The nearest facility is {}m from the property.",
            (km * 1000.0).round()
        ));
    }

    if let Some(line) = line {
        match line.capacity_kv {
            Some(kv) => description.push_str(&format!(
                " The nearest transmission line ({}kV) is {}m away.",
                kv,
                line.distance_meters.round()
            )),
            None => description.push_str(&format!(
                " The nearest transmission line is {}m away.",
                line.distance_meters.round()
            )),
        }
    }

    description
}

fn recommend(access: AccessLevel, risk: RiskLevel, emf: EmfLevel) -> Vec<String> {
    let mut recommendations = Vec::new();

    match risk {
        RiskLevel::VeryHigh => recommendations.push(
            "Critical: a high-voltage transmission line runs within 30m of the property. \
             Obtain specialist advice on easements, safety clearances and development restrictions."
                .to_string(),
        ),
        RiskLevel::High => recommendations.push(
            "A transmission line is close to the property. Check easement boundaries and \
             building restrictions with the network operator."
                .to_string(),
        ),
        _ => {}
    }

    match emf {
        EmfLevel::High => recommendations.push(
            "An EMF assessment is mandatory before purchase or development due to nearby \
             high-voltage infrastructure."
                .to_string(),
        ),
        EmfLevel::Moderate => recommendations.push(
            "Consider an EMF assessment; elevated field levels are possible at the property."
                .to_string(),
        ),
        _ => {}
    }

    match access {
        AccessLevel::Limited => recommendations.push(
            "Electricity infrastructure is limited in this area. Confirm connection \
             availability and costs with the local distributor."
                .to_string(),
        ),
        AccessLevel::Adequate => recommendations.push(
            "Confirm available network capacity with the local distributor before planning \
             high-demand uses."
                .to_string(),
        ),
        _ => {}
    }

    if access == AccessLevel::Excellent
        && risk == RiskLevel::Minimal
        && emf == EmfLevel::Negligible
    {
        recommendations.push(
            "No electricity infrastructure constraints identified; the property is well served \
             by the local network."
                .to_string(),
        );
    }

    recommendations
}

/// Run all four classifiers and assemble the electricity fragment
pub fn analyze_electricity_data(
    facilities: &[EnergyFacility],
    lines: &[TransmissionLine],
) -> ElectricityAnalysis {
    let access_level = assess_electricity_access(facilities);
    let transmission_line_risk = assess_transmission_line_risk(lines);
    let emf_exposure = calculate_emf_exposure(lines);
    let network_redundancy = calculate_network_redundancy(facilities, lines);

    let nearest_substation = nearest_substation(facilities);
    let nearest_transmission_line = nearest_transmission_line(lines);

    let description = describe(access_level, facilities, nearest_transmission_line.as_ref());
    let recommendations = recommend(access_level, transmission_line_risk, emf_exposure);

    ElectricityAnalysis {
        access_level,
        transmission_line_risk,
        emf_exposure,
        network_redundancy,
        facility_count: facilities.len(),
        transmission_line_count: lines.len(),
        nearest_substation,
        nearest_transmission_line,
        description,
        recommendations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Distance;

    fn facility(feature_type: &str, distance: f64) -> EnergyFacility {
        EnergyFacility {
            feature_type: feature_type.to_string(),
            distance: Some(distance),
            ..Default::default()
        }
    }

    fn line(meters: f64, kv: f64) -> TransmissionLine {
        TransmissionLine {
            capacity_kv: Some(kv),
            distance: Some(Distance::meters(meters)),
            ..Default::default()
        }
    }

    #[test]
    fn test_end_to_end_scenario() {
        let facilities = [facility("substation", 0.4), facility("power station", 0.8)];
        let lines = [line(600.0, 275.0)];

        let analysis = analyze_electricity_data(&facilities, &lines);
        assert_eq!(analysis.access_level, AccessLevel::Excellent);
        assert_eq!(analysis.transmission_line_risk, RiskLevel::Minimal);
        assert_eq!(analysis.emf_exposure, EmfLevel::Negligible);
        assert!(analysis.network_redundancy > 60);

        assert_eq!(analysis.nearest_substation.as_ref().unwrap().distance_km, 0.4);
        assert_eq!(
            analysis.nearest_transmission_line.as_ref().unwrap().distance_meters,
            600.0
        );

        assert!(analysis.description.contains("Excellent electricity access"));
        assert!(analysis.description.contains("2 energy facilities"));
        assert!(analysis.description.contains("400m"));

        assert_eq!(analysis.recommendations.len(), 1);
        assert!(analysis.recommendations[0].contains("No electricity infrastructure constraints"));
    }

    #[test]
    fn test_critical_recommendations_come_first() {
        let lines = [line(20.0, 330.0)];
        let analysis = analyze_electricity_data(&[], &lines);

        assert_eq!(analysis.transmission_line_risk, RiskLevel::VeryHigh);
        assert_eq!(analysis.emf_exposure, EmfLevel::High);
        assert_eq!(analysis.access_level, AccessLevel::Limited);
        assert_eq!(analysis.recommendations.len(), 3);
        assert!(analysis.recommendations[0].starts_with("Critical"));
        assert!(analysis.recommendations[1].contains("EMF assessment is mandatory"));
        assert!(analysis.recommendations[2].contains("limited"));
    }

    #[test]
    fn test_nearest_substation_skips_missing_distance() {
        let facilities = [
            EnergyFacility {
                feature_type: "substation".to_string(),
                ..Default::default()
            },
            facility("transformer", 0.1),
            facility("Terminal Substation", 1.2),
        ];
        let analysis = analyze_electricity_data(&facilities, &[]);
        let substation = analysis.nearest_substation.unwrap();
        assert_eq!(substation.feature_type, "Terminal Substation");
        assert!(analysis.nearest_transmission_line.is_none());
    }

    #[test]
    fn test_description_without_distances() {
        let analysis = analyze_electricity_data(&[], &[]);
        assert_eq!(
            analysis.description,
            "Limited electricity access with 0 energy facilities nearby."
        );
    }
}
