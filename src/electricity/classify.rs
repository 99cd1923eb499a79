//! Electricity classifiers.
//!
//! All thresholds are hard boundaries; inclusive vs. exclusive comparisons
//! are part of the contract and must not drift.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::models::{EnergyFacility, TransmissionLine};

/// Lines strictly above this are high voltage
pub const HIGH_VOLTAGE_KV: f64 = 220.0;
/// Lines strictly above this (and within 50m) give moderate EMF exposure
pub const SUB_TRANSMISSION_KV: f64 = 66.0;

/// Electricity access, ordered from worst to best
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccessLevel {
    Limited,
    Adequate,
    Good,
    Excellent,
}

impl AccessLevel {
    pub fn phrase(&self) -> &'static str {
        match self {
            AccessLevel::Excellent => "Excellent",
            AccessLevel::Good => "Good",
            AccessLevel::Adequate => "Adequate",
            AccessLevel::Limited => "Limited",
        }
    }
}

/// Transmission line risk, ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Minimal,
    Low,
    Moderate,
    High,
    VeryHigh,
}

/// EMF exposure, ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EmfLevel {
    Negligible,
    Low,
    Moderate,
    High,
}

fn is_high_voltage(line: &TransmissionLine) -> bool {
    line.capacity_kv.map_or(false, |kv| kv > HIGH_VOLTAGE_KV)
}

/// Classify access from substation proximity and facility density.
///
/// | condition                                        | level     |
/// |--------------------------------------------------|-----------|
/// | substation <= 0.5 km, or >= 2 facilities <= 1 km | Excellent |
/// | substation <= 1 km, or any facility <= 2 km      | Good      |
/// | any facility <= 5 km                             | Adequate  |
/// | otherwise (including no facilities)              | Limited   |
pub fn assess_electricity_access(facilities: &[EnergyFacility]) -> AccessLevel {
    if facilities.is_empty() {
        return AccessLevel::Limited;
    }

    let substation_within = |km: f64| {
        facilities
            .iter()
            .filter(|f| f.is_substation())
            .filter_map(EnergyFacility::valid_distance)
            .any(|d| d <= km)
    };
    let facilities_within = |km: f64| {
        facilities
            .iter()
            .filter_map(EnergyFacility::valid_distance)
            .filter(|d| *d <= km)
            .count()
    };

    if substation_within(0.5) || facilities_within(1.0) >= 2 {
        AccessLevel::Excellent
    } else if substation_within(1.0) || facilities_within(2.0) >= 1 {
        AccessLevel::Good
    } else if facilities_within(5.0) >= 1 {
        AccessLevel::Adequate
    } else {
        AccessLevel::Limited
    }
}

/// Risk from the single nearest line (minimum distance).
///
/// Lines without a distance never count as nearest.
pub fn assess_transmission_line_risk(lines: &[TransmissionLine]) -> RiskLevel {
    let nearest = lines
        .iter()
        .filter_map(|line| line.distance_meters().map(|d| (line, d)))
        .fold(None, |best: Option<(&TransmissionLine, f64)>, candidate| match best {
            Some(b) if b.1 <= candidate.1 => Some(b),
            _ => Some(candidate),
        });

    let Some((line, distance)) = nearest else {
        return RiskLevel::Minimal;
    };
    let high_voltage = is_high_voltage(line);

    if distance < 30.0 {
        if high_voltage {
            RiskLevel::VeryHigh
        } else {
            RiskLevel::High
        }
    } else if distance < 100.0 {
        if high_voltage {
            RiskLevel::High
        } else {
            RiskLevel::Moderate
        }
    } else if distance <= 500.0 {
        RiskLevel::Low
    } else {
        RiskLevel::Minimal
    }
}

/// EMF exposure from the line with the largest `kV / meters` impact.
///
/// This selection differs from [`assess_transmission_line_risk`]: a farther,
/// higher-voltage line can dominate a closer one. Lines at distance <= 0 or
/// without a voltage are ignored.
pub fn calculate_emf_exposure(lines: &[TransmissionLine]) -> EmfLevel {
    let dominant = lines
        .iter()
        .filter_map(|line| {
            let distance = line.distance_meters().filter(|d| *d > 0.0)?;
            let voltage = line.capacity_kv.filter(|kv| kv.is_finite())?;
            Some((distance, voltage, voltage / distance))
        })
        .fold(None, |best: Option<(f64, f64, f64)>, candidate| match best {
            Some(b) if b.2 >= candidate.2 => Some(b),
            _ => Some(candidate),
        });

    let Some((distance, voltage, _)) = dominant else {
        return EmfLevel::Negligible;
    };

    if distance <= 50.0 && voltage > HIGH_VOLTAGE_KV {
        EmfLevel::High
    } else if distance <= 100.0 && voltage > HIGH_VOLTAGE_KV {
        EmfLevel::Moderate
    } else if distance <= 50.0 && voltage > SUB_TRANSMISSION_KV {
        EmfLevel::Moderate
    } else if distance <= 300.0 {
        EmfLevel::Low
    } else {
        EmfLevel::Negligible
    }
}

/// Distinct voltage labels across facilities and lines, normalized
/// (`"66 kV"`, `"66kV"` and a 66 kV line are one label)
fn voltage_labels(facilities: &[EnergyFacility], lines: &[TransmissionLine]) -> BTreeSet<String> {
    let facility_labels = facilities
        .iter()
        .filter_map(|f| f.voltage.as_deref())
        .map(|v| v.split_whitespace().collect::<String>().to_lowercase());
    let line_labels = lines
        .iter()
        .filter_map(|l| l.capacity_kv)
        .filter(|kv| kv.is_finite())
        .map(|kv| format!("{}kv", kv));

    facility_labels
        .chain(line_labels)
        .filter(|v| !v.is_empty())
        .collect()
}

/// Network redundancy score, 0-100.
///
/// Sum of four capped sub-scores: facility count (40), nearest facility
/// distance (30), distinct voltage labels (20), transmission line count (10).
pub fn calculate_network_redundancy(
    facilities: &[EnergyFacility],
    lines: &[TransmissionLine],
) -> u8 {
    let count_score = match facilities.len() {
        0 => 0,
        1 => 10,
        2 => 25,
        _ => 40,
    };

    let nearest = facilities
        .iter()
        .filter_map(EnergyFacility::valid_distance)
        .reduce(f64::min);
    let distance_score = match nearest {
        Some(d) if d < 0.5 => 30,
        Some(d) if d < 1.0 => 22,
        Some(d) if d < 2.0 => 15,
        Some(d) if d < 5.0 => 8,
        _ => 0,
    };

    let voltage_score = match voltage_labels(facilities, lines).len() {
        0 => 0,
        1 => 7,
        2 => 14,
        _ => 20,
    };

    let line_score = match lines.len() {
        0 => 0,
        1 => 5,
        _ => 10,
    };

    let total: u32 = count_score + distance_score + voltage_score + line_score;
    total.min(100) as u8
}
