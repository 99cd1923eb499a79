//! Electricity access and risk classification.

mod analysis;
mod classify;

pub use analysis::{
    analyze_electricity_data, ElectricityAnalysis, SubstationSummary, TransmissionLineSummary,
};
pub use classify::{
    assess_electricity_access, assess_transmission_line_risk, calculate_emf_exposure,
    calculate_network_redundancy, AccessLevel, EmfLevel, RiskLevel, HIGH_VOLTAGE_KV,
    SUB_TRANSMISSION_KV,
};
