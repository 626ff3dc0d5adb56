use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::analyze::FillLevel;

/// JSON object posted to the collection endpoint once per cycle.
///
/// Field names are fixed by the endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusPayload {
    /// `[<id>-<Full|Half|Empty>-<base64 jpeg>]` entries joined by `,`.
    #[serde(rename = "BinData")]
    pub bin_data: String,
    /// Last clean time, unix epoch seconds as a string.
    #[serde(rename = "LCT")]
    pub last_clean_time: String,
    #[serde(rename = "Vehicle Number")]
    pub vehicle_number: String,
    #[serde(rename = "Polluters Count")]
    pub polluters_count: u32,
}

/// One successfully processed bin in the current cycle.
#[derive(Clone, Debug, PartialEq)]
pub struct BinReport {
    pub bin_id: String,
    pub fill: FillLevel,
    pub ratio: f64,
    pub image_base64: String,
    pub last_clean_time: Option<u64>,
    pub polluter_count: u32,
}

/// Which bins' polluter counts make up the reported number.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PolluterCountMode {
    /// Only the primary bin's count is reported (and reset on ack).
    #[default]
    Primary,
    /// The counts of all reported bins are summed (and all reset on ack).
    Sum,
}

impl FromStr for PolluterCountMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "primary" => Ok(Self::Primary),
            "sum" | "total" => Ok(Self::Sum),
            other => Err(anyhow!(
                "unknown polluter_count mode '{}': expected 'primary' or 'sum'",
                other
            )),
        }
    }
}

/// Static settings that shape the payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReportPolicy {
    pub vehicle_id: String,
    pub polluter_count: PolluterCountMode,
    /// Bin whose count and clean time are authoritative in `Primary` mode.
    pub primary_bin: String,
    /// LCT value sent while no counted bin has registered a clean event.
    pub last_clean_time_fallback: String,
}

/// A payload plus the bins whose polluter counts it carries.
#[derive(Clone, Debug, PartialEq)]
pub struct AssembledPayload {
    pub payload: StatusPayload,
    /// Ids of the bins to reset when the payload is acknowledged.
    pub counted_bins: Vec<String>,
}

pub fn format_bin_data(reports: &[BinReport]) -> String {
    reports
        .iter()
        .map(|r| format!("[{}-{}-{}]", r.bin_id, r.fill.as_str(), r.image_base64))
        .collect::<Vec<_>>()
        .join(",")
}

/// Build the cycle payload from the bins processed this cycle.
///
/// A bin omitted from `reports` (analysis failure) contributes neither its
/// count nor its clean time, and is not reset on acknowledgement.
pub fn assemble_payload(reports: &[BinReport], policy: &ReportPolicy) -> AssembledPayload {
    let counted: Vec<&BinReport> = match policy.polluter_count {
        PolluterCountMode::Primary => reports
            .iter()
            .filter(|r| r.bin_id == policy.primary_bin)
            .collect(),
        PolluterCountMode::Sum => reports.iter().collect(),
    };

    let polluters_count = counted
        .iter()
        .fold(0u32, |acc, r| acc.saturating_add(r.polluter_count));
    let last_clean_time = counted
        .iter()
        .filter_map(|r| r.last_clean_time)
        .max()
        .map(|t| t.to_string())
        .unwrap_or_else(|| policy.last_clean_time_fallback.clone());

    AssembledPayload {
        payload: StatusPayload {
            bin_data: format_bin_data(reports),
            last_clean_time,
            vehicle_number: policy.vehicle_id.clone(),
            polluters_count,
        },
        counted_bins: counted.iter().map(|r| r.bin_id.clone()).collect(),
    }
}
