//! Per-bin temporal state.
//!
//! A `BinMonitor` owns the state of one physical bin and applies the
//! debounce/accumulation policy to the ratio produced for it each cycle:
//!
//! - a run of `clean_frame_count` strictly decreasing ratios registers one
//!   clean event, after which the run counter restarts;
//! - every strictly increasing ratio counts one polluter;
//! - the polluter count only goes back to zero when the reporting sink
//!   acknowledges a payload that carried it.
//!
//! Nothing here touches the camera or the network.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use crate::analyze::{Analysis, EdgeProfile, FillLevel, FillThresholds, Region};

/// Immutable per-bin parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BinConfig {
    pub id: String,
    pub region: Region,
    pub thresholds: FillThresholds,
    /// Consecutive strictly decreasing observations that make a clean event.
    pub clean_frame_count: u32,
    pub edges: EdgeProfile,
}

impl BinConfig {
    pub fn validate(&self) -> Result<()> {
        validate_bin_id(&self.id)?;
        self.region
            .validate()
            .map_err(|e| anyhow!("bin {}: {}", self.id, e))?;
        self.edges
            .validate()
            .map_err(|e| anyhow!("bin {}: {}", self.id, e))?;
        let FillThresholds { full, half } = self.thresholds;
        if !(0.0..=1.0).contains(&full) || !(0.0..=1.0).contains(&half) {
            return Err(anyhow!(
                "bin {}: thresholds must lie in [0, 1] (full={}, half={})",
                self.id,
                full,
                half
            ));
        }
        if half >= full {
            return Err(anyhow!(
                "bin {}: half_threshold ({}) must be below full_threshold ({})",
                self.id,
                half,
                full
            ));
        }
        if self.clean_frame_count == 0 {
            return Err(anyhow!("bin {}: clean_frame_count must be >= 1", self.id));
        }
        Ok(())
    }
}

/// Bin ids are embedded in the `[id-status-image]` payload entries, so the
/// entry delimiters are not allowed in them.
pub fn validate_bin_id(id: &str) -> Result<()> {
    if id.trim().is_empty() {
        return Err(anyhow!("bin id must not be empty"));
    }
    if let Some(bad) = id.chars().find(|c| matches!(c, '[' | ']' | ',' | '-')) {
        return Err(anyhow!("bin id {:?} contains reserved character {:?}", id, bad));
    }
    Ok(())
}

/// Mutable per-bin state. Starts empty and lives for the whole run.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BinState {
    pub previous_fill_ratio: Option<f64>,
    pub consecutive_decreasing_count: u32,
    /// Unix epoch seconds of the last clean event.
    pub last_clean_time: Option<u64>,
    pub polluter_count: u32,
    /// Clean events registered since startup. Diagnostic only.
    pub clean_events: u64,
}

/// Direction of the ratio relative to the previous cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Trend {
    /// No previous ratio existed.
    First,
    Rising,
    Falling,
    Steady,
}

/// Result of feeding one analysis into a monitor.
#[derive(Clone, Debug, PartialEq)]
pub struct Observation {
    pub ratio: f64,
    pub fill: FillLevel,
    pub trend: Trend,
    pub clean_event: bool,
    pub consecutive_decreasing_count: u32,
    pub last_clean_time: Option<u64>,
    pub polluter_count: u32,
}

pub struct BinMonitor {
    config: BinConfig,
    state: BinState,
}

impl BinMonitor {
    pub fn new(config: BinConfig) -> Self {
        Self {
            config,
            state: BinState::default(),
        }
    }

    pub fn id(&self) -> &str {
        &self.config.id
    }

    pub fn config(&self) -> &BinConfig {
        &self.config
    }

    pub fn state(&self) -> &BinState {
        &self.state
    }

    /// Apply one cycle's analysis. `now_epoch_s` stamps a clean event.
    pub fn observe(&mut self, analysis: Analysis, now_epoch_s: u64) -> Result<Observation> {
        let ratio = analysis.ratio;
        if !ratio.is_finite() || !(0.0..=1.0).contains(&ratio) {
            return Err(anyhow!(
                "bin {}: fill ratio {} is outside [0, 1]",
                self.config.id,
                ratio
            ));
        }

        let mut clean_event = false;
        let trend = match self.state.previous_fill_ratio {
            None => Trend::First,
            Some(previous) if ratio < previous => {
                self.state.consecutive_decreasing_count += 1;
                if self.state.consecutive_decreasing_count >= self.config.clean_frame_count {
                    self.state.last_clean_time = Some(now_epoch_s);
                    self.state.consecutive_decreasing_count = 0;
                    self.state.clean_events += 1;
                    clean_event = true;
                    log::info!(
                        "bin {}: clean event registered at {} after {} decreasing frames",
                        self.config.id,
                        now_epoch_s,
                        self.config.clean_frame_count
                    );
                }
                Trend::Falling
            }
            Some(previous) if ratio > previous => {
                self.state.consecutive_decreasing_count = 0;
                self.state.polluter_count = self.state.polluter_count.saturating_add(1);
                log::debug!(
                    "bin {}: ratio rose {:.4} -> {:.4}, polluter count {}",
                    self.config.id,
                    previous,
                    ratio,
                    self.state.polluter_count
                );
                Trend::Rising
            }
            Some(_) => {
                self.state.consecutive_decreasing_count = 0;
                Trend::Steady
            }
        };
        self.state.previous_fill_ratio = Some(ratio);

        Ok(Observation {
            ratio,
            fill: analysis.fill,
            trend,
            clean_event,
            consecutive_decreasing_count: self.state.consecutive_decreasing_count,
            last_clean_time: self.state.last_clean_time,
            polluter_count: self.state.polluter_count,
        })
    }

    /// Called when the sink acknowledged a payload carrying this bin's count.
    pub fn acknowledge_delivery(&mut self) {
        if self.state.polluter_count > 0 {
            log::debug!(
                "bin {}: polluter count {} delivered, resetting",
                self.config.id,
                self.state.polluter_count
            );
        }
        self.state.polluter_count = 0;
    }
}
