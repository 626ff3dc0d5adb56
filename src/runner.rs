//! Monitoring loop.
//!
//! One synchronous loop drives every cycle:
//!
//! 1. read a frame (reconnecting once on failure),
//! 2. analyze each bin region and update its `BinMonitor`,
//! 3. assemble one payload and submit it to the sink,
//! 4. reset the delivered polluter counts if the sink acknowledged,
//! 5. check the stop signal, then sleep until the next cycle.
//!
//! Time and stopping are injected (`Clock`, `StopSignal`) so tests can drive
//! cycles without real sleeps.

use anyhow::{anyhow, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::analyze::{crop_region, encode_jpeg_base64, RegionAnalyzer};
use crate::config::MonitorConfig;
use crate::frame::Frame;
use crate::ingest::FrameSource;
use crate::monitor::{BinConfig, BinMonitor};
use crate::transport::{assemble_payload, BinReport, Delivery, ReportPolicy, ReportSink};

/// Longest single sleep while waiting, so a stop request is seen promptly.
const STOP_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Wall clock and sleeping, injectable for tests.
pub trait Clock {
    fn now_epoch_s(&self) -> u64;

    fn sleep(&self, duration: Duration);
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_epoch_s(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Shared stop flag. Cloned into the Ctrl-C handler; checked once per cycle.
#[derive(Clone, Debug, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_triggered(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Failure classes surfaced in log lines.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureKind {
    /// Stream could not be opened at startup. Fatal once the budget is spent.
    Acquisition,
    /// Stream dropped after opening. Recovered by reconnecting.
    Read,
    /// One bin could not be analyzed. That bin is left out of the cycle.
    Analysis,
    /// Payload not acknowledged. Counts are kept for the next cycle.
    Sink,
}

impl FailureKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FailureKind::Acquisition => "acquisition",
            FailureKind::Read => "read",
            FailureKind::Analysis => "analysis",
            FailureKind::Sink => "sink",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug)]
pub struct LoopSettings {
    pub cycle_interval: Duration,
    pub retry_attempts: u32,
    pub retry_interval: Duration,
    pub jpeg_quality: u8,
    pub policy: ReportPolicy,
    /// Stop after this many cycles. `None` runs until the stop signal.
    pub max_cycles: Option<u64>,
}

impl LoopSettings {
    pub fn from_config(config: &MonitorConfig) -> Self {
        Self {
            cycle_interval: config.cycle_interval,
            retry_attempts: config.source.retry_attempts,
            retry_interval: config.source.retry_interval,
            jpeg_quality: config.sink.jpeg_quality,
            policy: config.sink.policy.clone(),
            max_cycles: None,
        }
    }
}

/// What happened in one cycle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Sink acknowledged; the reported counts were reset.
    Delivered { status: u16, polluters_count: u32 },
    /// Sink answered with a non-success status; counts kept.
    Rejected { status: u16 },
    /// Payload never reached the sink; counts kept.
    SinkFailed,
    /// No frame could be read even after reconnecting.
    NoFrame,
    /// Every bin failed analysis; nothing was submitted.
    NothingToReport,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunStats {
    pub cycles: u64,
    pub deliveries: u64,
    pub failed_deliveries: u64,
    pub reconnects: u64,
    pub analysis_failures: u64,
}

pub struct MonitorLoop<S, A, K, C> {
    source: S,
    analyzer: A,
    sink: K,
    clock: C,
    monitors: Vec<BinMonitor>,
    settings: LoopSettings,
    stop: StopSignal,
    stats: RunStats,
}

impl<S, A, K, C> MonitorLoop<S, A, K, C>
where
    S: FrameSource,
    A: RegionAnalyzer,
    K: ReportSink,
    C: Clock,
{
    pub fn new(
        source: S,
        analyzer: A,
        sink: K,
        clock: C,
        bins: Vec<BinConfig>,
        settings: LoopSettings,
    ) -> Self {
        Self {
            source,
            analyzer,
            sink,
            clock,
            monitors: bins.into_iter().map(BinMonitor::new).collect(),
            settings,
            stop: StopSignal::new(),
            stats: RunStats::default(),
        }
    }

    pub fn with_stop(mut self, stop: StopSignal) -> Self {
        self.stop = stop;
        self
    }

    pub fn monitors(&self) -> &[BinMonitor] {
        &self.monitors
    }

    pub fn monitor(&self, bin_id: &str) -> Option<&BinMonitor> {
        self.monitors.iter().find(|m| m.id() == bin_id)
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    /// Acquire the stream, then run cycles until stopped. The source is
    /// closed before returning. Only an exhausted acquisition budget is an
    /// error; every later failure is recovered inside the cycle, and a stop
    /// during acquisition ends the run without one.
    pub fn run(&mut self) -> Result<RunStats> {
        if !self.acquire()? {
            self.source.close();
            log::info!("monitoring stopped before {} was opened", self.source.describe());
            return Ok(self.stats.clone());
        }
        log::info!(
            "monitoring {} bin(s) from {} every {:?} using {} analyzer and {} sink",
            self.monitors.len(),
            self.source.describe(),
            self.settings.cycle_interval,
            self.analyzer.name(),
            self.sink.name()
        );

        while !self.should_stop() {
            self.run_cycle();
            if self.should_stop() {
                break;
            }
            self.wait(self.settings.cycle_interval);
        }

        self.source.close();
        log::info!(
            "monitoring stopped after {} cycle(s): {} delivered, {} failed deliveries, {} reconnects",
            self.stats.cycles,
            self.stats.deliveries,
            self.stats.failed_deliveries,
            self.stats.reconnects
        );
        Ok(self.stats.clone())
    }

    /// Open the stream, retrying up to the configured budget.
    ///
    /// Returns `Ok(false)` when the stop signal arrives before the stream is
    /// up; an exhausted budget is an error.
    pub fn acquire(&mut self) -> Result<bool> {
        let attempts = self.settings.retry_attempts.max(1);
        let mut last_error = None;
        for attempt in 1..=attempts {
            if attempt > 1 && self.stop.is_triggered() {
                log::info!(
                    "stop requested after {} of {} attempt(s) to open {}",
                    attempt - 1,
                    attempts,
                    self.source.describe()
                );
                return Ok(false);
            }
            match self.source.open() {
                Ok(()) => {
                    log::info!("stream {} opened", self.source.describe());
                    return Ok(true);
                }
                Err(e) => {
                    log::warn!(
                        "[{}] at {}: open {} failed (attempt {}/{}): {:#}",
                        FailureKind::Acquisition,
                        self.clock.now_epoch_s(),
                        self.source.describe(),
                        attempt,
                        attempts,
                        e
                    );
                    last_error = Some(e);
                }
            }
            if self.stop.is_triggered() {
                log::info!(
                    "stop requested after {} of {} attempt(s) to open {}",
                    attempt,
                    attempts,
                    self.source.describe()
                );
                return Ok(false);
            }
            if attempt < attempts {
                self.wait(self.settings.retry_interval);
            }
        }
        let reason = last_error
            .map(|e| format!("{:#}", e))
            .unwrap_or_default();
        log::error!(
            "[{}] giving up on {}: {}",
            FailureKind::Acquisition,
            self.source.describe(),
            reason
        );
        Err(anyhow!(
            "unable to open {} after {} attempt(s): {}",
            self.source.describe(),
            attempts,
            reason
        ))
    }

    /// Run one full cycle without the trailing sleep.
    pub fn run_cycle(&mut self) -> CycleOutcome {
        self.stats.cycles += 1;
        let now = self.clock.now_epoch_s();

        let Some(frame) = self.read_frame(now) else {
            return CycleOutcome::NoFrame;
        };

        let mut reports = Vec::with_capacity(self.monitors.len());
        for monitor in self.monitors.iter_mut() {
            match process_bin(
                &self.analyzer,
                monitor,
                &frame,
                now,
                self.settings.jpeg_quality,
            ) {
                Ok(report) => {
                    log::info!(
                        "bin {} status={} ratio={:.4} last_clean={} polluters={}",
                        report.bin_id,
                        report.fill,
                        report.ratio,
                        report
                            .last_clean_time
                            .map(|t| t.to_string())
                            .unwrap_or_else(|| "-".to_string()),
                        report.polluter_count
                    );
                    reports.push(report);
                }
                Err(e) => {
                    self.stats.analysis_failures += 1;
                    log::warn!(
                        "[{}] bin {} at {} (frame {}): {:#}; omitted from this cycle",
                        FailureKind::Analysis,
                        monitor.id(),
                        now,
                        frame.sequence,
                        e
                    );
                }
            }
        }
        drop(frame);

        if reports.is_empty() {
            log::warn!("no bin could be analyzed at {}; nothing submitted", now);
            return CycleOutcome::NothingToReport;
        }

        let assembled = assemble_payload(&reports, &self.settings.policy);
        let polluters_count = assembled.payload.polluters_count;
        match self.sink.submit(&assembled.payload) {
            Ok(Delivery::Acknowledged { status, .. }) => {
                self.stats.deliveries += 1;
                for monitor in self.monitors.iter_mut() {
                    if assembled.counted_bins.iter().any(|id| id == monitor.id()) {
                        monitor.acknowledge_delivery();
                    }
                }
                log::info!(
                    "payload delivered at {} (status {}), {} polluter(s) reported",
                    now,
                    status,
                    polluters_count
                );
                CycleOutcome::Delivered {
                    status,
                    polluters_count,
                }
            }
            Ok(Delivery::Rejected { status, body }) => {
                self.stats.failed_deliveries += 1;
                log::warn!(
                    "[{}] at {}: endpoint answered {} ({}); keeping {} polluter(s) for next cycle",
                    FailureKind::Sink,
                    now,
                    status,
                    crate::transport::truncate_for_log(&body),
                    polluters_count
                );
                CycleOutcome::Rejected { status }
            }
            Err(e) => {
                self.stats.failed_deliveries += 1;
                log::warn!(
                    "[{}] at {}: {:#}; keeping {} polluter(s) for next cycle",
                    FailureKind::Sink,
                    now,
                    e,
                    polluters_count
                );
                CycleOutcome::SinkFailed
            }
        }
    }

    /// Read a frame; on failure reconnect and try once more.
    fn read_frame(&mut self, now: u64) -> Option<Frame> {
        let error = match self.source.read() {
            Ok(frame) => return Some(frame),
            Err(e) => e,
        };
        log::warn!(
            "[{}] at {}: {} dropped: {:#}; reconnecting",
            FailureKind::Read,
            now,
            self.source.describe(),
            error
        );
        self.stats.reconnects += 1;
        if let Err(e) = self.source.reconnect() {
            log::warn!(
                "[{}] at {}: reconnect to {} failed: {:#}; retrying next cycle",
                FailureKind::Read,
                now,
                self.source.describe(),
                e
            );
            return None;
        }
        match self.source.read() {
            Ok(frame) => Some(frame),
            Err(e) => {
                log::warn!(
                    "[{}] at {}: no frame after reconnect: {:#}; retrying next cycle",
                    FailureKind::Read,
                    now,
                    e
                );
                None
            }
        }
    }

    fn should_stop(&self) -> bool {
        if self.stop.is_triggered() {
            return true;
        }
        self.settings
            .max_cycles
            .is_some_and(|max| self.stats.cycles >= max)
    }

    fn wait(&self, duration: Duration) {
        let mut remaining = duration;
        while !remaining.is_zero() && !self.stop.is_triggered() {
            let slice = remaining.min(STOP_POLL_INTERVAL);
            self.clock.sleep(slice);
            remaining -= slice;
        }
    }
}

/// Analyze one bin and fold the result into its monitor.
///
/// The crop is encoded before the monitor is updated, so a bin that fails
/// at any step keeps its previous state.
fn process_bin<A: RegionAnalyzer>(
    analyzer: &A,
    monitor: &mut BinMonitor,
    frame: &Frame,
    now: u64,
    jpeg_quality: u8,
) -> Result<BinReport> {
    let analysis = analyzer.analyze(frame, monitor.config())?;
    let crop = crop_region(frame, &monitor.config().region)?;
    let image_base64 = encode_jpeg_base64(&crop, jpeg_quality)?;
    let observation = monitor.observe(analysis, now)?;
    Ok(BinReport {
        bin_id: monitor.id().to_string(),
        fill: observation.fill,
        ratio: observation.ratio,
        image_base64,
        last_clean_time: observation.last_clean_time,
        polluter_count: observation.polluter_count,
    })
}
