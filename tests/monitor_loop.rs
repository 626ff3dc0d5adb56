use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use anyhow::{anyhow, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::RgbImage;

use binwatch::{
    Analysis, BinConfig, Clock, CycleOutcome, Delivery, EdgeDensityAnalyzer, EdgeProfile,
    FillLevel, FillThresholds, Frame, FrameSource, LoopSettings, MonitorLoop, PolluterCountMode,
    Region, RegionAnalyzer, ReportPolicy, ReportSink, RtspConfig, RtspSource, StatusPayload,
    StopSignal,
};

// ----------------------------------------------------------------------------
// Fakes
// ----------------------------------------------------------------------------

#[derive(Clone, Copy, Debug)]
enum Step {
    Frame,
    Drop,
}

/// Frame source following a script. Failing opens are consumed first.
#[derive(Default)]
struct ScriptedSource {
    steps: VecDeque<Step>,
    failing_opens: u32,
    open: bool,
    opens: u32,
    closes: u32,
    sequence: u64,
    stop_on_open: Option<StopSignal>,
}

impl ScriptedSource {
    fn new(steps: &[Step]) -> Self {
        Self {
            steps: steps.iter().copied().collect(),
            ..Self::default()
        }
    }

    fn with_failing_opens(mut self, count: u32) -> Self {
        self.failing_opens = count;
        self
    }

    /// Trigger `stop` from inside every open attempt, like a Ctrl-C that
    /// lands while the camera is still unreachable.
    fn stopping_on_open(mut self, stop: StopSignal) -> Self {
        self.stop_on_open = Some(stop);
        self
    }
}

impl FrameSource for ScriptedSource {
    fn describe(&self) -> String {
        "scripted://camera".to_string()
    }

    fn open(&mut self) -> Result<()> {
        self.opens += 1;
        if let Some(stop) = &self.stop_on_open {
            stop.trigger();
        }
        if self.failing_opens > 0 {
            self.failing_opens -= 1;
            return Err(anyhow!("camera unreachable"));
        }
        self.open = true;
        Ok(())
    }

    fn read(&mut self) -> Result<Frame> {
        if !self.open {
            return Err(anyhow!("stream not open"));
        }
        match self.steps.pop_front() {
            Some(Step::Frame) => {
                self.sequence += 1;
                Ok(Frame::new(RgbImage::new(64, 64), self.sequence))
            }
            Some(Step::Drop) => {
                self.open = false;
                Err(anyhow!("connection reset"))
            }
            None => Err(anyhow!("end of stream")),
        }
    }

    fn close(&mut self) {
        if self.open {
            self.closes += 1;
        }
        self.open = false;
    }

    fn is_open(&self) -> bool {
        self.open
    }
}

/// Analyzer returning scripted ratios per bin; `None` is an analysis failure.
struct ScriptedAnalyzer {
    ratios: RefCell<HashMap<String, VecDeque<Option<f64>>>>,
}

impl ScriptedAnalyzer {
    fn new(script: &[(&str, &[Option<f64>])]) -> Self {
        Self {
            ratios: RefCell::new(
                script
                    .iter()
                    .map(|(id, ratios)| (id.to_string(), ratios.iter().copied().collect()))
                    .collect(),
            ),
        }
    }
}

impl RegionAnalyzer for ScriptedAnalyzer {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn analyze(&self, _frame: &Frame, bin: &BinConfig) -> Result<Analysis> {
        let ratio = self
            .ratios
            .borrow_mut()
            .get_mut(&bin.id)
            .and_then(|queue| queue.pop_front())
            .flatten()
            .ok_or_else(|| anyhow!("malformed region data"))?;
        Ok(Analysis {
            ratio,
            fill: FillLevel::classify(ratio, &bin.thresholds),
        })
    }
}

#[derive(Clone, Copy, Debug)]
enum Answer {
    Ack,
    Reject(u16),
    Unreachable,
}

/// Sink answering from a script (acknowledging once the script runs out).
#[derive(Default)]
struct ScriptedSink {
    answers: VecDeque<Answer>,
    payloads: Vec<StatusPayload>,
    stop_after: Option<(usize, StopSignal)>,
}

impl ScriptedSink {
    fn new(answers: &[Answer]) -> Self {
        Self {
            answers: answers.iter().copied().collect(),
            ..Self::default()
        }
    }
}

impl ReportSink for ScriptedSink {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn submit(&mut self, payload: &StatusPayload) -> Result<Delivery> {
        self.payloads.push(payload.clone());
        if let Some((count, stop)) = &self.stop_after {
            if self.payloads.len() >= *count {
                stop.trigger();
            }
        }
        match self.answers.pop_front().unwrap_or(Answer::Ack) {
            Answer::Ack => Ok(Delivery::Acknowledged {
                status: 200,
                body: "ok".to_string(),
            }),
            Answer::Reject(status) => Ok(Delivery::Rejected {
                status,
                body: "nope".to_string(),
            }),
            Answer::Unreachable => Err(anyhow!("connection refused")),
        }
    }
}

/// Clock whose sleeps advance virtual time instantly.
struct FakeClock {
    start: u64,
    slept: Cell<Duration>,
}

impl FakeClock {
    fn new() -> Self {
        Self {
            start: 1_732_060_800,
            slept: Cell::new(Duration::ZERO),
        }
    }
}

impl Clock for FakeClock {
    fn now_epoch_s(&self) -> u64 {
        self.start + self.slept.get().as_secs()
    }

    fn sleep(&self, duration: Duration) {
        self.slept.set(self.slept.get() + duration);
    }
}

// ----------------------------------------------------------------------------
// Helpers
// ----------------------------------------------------------------------------

fn bin(id: &str, region: Region, full: f64, half: f64, clean_frame_count: u32) -> BinConfig {
    BinConfig {
        id: id.to_string(),
        region,
        thresholds: FillThresholds { full, half },
        clean_frame_count,
        edges: EdgeProfile::default(),
    }
}

fn two_bins() -> Vec<BinConfig> {
    vec![
        bin("Bin1", Region::new(0, 0, 32, 32), 0.15, 0.07, 4),
        bin("Bin2", Region::new(32, 32, 32, 32), 0.2, 0.1, 6),
    ]
}

fn settings(mode: PolluterCountMode, max_cycles: u64) -> LoopSettings {
    LoopSettings {
        cycle_interval: Duration::from_secs(3600),
        retry_attempts: 5,
        retry_interval: Duration::from_secs(2),
        jpeg_quality: 80,
        policy: ReportPolicy {
            vehicle_id: "0".to_string(),
            polluter_count: mode,
            primary_bin: "Bin1".to_string(),
            last_clean_time_fallback: "0".to_string(),
        },
        max_cycles: Some(max_cycles),
    }
}

fn frames(n: usize) -> Vec<Step> {
    vec![Step::Frame; n]
}

// ----------------------------------------------------------------------------
// Scenarios
// ----------------------------------------------------------------------------

#[test]
fn rising_ratios_are_reported_as_polluters() -> Result<()> {
    let mut monitor_loop = MonitorLoop::new(
        ScriptedSource::new(&frames(3)),
        ScriptedAnalyzer::new(&[
            ("Bin1", &[Some(0.05), Some(0.10), Some(0.20)]),
            ("Bin2", &[Some(0.05), Some(0.05), Some(0.05)]),
        ]),
        ScriptedSink::new(&[Answer::Reject(503), Answer::Reject(503), Answer::Reject(503)]),
        FakeClock::new(),
        two_bins(),
        settings(PolluterCountMode::Primary, 3),
    );
    monitor_loop.run()?;

    let payloads = &monitor_loop.sink().payloads;
    let counts: Vec<u32> = payloads.iter().map(|p| p.polluters_count).collect();
    assert_eq!(counts, vec![0, 1, 2]);
    assert!(payloads[0].bin_data.starts_with("[Bin1-Empty-"));
    assert!(payloads[1].bin_data.starts_with("[Bin1-Half-"));
    assert!(payloads[2].bin_data.starts_with("[Bin1-Full-"));

    let state = monitor_loop.monitor("Bin1").unwrap().state();
    assert_eq!(state.consecutive_decreasing_count, 0);
    assert_eq!(state.polluter_count, 2);
    Ok(())
}

#[test]
fn counts_survive_failed_deliveries_and_reset_on_ack() -> Result<()> {
    let mut monitor_loop = MonitorLoop::new(
        ScriptedSource::new(&frames(5)),
        ScriptedAnalyzer::new(&[
            (
                "Bin1",
                &[Some(0.01), Some(0.02), Some(0.03), Some(0.04), Some(0.04)],
            ),
            ("Bin2", &[Some(0.0); 5]),
        ]),
        ScriptedSink::new(&[
            Answer::Reject(500),
            Answer::Unreachable,
            Answer::Reject(500),
            Answer::Ack,
            Answer::Ack,
        ]),
        FakeClock::new(),
        two_bins(),
        settings(PolluterCountMode::Primary, 5),
    );

    assert!(monitor_loop.acquire()?);
    assert_eq!(monitor_loop.run_cycle(), CycleOutcome::Rejected { status: 500 });
    assert_eq!(monitor_loop.run_cycle(), CycleOutcome::SinkFailed);
    assert_eq!(monitor_loop.run_cycle(), CycleOutcome::Rejected { status: 500 });
    assert_eq!(monitor_loop.monitor("Bin1").unwrap().state().polluter_count, 2);

    assert_eq!(
        monitor_loop.run_cycle(),
        CycleOutcome::Delivered {
            status: 200,
            polluters_count: 3
        }
    );
    assert_eq!(monitor_loop.monitor("Bin1").unwrap().state().polluter_count, 0);

    // steady ratio: nothing new to report
    assert_eq!(
        monitor_loop.run_cycle(),
        CycleOutcome::Delivered {
            status: 200,
            polluters_count: 0
        }
    );
    let counts: Vec<u32> = monitor_loop
        .sink()
        .payloads
        .iter()
        .map(|p| p.polluters_count)
        .collect();
    assert_eq!(counts, vec![0, 1, 2, 3, 0]);
    Ok(())
}

#[test]
fn clean_event_sets_last_clean_time_in_payload() -> Result<()> {
    let clock = FakeClock::new();
    let start = clock.now_epoch_s();
    let mut monitor_loop = MonitorLoop::new(
        ScriptedSource::new(&frames(5)),
        ScriptedAnalyzer::new(&[
            (
                "Bin1",
                &[Some(0.06), Some(0.05), Some(0.03), Some(0.02), Some(0.01)],
            ),
            ("Bin2", &[Some(0.0); 5]),
        ]),
        ScriptedSink::new(&[]),
        clock,
        two_bins(),
        settings(PolluterCountMode::Primary, 5),
    );
    monitor_loop.run()?;

    let payloads = &monitor_loop.sink().payloads;
    assert!(payloads[..4].iter().all(|p| p.last_clean_time == "0"));
    let fifth_cycle_time = start + 4 * 3600;
    assert_eq!(payloads[4].last_clean_time, fifth_cycle_time.to_string());
    assert!(payloads.iter().all(|p| p.polluters_count == 0));

    let state = monitor_loop.monitor("Bin1").unwrap().state();
    assert_eq!(state.last_clean_time, Some(fifth_cycle_time));
    assert_eq!(state.clean_events, 1);
    assert_eq!(state.consecutive_decreasing_count, 0);
    Ok(())
}

#[test]
fn read_failure_reconnects_without_resetting_state() -> Result<()> {
    let source = ScriptedSource::new(&[
        Step::Frame,
        Step::Frame,
        Step::Drop,
        Step::Frame,
        Step::Frame,
    ]);
    let mut monitor_loop = MonitorLoop::new(
        source,
        ScriptedAnalyzer::new(&[
            ("Bin1", &[Some(0.30), Some(0.20), Some(0.25), Some(0.10)]),
            ("Bin2", &[Some(0.01), Some(0.02), Some(0.03), Some(0.04)]),
        ]),
        ScriptedSink::new(&[Answer::Reject(502); 4]),
        FakeClock::new(),
        two_bins(),
        settings(PolluterCountMode::Sum, 4),
    );
    monitor_loop.run()?;

    assert_eq!(monitor_loop.stats().cycles, 4);
    assert_eq!(monitor_loop.stats().reconnects, 1);
    assert_eq!(monitor_loop.source().opens, 2);
    assert_eq!(monitor_loop.sink().payloads.len(), 4);

    let bin1 = monitor_loop.monitor("Bin1").unwrap().state();
    assert_eq!(bin1.previous_fill_ratio, Some(0.10));
    assert_eq!(bin1.polluter_count, 1);
    assert_eq!(bin1.consecutive_decreasing_count, 1);

    let bin2 = monitor_loop.monitor("Bin2").unwrap().state();
    assert_eq!(bin2.polluter_count, 3);

    let counts: Vec<u32> = monitor_loop
        .sink()
        .payloads
        .iter()
        .map(|p| p.polluters_count)
        .collect();
    assert_eq!(counts, vec![0, 1, 3, 4]);
    Ok(())
}

#[test]
fn dead_stream_skips_cycle_and_retries_next_cycle() -> Result<()> {
    let mut source = ScriptedSource::new(&[Step::Frame, Step::Drop, Step::Frame]);
    source.open()?;
    let mut monitor_loop = MonitorLoop::new(
        source,
        ScriptedAnalyzer::new(&[
            ("Bin1", &[Some(0.1), Some(0.2)]),
            ("Bin2", &[Some(0.1), Some(0.2)]),
        ]),
        ScriptedSink::new(&[]),
        FakeClock::new(),
        two_bins(),
        settings(PolluterCountMode::Primary, 10),
    );

    assert!(matches!(
        monitor_loop.run_cycle(),
        CycleOutcome::Delivered { .. }
    ));
    // drop, then the reconnect succeeds and the retried read gets a frame
    assert!(matches!(
        monitor_loop.run_cycle(),
        CycleOutcome::Delivered { .. }
    ));
    // script exhausted: the read and the retried read both fail
    assert_eq!(monitor_loop.run_cycle(), CycleOutcome::NoFrame);
    assert_eq!(monitor_loop.run_cycle(), CycleOutcome::NoFrame);
    assert_eq!(monitor_loop.stats().reconnects, 3);
    assert_eq!(
        monitor_loop.monitor("Bin1").unwrap().state().previous_fill_ratio,
        Some(0.2)
    );
    Ok(())
}

#[test]
fn acquisition_retries_within_budget() -> Result<()> {
    let mut monitor_loop = MonitorLoop::new(
        ScriptedSource::new(&frames(1)).with_failing_opens(2),
        ScriptedAnalyzer::new(&[("Bin1", &[Some(0.1)]), ("Bin2", &[Some(0.1)])]),
        ScriptedSink::new(&[]),
        FakeClock::new(),
        two_bins(),
        settings(PolluterCountMode::Primary, 1),
    );
    let stats = monitor_loop.run()?;

    assert_eq!(stats.cycles, 1);
    assert_eq!(monitor_loop.source().opens, 3);
    assert_eq!(monitor_loop.source().closes, 1);
    // two retry waits, no trailing cycle sleep after the last cycle
    assert_eq!(monitor_loop.clock().slept.get(), Duration::from_secs(4));
    Ok(())
}

#[test]
fn exhausted_acquisition_budget_is_fatal() {
    let mut monitor_loop = MonitorLoop::new(
        ScriptedSource::new(&frames(1)).with_failing_opens(10),
        ScriptedAnalyzer::new(&[]),
        ScriptedSink::new(&[]),
        FakeClock::new(),
        two_bins(),
        LoopSettings {
            retry_attempts: 3,
            ..settings(PolluterCountMode::Primary, 1)
        },
    );

    let err = monitor_loop.run().expect_err("acquisition must fail");
    assert!(err.to_string().contains("3 attempt"));
    assert_eq!(monitor_loop.source().opens, 3);
    assert_eq!(monitor_loop.stats().cycles, 0);
    assert!(monitor_loop.sink().payloads.is_empty());
    assert_eq!(monitor_loop.clock().slept.get(), Duration::from_secs(4));
}

#[test]
fn stop_during_acquisition_ends_run_cleanly() -> Result<()> {
    let stop = StopSignal::new();
    let mut monitor_loop = MonitorLoop::new(
        ScriptedSource::new(&frames(1))
            .with_failing_opens(10)
            .stopping_on_open(stop.clone()),
        ScriptedAnalyzer::new(&[]),
        ScriptedSink::new(&[]),
        FakeClock::new(),
        two_bins(),
        settings(PolluterCountMode::Primary, 5),
    )
    .with_stop(stop);

    let stats = monitor_loop.run()?;
    assert_eq!(stats.cycles, 0);
    assert_eq!(monitor_loop.source().opens, 1);
    assert!(!monitor_loop.source().is_open());
    assert!(monitor_loop.sink().payloads.is_empty());
    assert_eq!(monitor_loop.clock().slept.get(), Duration::ZERO);
    Ok(())
}

#[test]
fn stop_between_acquisition_attempts_is_not_fatal() -> Result<()> {
    let stop = StopSignal::new();
    let mut monitor_loop = MonitorLoop::new(
        ScriptedSource::new(&frames(1)).with_failing_opens(10),
        ScriptedAnalyzer::new(&[]),
        ScriptedSink::new(&[]),
        FakeClock::new(),
        two_bins(),
        settings(PolluterCountMode::Primary, 5),
    )
    .with_stop(stop.clone());

    assert!(monitor_loop.acquire().is_err());
    assert_eq!(monitor_loop.source().opens, 5);

    // a pending stop turns the next failed attempt into an orderly exit
    stop.trigger();
    assert!(!monitor_loop.acquire()?);
    assert_eq!(monitor_loop.source().opens, 6);
    Ok(())
}

#[test]
fn analysis_failure_omits_only_that_bin() -> Result<()> {
    let mut monitor_loop = MonitorLoop::new(
        ScriptedSource::new(&frames(3)),
        ScriptedAnalyzer::new(&[
            ("Bin1", &[Some(0.05), Some(0.08), Some(0.09)]),
            ("Bin2", &[Some(0.05), None, Some(0.07)]),
        ]),
        ScriptedSink::new(&[Answer::Reject(500); 3]),
        FakeClock::new(),
        two_bins(),
        settings(PolluterCountMode::Sum, 3),
    );
    monitor_loop.run()?;

    let payloads = &monitor_loop.sink().payloads;
    assert_eq!(payloads.len(), 3);
    assert!(payloads[0].bin_data.contains("[Bin2-"));
    assert!(!payloads[1].bin_data.contains("[Bin2-"));
    assert!(payloads[1].bin_data.starts_with("[Bin1-Half-"));
    assert!(payloads[2].bin_data.contains("[Bin2-"));
    assert_eq!(monitor_loop.stats().analysis_failures, 1);

    // the failed cycle did not touch Bin2's history
    let bin2 = monitor_loop.monitor("Bin2").unwrap().state();
    assert_eq!(bin2.previous_fill_ratio, Some(0.07));
    assert_eq!(bin2.polluter_count, 1);
    Ok(())
}

#[test]
fn all_bins_failing_submits_nothing() -> Result<()> {
    let mut monitor_loop = MonitorLoop::new(
        ScriptedSource::new(&frames(1)),
        ScriptedAnalyzer::new(&[("Bin1", &[None]), ("Bin2", &[None])]),
        ScriptedSink::new(&[]),
        FakeClock::new(),
        two_bins(),
        settings(PolluterCountMode::Primary, 1),
    );
    assert!(monitor_loop.acquire()?);
    assert_eq!(monitor_loop.run_cycle(), CycleOutcome::NothingToReport);
    assert!(monitor_loop.sink().payloads.is_empty());
    Ok(())
}

#[test]
fn region_outside_frame_is_an_analysis_failure() -> Result<()> {
    let bins = vec![
        bin("Bin1", Region::new(0, 0, 32, 32), 0.15, 0.07, 4),
        bin("Bin2", Region::new(48, 48, 32, 32), 0.2, 0.1, 6),
    ];
    let mut monitor_loop = MonitorLoop::new(
        ScriptedSource::new(&frames(1)),
        EdgeDensityAnalyzer::new(),
        ScriptedSink::new(&[]),
        FakeClock::new(),
        bins,
        settings(PolluterCountMode::Primary, 1),
    );
    monitor_loop.run()?;

    let payloads = &monitor_loop.sink().payloads;
    assert_eq!(payloads.len(), 1);
    assert!(payloads[0].bin_data.starts_with("[Bin1-Empty-"));
    assert!(!payloads[0].bin_data.contains("Bin2"));
    assert_eq!(monitor_loop.monitor("Bin2").unwrap().state().previous_fill_ratio, None);
    Ok(())
}

#[test]
fn primary_mode_keeps_secondary_counts() -> Result<()> {
    let mut monitor_loop = MonitorLoop::new(
        ScriptedSource::new(&frames(3)),
        ScriptedAnalyzer::new(&[
            ("Bin1", &[Some(0.1), Some(0.2), Some(0.3)]),
            ("Bin2", &[Some(0.1), Some(0.2), Some(0.3)]),
        ]),
        ScriptedSink::new(&[]),
        FakeClock::new(),
        two_bins(),
        settings(PolluterCountMode::Primary, 3),
    );
    monitor_loop.run()?;

    let counts: Vec<u32> = monitor_loop
        .sink()
        .payloads
        .iter()
        .map(|p| p.polluters_count)
        .collect();
    assert_eq!(counts, vec![0, 1, 1]);
    assert_eq!(monitor_loop.monitor("Bin1").unwrap().state().polluter_count, 0);
    assert_eq!(monitor_loop.monitor("Bin2").unwrap().state().polluter_count, 2);
    Ok(())
}

#[test]
fn stop_signal_ends_loop_after_current_cycle() -> Result<()> {
    let stop = StopSignal::new();
    let mut sink = ScriptedSink::new(&[]);
    sink.stop_after = Some((2, stop.clone()));

    let mut monitor_loop = MonitorLoop::new(
        ScriptedSource::new(&frames(10)),
        ScriptedAnalyzer::new(&[("Bin1", &[Some(0.1); 10]), ("Bin2", &[Some(0.1); 10])]),
        sink,
        FakeClock::new(),
        two_bins(),
        LoopSettings {
            max_cycles: None,
            ..settings(PolluterCountMode::Primary, 0)
        },
    )
    .with_stop(stop);
    let stats = monitor_loop.run()?;

    assert_eq!(stats.cycles, 2);
    assert!(!monitor_loop.source().is_open());
    assert_eq!(monitor_loop.source().closes, 1);
    // one full cycle interval between the two cycles, none after the stop
    assert_eq!(monitor_loop.clock().slept.get(), Duration::from_secs(3600));
    Ok(())
}

#[test]
fn stop_before_first_cycle_still_releases_stream() -> Result<()> {
    let stop = StopSignal::new();
    stop.trigger();
    let mut monitor_loop = MonitorLoop::new(
        ScriptedSource::new(&frames(1)),
        ScriptedAnalyzer::new(&[]),
        ScriptedSink::new(&[]),
        FakeClock::new(),
        two_bins(),
        settings(PolluterCountMode::Primary, 5),
    )
    .with_stop(stop);
    let stats = monitor_loop.run()?;

    assert_eq!(stats.cycles, 0);
    assert_eq!(monitor_loop.source().opens, 1);
    assert_eq!(monitor_loop.source().closes, 1);
    Ok(())
}

#[test]
fn synthetic_stream_end_to_end() -> Result<()> {
    let source = RtspSource::new(RtspConfig {
        url: "stub://yard".to_string(),
        target_fps: 10,
        width: 320,
        height: 240,
    })?;
    let bins = vec![
        bin("Bin1", Region::new(0, 0, 160, 240), 0.15, 0.07, 2),
        bin("Bin2", Region::new(160, 120, 160, 120), 0.2, 0.1, 2),
    ];
    let mut monitor_loop = MonitorLoop::new(
        source,
        EdgeDensityAnalyzer::new(),
        ScriptedSink::new(&[]),
        FakeClock::new(),
        bins,
        settings(PolluterCountMode::Sum, 18),
    );
    let stats = monitor_loop.run()?;
    assert_eq!(stats.cycles, 18);
    assert_eq!(stats.deliveries, 18);

    for payload in &monitor_loop.sink().payloads {
        let entries: Vec<&str> = payload.bin_data.split("],[").collect();
        assert_eq!(entries.len(), 2);
        let encoded = entries[0]
            .trim_start_matches('[')
            .splitn(3, '-')
            .nth(2)
            .ok_or_else(|| anyhow!("entry without image"))?;
        let jpeg = STANDARD.decode(encoded)?;
        let decoded = image::load_from_memory(&jpeg)?;
        assert_eq!((decoded.width(), decoded.height()), (160, 240));
    }

    // the litter band grows over the first phases, so the left bin rises
    // before the scene empties again
    let payloads = &monitor_loop.sink().payloads;
    assert!(payloads.iter().any(|p| p.polluters_count > 0));
    let bin1 = monitor_loop.monitor("Bin1").unwrap().state();
    assert_eq!(bin1.polluter_count, 0, "acknowledged counts are reset");
    Ok(())
}
