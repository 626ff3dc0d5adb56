//! binwatchd - waste bin fill monitoring daemon
//!
//! This daemon:
//! 1. Loads bin regions, thresholds, source and sink settings
//! 2. Opens the camera stream (retrying up to the configured budget)
//! 3. Every cycle, estimates each bin's fill level and clean/polluter events
//! 4. Posts one status payload per cycle to the collection endpoint
//! 5. Stops cleanly on Ctrl-C, releasing the stream

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use binwatch::{
    config::MonitorConfig,
    ingest::{redact_url, source_from_settings},
    EdgeDensityAnalyzer, HttpSink, HttpSinkConfig, LogSink, LoopSettings, MonitorLoop,
    ReportSink, StopSignal, SystemClock,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Monitor waste bin fill levels from a camera feed")]
struct Args {
    /// Path to a JSON or TOML configuration file.
    #[arg(long, env = "BINWATCH_CONFIG")]
    config: Option<PathBuf>,

    /// Stop after this many cycles (default: run until Ctrl-C).
    #[arg(long)]
    cycles: Option<u64>,

    /// Log payloads instead of posting them to the endpoint.
    #[arg(long, env = "BINWATCH_DRY_RUN")]
    dry_run: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = MonitorConfig::load_from(args.config.as_deref())?;
    log::info!(
        "binwatchd {} starting: source={} sink={} bins={}",
        env!("CARGO_PKG_VERSION"),
        redact_url(&config.source.url),
        if args.dry_run {
            "dry-run".to_string()
        } else {
            redact_url(&config.sink.url)
        },
        config
            .bins
            .iter()
            .map(|bin| format!("{}@{}", bin.id, bin.region))
            .collect::<Vec<_>>()
            .join(",")
    );

    let source = source_from_settings(&config.source)?;
    let sink: Box<dyn ReportSink> = if args.dry_run {
        Box::new(LogSink::new())
    } else {
        Box::new(HttpSink::new(HttpSinkConfig {
            url: config.sink.url.clone(),
            token: config.sink.token.clone(),
            timeout: config.sink.timeout,
        })?)
    };

    let stop = StopSignal::new();
    let handler_stop = stop.clone();
    ctrlc::set_handler(move || {
        log::info!("shutdown signal received, finishing current cycle...");
        handler_stop.trigger();
    })
    .expect("error setting Ctrl-C handler");

    let mut settings = LoopSettings::from_config(&config);
    settings.max_cycles = args.cycles;

    let mut monitor_loop = MonitorLoop::new(
        source,
        EdgeDensityAnalyzer::new(),
        sink,
        SystemClock,
        config.bins.clone(),
        settings,
    )
    .with_stop(stop);

    let stats = monitor_loop.run()?;
    log::info!(
        "binwatchd exiting: {} cycle(s), {} delivered",
        stats.cycles,
        stats.deliveries
    );
    Ok(())
}
