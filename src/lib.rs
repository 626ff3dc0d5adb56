//! binwatch: camera-based waste bin monitoring.
//!
//! A fixed camera watches one or more bins. Every cycle the daemon grabs a
//! frame, measures how cluttered each bin's region looks, infers fill level,
//! clean events and "polluters" (items added), and posts one status payload
//! to a collection endpoint.
//!
//! # Module Structure
//!
//! - `ingest`: frame sources (RTSP, HTTP snapshots, synthetic stubs)
//! - `frame`: decoded frames handed from sources to analysis
//! - `analyze`: region crop, edge-density fill ratio, fill classification
//! - `monitor`: per-bin state machine (clean events, polluter counts)
//! - `transport`: status payload and reporting sinks
//! - `runner`: the monitoring loop tying it together
//! - `config`: startup configuration (file + environment)

pub mod analyze;
pub mod config;
pub mod frame;
pub mod ingest;
pub mod monitor;
pub mod runner;
pub mod transport;

pub use analyze::{
    Analysis, EdgeDensityAnalyzer, EdgeProfile, FillLevel, FillThresholds, Region,
    RegionAnalyzer,
};
pub use config::MonitorConfig;
pub use frame::Frame;
pub use ingest::{FrameSource, RtspConfig, RtspSource, SnapshotConfig, SnapshotSource};
pub use monitor::{BinConfig, BinMonitor, BinState, Observation, Trend};
pub use runner::{
    Clock, CycleOutcome, FailureKind, LoopSettings, MonitorLoop, RunStats, StopSignal,
    SystemClock,
};
pub use transport::{
    BinReport, Delivery, HttpSink, HttpSinkConfig, LogSink, PolluterCountMode, ReportPolicy,
    ReportSink, StatusPayload,
};
