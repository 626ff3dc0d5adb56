//! Reporting sink.
//!
//! Each monitoring cycle produces one `StatusPayload` that is handed to a
//! `ReportSink`. The sink's answer is the only authority for resetting
//! accumulated polluter counts: `Delivery::Acknowledged` resets them, a
//! rejection or a transport error leaves them for the next cycle.

mod http;
mod payload;

pub use http::{HttpSink, HttpSinkConfig};
pub use payload::{
    assemble_payload, format_bin_data, AssembledPayload, BinReport, PolluterCountMode,
    ReportPolicy, StatusPayload,
};

use anyhow::Result;

/// Outcome of a delivery that reached the endpoint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Delivery {
    Acknowledged { status: u16, body: String },
    Rejected { status: u16, body: String },
}

impl Delivery {
    pub fn is_acknowledged(&self) -> bool {
        matches!(self, Delivery::Acknowledged { .. })
    }

    pub fn status(&self) -> u16 {
        match self {
            Delivery::Acknowledged { status, .. } | Delivery::Rejected { status, .. } => *status,
        }
    }
}

/// Destination for per-cycle status payloads.
///
/// `Err` means the payload never reached the endpoint (connect failure,
/// timeout, I/O error). A reachable endpoint answers with a `Delivery`.
pub trait ReportSink {
    fn name(&self) -> &'static str;

    fn submit(&mut self, payload: &StatusPayload) -> Result<Delivery>;
}

impl<K: ReportSink + ?Sized> ReportSink for Box<K> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn submit(&mut self, payload: &StatusPayload) -> Result<Delivery> {
        (**self).submit(payload)
    }
}

/// Dry-run sink: logs a payload summary and acknowledges everything.
#[derive(Debug, Default)]
pub struct LogSink {
    submitted: u64,
}

impl LogSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn submitted(&self) -> u64 {
        self.submitted
    }
}

impl ReportSink for LogSink {
    fn name(&self) -> &'static str {
        "log"
    }

    fn submit(&mut self, payload: &StatusPayload) -> Result<Delivery> {
        self.submitted += 1;
        log::info!(
            "dry-run payload #{}: {} bytes of bin data, LCT={}, vehicle={}, polluters={}",
            self.submitted,
            payload.bin_data.len(),
            payload.last_clean_time,
            payload.vehicle_number,
            payload.polluters_count
        );
        Ok(Delivery::Acknowledged {
            status: 200,
            body: String::new(),
        })
    }
}

/// Shorten a response body for log lines.
pub(crate) fn truncate_for_log(body: &str) -> &str {
    const MAX: usize = 256;
    if body.len() <= MAX {
        return body;
    }
    let mut end = MAX;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}
