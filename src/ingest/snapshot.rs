//! HTTP snapshot frame source.
//!
//! Many IP cameras expose a still-image endpoint next to their RTSP stream.
//! `SnapshotSource` fetches one JPEG per read and decodes it in memory; there
//! is no persistent connection, so "open" is a probe fetch that proves the
//! endpoint answers with a decodable image.

use anyhow::{anyhow, Context, Result};
use std::io::Read;
use std::time::Duration;

use super::{redact_url, FrameSource};
use crate::frame::Frame;

const MAX_JPEG_BYTES: u64 = 16 * 1024 * 1024;

#[derive(Clone, Debug)]
pub struct SnapshotConfig {
    /// Snapshot URL, credentials included.
    pub url: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1/snapshot.jpg".to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

pub struct SnapshotSource {
    config: SnapshotConfig,
    agent: Option<ureq::Agent>,
    frame_count: u64,
}

impl SnapshotSource {
    pub fn new(config: SnapshotConfig) -> Result<Self> {
        let url = url::Url::parse(&config.url)
            .with_context(|| format!("parse snapshot url {}", redact_url(&config.url)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(anyhow!(
                "unsupported snapshot scheme '{}'; expected http(s)",
                url.scheme()
            ));
        }
        Ok(Self {
            config,
            agent: None,
            frame_count: 0,
        })
    }

    fn fetch(&self, agent: &ureq::Agent) -> Result<Frame> {
        let response = agent
            .get(&self.config.url)
            .call()
            .with_context(|| format!("fetch snapshot from {}", redact_url(&self.config.url)))?;
        let mut bytes = Vec::new();
        response
            .into_reader()
            .take(MAX_JPEG_BYTES)
            .read_to_end(&mut bytes)
            .context("read snapshot body")?;
        if bytes.is_empty() {
            return Err(anyhow!("empty snapshot body"));
        }
        let image = image::load_from_memory(&bytes).context("decode snapshot")?;
        Ok(Frame::new(image.into_rgb8(), self.frame_count + 1))
    }
}

impl FrameSource for SnapshotSource {
    fn describe(&self) -> String {
        redact_url(&self.config.url)
    }

    fn open(&mut self) -> Result<()> {
        let agent = ureq::AgentBuilder::new()
            .timeout(self.config.timeout)
            .build();
        self.fetch(&agent)?;
        self.agent = Some(agent);
        log::info!("SnapshotSource: connected to {}", self.describe());
        Ok(())
    }

    fn read(&mut self) -> Result<Frame> {
        let agent = self
            .agent
            .as_ref()
            .ok_or_else(|| anyhow!("snapshot source not open; call open() first"))?;
        let frame = self.fetch(agent)?;
        self.frame_count += 1;
        Ok(frame)
    }

    fn close(&mut self) {
        self.agent = None;
    }

    fn is_open(&self) -> bool {
        self.agent.is_some()
    }
}
