//! Frame sources.
//!
//! This module provides the camera side of the monitoring loop:
//! - RTSP streams from IP cameras (`rtsp://`, `rtsps://`; feature: rtsp-gstreamer)
//! - HTTP(S) JPEG snapshot endpoints (`http://`, `https://`)
//! - Synthetic stub streams (`stub://`, testing and dry runs)
//!
//! Every source hands out at most one frame at a time and never buffers.
//! Credentials are configured separately from the URI, injected at
//! construction, and never logged: `describe()` returns a redacted URI.

pub mod rtsp;
pub mod snapshot;

pub use rtsp::{RtspConfig, RtspSource};
pub use snapshot::{SnapshotConfig, SnapshotSource};

use anyhow::{anyhow, Context, Result};
use url::Url;

use crate::config::SourceSettings;
use crate::frame::Frame;

/// A camera stream the monitoring loop can pull frames from.
pub trait FrameSource {
    /// Credential-free description for logs.
    fn describe(&self) -> String;

    /// Acquire the stream. An error means the stream is unavailable.
    fn open(&mut self) -> Result<()>;

    /// Block until the next frame. An error means the stream dropped, stalled
    /// or ended; the caller is expected to reconnect.
    fn read(&mut self) -> Result<Frame>;

    /// Release the stream handle. Safe to call when already closed.
    fn close(&mut self);

    fn is_open(&self) -> bool;

    /// Drop the current handle and acquire a fresh one.
    fn reconnect(&mut self) -> Result<()> {
        self.close();
        self.open()
    }
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn describe(&self) -> String {
        (**self).describe()
    }

    fn open(&mut self) -> Result<()> {
        (**self).open()
    }

    fn read(&mut self) -> Result<Frame> {
        (**self).read()
    }

    fn close(&mut self) {
        (**self).close()
    }

    fn is_open(&self) -> bool {
        (**self).is_open()
    }

    fn reconnect(&mut self) -> Result<()> {
        (**self).reconnect()
    }
}

/// Build the source matching the configured URI scheme.
pub fn source_from_settings(settings: &SourceSettings) -> Result<Box<dyn FrameSource>> {
    let url = with_credentials(
        &settings.url,
        settings.username.as_deref(),
        settings.password.as_deref(),
    )?;
    let scheme = Url::parse(&settings.url)
        .with_context(|| format!("parse source url {}", redact_url(&settings.url)))?
        .scheme()
        .to_string();
    match scheme.as_str() {
        "stub" | "rtsp" | "rtsps" => Ok(Box::new(RtspSource::new(RtspConfig {
            url,
            target_fps: settings.target_fps,
            width: settings.width,
            height: settings.height,
        })?)),
        "http" | "https" => Ok(Box::new(SnapshotSource::new(SnapshotConfig {
            url,
            timeout: settings.read_timeout,
        })?)),
        other => Err(anyhow!(
            "unsupported source scheme '{}'; expected rtsp(s), http(s) or stub",
            other
        )),
    }
}

/// Embed credentials in a stream URI. Existing userinfo is replaced only for
/// the parts that are given.
pub fn with_credentials(raw: &str, username: Option<&str>, password: Option<&str>) -> Result<String> {
    if username.is_none() && password.is_none() {
        return Ok(raw.to_string());
    }
    let mut url = Url::parse(raw).with_context(|| format!("parse url {}", redact_url(raw)))?;
    if let Some(user) = username {
        url.set_username(user)
            .map_err(|_| anyhow!("url {} cannot carry credentials", redact_url(raw)))?;
    }
    if let Some(pass) = password {
        url.set_password(Some(pass))
            .map_err(|_| anyhow!("url {} cannot carry credentials", redact_url(raw)))?;
    }
    Ok(url.to_string())
}

/// Replace any password in a URI with `***` for logging.
pub fn redact_url(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(mut url) => {
            if url.password().is_some() {
                let _ = url.set_password(Some("***"));
            }
            url.to_string()
        }
        Err(_) => "<invalid url>".to_string(),
    }
}
