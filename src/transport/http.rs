use anyhow::{anyhow, Context, Result};
use std::time::Duration;

use super::{truncate_for_log, Delivery, ReportSink, StatusPayload};
use crate::ingest::redact_url;

#[derive(Clone, Debug)]
pub struct HttpSinkConfig {
    pub url: String,
    /// Bearer token sent in the `Authorization` header.
    pub token: Option<String>,
    pub timeout: Duration,
}

/// Posts each payload as JSON to the collection endpoint.
///
/// Any 2xx answer acknowledges the payload; other statuses are rejections.
pub struct HttpSink {
    config: HttpSinkConfig,
    agent: ureq::Agent,
}

impl HttpSink {
    pub fn new(config: HttpSinkConfig) -> Result<Self> {
        let url = url::Url::parse(&config.url)
            .with_context(|| format!("parse sink url {}", redact_url(&config.url)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(anyhow!(
                "unsupported sink scheme '{}'; expected http(s)",
                url.scheme()
            ));
        }
        let agent = ureq::AgentBuilder::new().timeout(config.timeout).build();
        Ok(Self { config, agent })
    }
}

impl ReportSink for HttpSink {
    fn name(&self) -> &'static str {
        "http"
    }

    fn submit(&mut self, payload: &StatusPayload) -> Result<Delivery> {
        let mut request = self
            .agent
            .post(&self.config.url)
            .set("Content-Type", "application/json");
        if let Some(token) = self.config.token.as_deref() {
            request = request.set("Authorization", &format!("Bearer {}", token));
        }

        match request.send_json(payload) {
            Ok(response) => {
                let status = response.status();
                let body = response.into_string().unwrap_or_default();
                if (200..300).contains(&status) {
                    log::debug!("sink accepted payload: {} {}", status, truncate_for_log(&body));
                    Ok(Delivery::Acknowledged { status, body })
                } else {
                    Ok(Delivery::Rejected { status, body })
                }
            }
            Err(ureq::Error::Status(status, response)) => {
                let body = response.into_string().unwrap_or_default();
                Ok(Delivery::Rejected { status, body })
            }
            Err(ureq::Error::Transport(transport)) => Err(anyhow!(
                "post to {} failed: {}",
                redact_url(&self.config.url),
                transport
            )),
        }
    }
}
