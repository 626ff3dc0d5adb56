use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use crate::analyze::{EdgeProfile, FillThresholds, Region};
use crate::monitor::BinConfig;
use crate::transport::{PolluterCountMode, ReportPolicy};

const DEFAULT_CYCLE_SECS: u64 = 60 * 60;
const DEFAULT_SOURCE_URL: &str = "stub://bins";
const DEFAULT_SOURCE_FPS: u32 = 10;
const DEFAULT_STUB_WIDTH: u32 = 2560;
const DEFAULT_STUB_HEIGHT: u32 = 1440;
const DEFAULT_RETRY_ATTEMPTS: u32 = 5;
const DEFAULT_RETRY_INTERVAL_SECS: u64 = 2;
const DEFAULT_READ_TIMEOUT_SECS: u64 = 10;
const DEFAULT_SINK_URL: &str = "http://127.0.0.1:8080/api/cin/create/51";
const DEFAULT_SINK_TIMEOUT_SECS: u64 = 30;
const DEFAULT_VEHICLE_ID: &str = "0";
const DEFAULT_JPEG_QUALITY: u8 = 90;
const DEFAULT_LCT_FALLBACK: &str = "0";

#[derive(Debug, Deserialize, Default)]
struct MonitorConfigFile {
    cycle_interval_secs: Option<u64>,
    source: Option<SourceConfigFile>,
    sink: Option<SinkConfigFile>,
    bins: Option<Vec<BinConfigFile>>,
}

#[derive(Debug, Deserialize, Default)]
struct SourceConfigFile {
    url: Option<String>,
    username: Option<String>,
    password: Option<String>,
    target_fps: Option<u32>,
    width: Option<u32>,
    height: Option<u32>,
    retry_attempts: Option<u32>,
    retry_interval_secs: Option<u64>,
    read_timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct SinkConfigFile {
    url: Option<String>,
    token: Option<String>,
    timeout_secs: Option<u64>,
    vehicle_id: Option<String>,
    jpeg_quality: Option<u8>,
    polluter_count: Option<String>,
    primary_bin: Option<String>,
    last_clean_time_fallback: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BinConfigFile {
    id: String,
    region: Region,
    full_threshold: f64,
    half_threshold: f64,
    clean_frame_count: u32,
    edges: Option<EdgeProfile>,
}

impl From<BinConfigFile> for BinConfig {
    fn from(file: BinConfigFile) -> Self {
        BinConfig {
            id: file.id,
            region: file.region,
            thresholds: FillThresholds {
                full: file.full_threshold,
                half: file.half_threshold,
            },
            clean_frame_count: file.clean_frame_count,
            edges: file.edges.unwrap_or_default(),
        }
    }
}

/// Everything the daemon needs, loaded once at startup.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub cycle_interval: Duration,
    pub source: SourceSettings,
    pub sink: SinkSettings,
    pub bins: Vec<BinConfig>,
}

#[derive(Clone)]
pub struct SourceSettings {
    /// Stream URI without credentials.
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub target_fps: u32,
    /// Synthetic frame size for `stub://` sources.
    pub width: u32,
    pub height: u32,
    /// Attempts for the initial stream acquisition.
    pub retry_attempts: u32,
    pub retry_interval: Duration,
    pub read_timeout: Duration,
}

#[derive(Clone)]
pub struct SinkSettings {
    pub url: String,
    pub token: Option<String>,
    pub timeout: Duration,
    pub jpeg_quality: u8,
    pub policy: ReportPolicy,
}

impl std::fmt::Debug for SourceSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceSettings")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("target_fps", &self.target_fps)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("retry_attempts", &self.retry_attempts)
            .field("retry_interval", &self.retry_interval)
            .field("read_timeout", &self.read_timeout)
            .finish()
    }
}

impl std::fmt::Debug for SinkSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SinkSettings")
            .field("url", &self.url)
            .field("token", &self.token.as_ref().map(|_| "***"))
            .field("timeout", &self.timeout)
            .field("jpeg_quality", &self.jpeg_quality)
            .field("policy", &self.policy)
            .finish()
    }
}

/// The two bins of the original deployment camera.
pub fn default_bins() -> Vec<BinConfig> {
    vec![
        BinConfig {
            id: "Bin1".to_string(),
            region: Region::new(1422, 8, 624, 352),
            thresholds: FillThresholds {
                full: 0.15,
                half: 0.07,
            },
            clean_frame_count: 4,
            edges: EdgeProfile::default(),
        },
        BinConfig {
            id: "Bin2".to_string(),
            region: Region::new(2122, 198, 166, 82),
            thresholds: FillThresholds {
                full: 0.2,
                half: 0.1,
            },
            clean_frame_count: 6,
            edges: EdgeProfile::default(),
        },
    ]
}

impl MonitorConfig {
    /// Load from the file named by `BINWATCH_CONFIG` (if set), then apply
    /// environment overrides and validate.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("BINWATCH_CONFIG").ok();
        Self::load_from(config_path.as_deref().map(Path::new))
    }

    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let file_cfg = match path {
            Some(path) => Some(read_config_file(path)?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default())?;
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: MonitorConfigFile) -> Result<Self> {
        let cycle_interval =
            Duration::from_secs(file.cycle_interval_secs.unwrap_or(DEFAULT_CYCLE_SECS));

        let src = file.source.unwrap_or_default();
        let source = SourceSettings {
            url: src.url.unwrap_or_else(|| DEFAULT_SOURCE_URL.to_string()),
            username: src.username,
            password: src.password,
            target_fps: src.target_fps.unwrap_or(DEFAULT_SOURCE_FPS),
            width: src.width.unwrap_or(DEFAULT_STUB_WIDTH),
            height: src.height.unwrap_or(DEFAULT_STUB_HEIGHT),
            retry_attempts: src.retry_attempts.unwrap_or(DEFAULT_RETRY_ATTEMPTS),
            retry_interval: Duration::from_secs(
                src.retry_interval_secs
                    .unwrap_or(DEFAULT_RETRY_INTERVAL_SECS),
            ),
            read_timeout: Duration::from_secs(
                src.read_timeout_secs.unwrap_or(DEFAULT_READ_TIMEOUT_SECS),
            ),
        };

        let bins: Vec<BinConfig> = match file.bins {
            Some(bins) => bins.into_iter().map(BinConfig::from).collect(),
            None => default_bins(),
        };

        let snk = file.sink.unwrap_or_default();
        let polluter_count = match snk.polluter_count.as_deref() {
            Some(mode) => mode.parse()?,
            None => PolluterCountMode::default(),
        };
        let primary_bin = snk
            .primary_bin
            .or_else(|| bins.first().map(|bin| bin.id.clone()))
            .unwrap_or_default();
        let sink = SinkSettings {
            url: snk.url.unwrap_or_else(|| DEFAULT_SINK_URL.to_string()),
            token: snk.token,
            timeout: Duration::from_secs(snk.timeout_secs.unwrap_or(DEFAULT_SINK_TIMEOUT_SECS)),
            jpeg_quality: snk.jpeg_quality.unwrap_or(DEFAULT_JPEG_QUALITY),
            policy: ReportPolicy {
                vehicle_id: snk
                    .vehicle_id
                    .unwrap_or_else(|| DEFAULT_VEHICLE_ID.to_string()),
                polluter_count,
                primary_bin,
                last_clean_time_fallback: snk
                    .last_clean_time_fallback
                    .unwrap_or_else(|| DEFAULT_LCT_FALLBACK.to_string()),
            },
        };

        Ok(Self {
            cycle_interval,
            source,
            sink,
            bins,
        })
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Some(url) = non_empty_env("BINWATCH_SOURCE_URL") {
            self.source.url = url;
        }
        if let Some(username) = non_empty_env("BINWATCH_SOURCE_USERNAME") {
            self.source.username = Some(username);
        }
        if let Some(password) = non_empty_env("BINWATCH_SOURCE_PASSWORD") {
            self.source.password = Some(password);
        }
        if let Some(url) = non_empty_env("BINWATCH_SINK_URL") {
            self.sink.url = url;
        }
        if let Some(token) = non_empty_env("BINWATCH_SINK_TOKEN") {
            self.sink.token = Some(token);
        }
        if let Some(vehicle_id) = non_empty_env("BINWATCH_VEHICLE_ID") {
            self.sink.policy.vehicle_id = vehicle_id;
        }
        if let Some(secs) = non_empty_env("BINWATCH_CYCLE_SECS") {
            let secs: u64 = secs.parse().map_err(|_| {
                anyhow!("BINWATCH_CYCLE_SECS must be an integer number of seconds")
            })?;
            self.cycle_interval = Duration::from_secs(secs);
        }
        if let Some(attempts) = non_empty_env("BINWATCH_RETRY_ATTEMPTS") {
            self.source.retry_attempts = attempts
                .parse()
                .map_err(|_| anyhow!("BINWATCH_RETRY_ATTEMPTS must be an integer"))?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.cycle_interval.is_zero() {
            return Err(anyhow!("cycle interval must be greater than zero"));
        }
        if self.source.retry_attempts == 0 {
            return Err(anyhow!("source retry_attempts must be at least 1"));
        }
        if self.source.target_fps == 0 {
            return Err(anyhow!("source target_fps must be greater than zero"));
        }
        let scheme = url::Url::parse(&self.source.url)
            .map_err(|e| anyhow!("invalid source url: {}", e))?
            .scheme()
            .to_string();
        if !matches!(scheme.as_str(), "stub" | "rtsp" | "rtsps" | "http" | "https") {
            return Err(anyhow!(
                "unsupported source scheme '{}'; expected rtsp(s), http(s) or stub",
                scheme
            ));
        }

        let sink_url =
            url::Url::parse(&self.sink.url).map_err(|e| anyhow!("invalid sink url: {}", e))?;
        if !matches!(sink_url.scheme(), "http" | "https") {
            return Err(anyhow!("sink url must be http(s)"));
        }
        if !(1..=100).contains(&self.sink.jpeg_quality) {
            return Err(anyhow!("sink jpeg_quality must be within 1..=100"));
        }

        if self.bins.is_empty() {
            return Err(anyhow!("at least one bin must be configured"));
        }
        let mut seen = HashSet::new();
        for bin in &self.bins {
            bin.validate()?;
            if !seen.insert(bin.id.as_str()) {
                return Err(anyhow!("duplicate bin id {}", bin.id));
            }
        }
        if !seen.contains(self.sink.policy.primary_bin.as_str()) {
            return Err(anyhow!(
                "primary_bin {:?} is not a configured bin",
                self.sink.policy.primary_bin
            ));
        }
        Ok(())
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn read_config_file(path: &Path) -> Result<MonitorConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    let cfg = if is_toml {
        toml::from_str(&raw).map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}
