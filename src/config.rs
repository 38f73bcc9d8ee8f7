use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::audio::{CaptureConfig, StreamSpec};
use crate::recording::RecorderConfig;

/// Default location of the optional config file (any format `config` reads)
pub const DEFAULT_CONFIG_PATH: &str = "config/lets-talk";

/// Prefix for environment overrides, e.g. `LETS_TALK_API__BASE_URL`
pub const ENV_PREFIX: &str = "LETS_TALK";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub api: ApiConfig,
    pub recording: RecordingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

/// Remote scenario and evaluation service
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecordingConfig {
    pub max_duration_secs: u64,
    pub sample_rate: u32,
    pub channels: u16,
    pub playback_dir: Option<PathBuf>,
}

impl Config {
    /// Load `path` if it exists, then apply `LETS_TALK_*` overrides
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .set_default("service.http.bind", "127.0.0.1")?
            .set_default("service.http.port", 8788)?
            .set_default("api.base_url", "http://localhost:8787")?
            .set_default("api.timeout_secs", 60)?
            .set_default("recording.max_duration_secs", 40)?
            .set_default("recording.sample_rate", 16000)?
            .set_default("recording.channels", 1)?
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .with_context(|| format!("Failed to load configuration from {}", path))?;

        let cfg: Config = settings
            .try_deserialize()
            .context("Invalid configuration")?;

        if cfg.recording.max_duration_secs == 0 {
            anyhow::bail!("recording.max_duration_secs must be greater than zero");
        }

        Ok(cfg)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.service.http.bind, self.service.http.port)
    }

    pub fn api_timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_secs)
    }

    pub fn recorder_config(&self) -> RecorderConfig {
        RecorderConfig {
            max_duration: Duration::from_secs(self.recording.max_duration_secs),
            fallback_spec: StreamSpec {
                sample_rate: self.recording.sample_rate,
                channels: self.recording.channels,
            },
            playback_dir: self.recording.playback_dir.clone(),
        }
    }

    pub fn capture_config(&self) -> CaptureConfig {
        CaptureConfig {
            sample_rate: self.recording.sample_rate,
            channels: self.recording.channels,
            ..CaptureConfig::default()
        }
    }
}
