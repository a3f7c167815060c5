use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::sampler::Schedule;
use crate::system::cpu::FirstCoreSample;

const MIN_INTERVAL_MS: u64 = 100;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub sampling: SamplingConfig,
    pub cpu: CpuConfig,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    pub interval_ms: u64,
    pub tolerance_ms: u64,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        SamplingConfig {
            interval_ms: 5000,
            tolerance_ms: 100,
        }
    }
}

impl SamplingConfig {
    pub fn schedule(&self) -> Schedule {
        Schedule::new(
            Duration::from_millis(self.interval_ms.max(MIN_INTERVAL_MS)),
            Duration::from_millis(self.tolerance_ms),
        )
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CpuConfig {
    pub first_core_sample: String,
}

impl Default for CpuConfig {
    fn default() -> Self {
        CpuConfig {
            first_core_sample: "since-boot".to_string(),
        }
    }
}

impl CpuConfig {
    pub fn first_core_sample(&self) -> FirstCoreSample {
        FirstCoreSample::from_str_config(&self.first_core_sample)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    #[default]
    Status,
    Json,
}

impl OutputMode {
    pub fn from_str_config(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => OutputMode::Json,
            _ => OutputMode::Status,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub mode: String,
    pub notifier: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            mode: "status".to_string(),
            notifier: "stdout".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: "warn".to_string(),
        }
    }
}

pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("pulsebar").join("config.toml"))
}

pub fn load_config() -> Config {
    match config_path() {
        Some(path) if path.exists() => load_config_from_path(&path),
        _ => Config::default(),
    }
}

pub fn load_config_from_path(path: &Path) -> Config {
    match std::fs::read_to_string(path) {
        Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
            tracing::warn!(path = %path.display(), error = %e, "invalid config, using defaults");
            Config::default()
        }),
        Err(_) => Config::default(),
    }
}
