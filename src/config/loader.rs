// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::config::consts::{
    DEFAULT_ABANDONED_AFTER_SECS, DEFAULT_FOREGROUND_WEIGHT, DEFAULT_MAX_QUEUED,
    DEFAULT_SWEEP_INTERVAL_SECS, DEFAULT_WORKER_THREADS_FALLBACK,
};
use crate::errors::ConfigError;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure for the execution manager.
///
/// Every section is optional; an empty file yields a manager sized to the
/// machine with reclamation enabled and no local backends.
///
/// # Fields
/// * `executor` - Worker pool size, queue depth and foreground/background fairness
/// * `reclamation` - Sweeping of executions whose outcome is never collected
/// * `resources` - Where per-execution scratch space is created
/// * `local_backends` - In-process backends to register at startup
///
/// # Example
/// ```yaml
/// executor:
///   worker_threads: 4
///   max_queued: 128
///   foreground_weight: 4
/// reclamation:
///   abandoned_after_secs: 600
///   sweep_interval_secs: 30
/// resources:
///   scratch_root: /var/tmp/geoproc
/// local_backends:
///   - name: builtin
///     namespace: geo
///     processes: [echo, sum]
/// ```
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub executor: ExecutorOptions,
    #[serde(default)]
    pub reclamation: ReclamationConfig,
    #[serde(default)]
    pub resources: ResourcesConfig,
    #[serde(default)]
    pub local_backends: Vec<LocalBackendConfig>,
}

/// Worker pool options.
///
/// # Fields
/// * `worker_threads` - Pool threads (defaults to available parallelism, or 4)
/// * `max_queued` - Pending executions across both priority classes before `Overloaded` (defaults to 256)
/// * `foreground_weight` - Foreground dispatches in a row while background work waits (defaults to 4)
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ExecutorOptions {
    pub worker_threads: Option<usize>,
    pub max_queued: Option<usize>,
    pub foreground_weight: Option<u32>,
}

impl ExecutorOptions {
    pub fn get_worker_threads(&self) -> usize {
        self.worker_threads.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(DEFAULT_WORKER_THREADS_FALLBACK)
        })
    }

    pub fn get_max_queued(&self) -> usize {
        self.max_queued.unwrap_or(DEFAULT_MAX_QUEUED)
    }

    pub fn get_foreground_weight(&self) -> u32 {
        self.foreground_weight.unwrap_or(DEFAULT_FOREGROUND_WEIGHT)
    }
}

/// Abandoned-execution reclamation.
///
/// # Example
/// ```yaml
/// reclamation:
///   enabled: true
///   abandoned_after_secs: 3600
///   sweep_interval_secs: 60
/// ```
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ReclamationConfig {
    pub enabled: Option<bool>,
    pub abandoned_after_secs: Option<u64>,
    pub sweep_interval_secs: Option<u64>,
}

impl ReclamationConfig {
    pub fn is_enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }

    pub fn get_abandoned_after(&self) -> Duration {
        Duration::from_secs(
            self.abandoned_after_secs
                .unwrap_or(DEFAULT_ABANDONED_AFTER_SECS),
        )
    }

    pub fn get_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.unwrap_or(DEFAULT_SWEEP_INTERVAL_SECS))
    }
}

/// Temporary resource placement.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ResourcesConfig {
    /// Base directory for per-execution scratch directories. System temp dir when unset.
    pub scratch_root: Option<PathBuf>,
}

/// An in-process backend serving built-in processes under one namespace.
///
/// An empty `processes` list registers every built-in process.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LocalBackendConfig {
    pub name: String,
    pub namespace: String,
    #[serde(default)]
    pub processes: Vec<String>,
}

/// Serialization format of a config file, picked from its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Toml,
}

impl ConfigFormat {
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();

        match extension.as_str() {
            "yaml" | "yml" => Ok(ConfigFormat::Yaml),
            "toml" => Ok(ConfigFormat::Toml),
            _ => Err(ConfigError::UnsupportedFormat { extension }),
        }
    }
}

impl Config {
    pub fn parse(content: &str, format: ConfigFormat) -> Result<Self, ConfigError> {
        let cfg = match format {
            ConfigFormat::Yaml if content.trim().is_empty() => Config::default(),
            ConfigFormat::Yaml => serde_yaml::from_str(content)?,
            ConfigFormat::Toml => toml::from_str(content)?,
        };
        Ok(cfg)
    }
}

/// Load a config from a `.yaml`, `.yml` or `.toml` file.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let format = ConfigFormat::from_path(path)?;
    let content = fs::read_to_string(path)?;
    Config::parse(&content, format)
}

/// Load a config and reject values the executor cannot run with.
pub fn load_and_validate_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let cfg = load_config(path)?;
    crate::config::validate_config(&cfg)?;
    Ok(cfg)
}
