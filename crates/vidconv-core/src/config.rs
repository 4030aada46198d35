//! Lifecycle configuration: timings, limits and storage locations.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const ENV_SWEEP_INTERVAL_SECS: &str = "VIDCONV_SWEEP_INTERVAL_SECS";
pub const ENV_RETENTION_SECS: &str = "VIDCONV_RETENTION_SECS";
pub const ENV_REAP_GRACE_SECS: &str = "VIDCONV_REAP_GRACE_SECS";
pub const ENV_CONVERSION_TIMEOUT_SECS: &str = "VIDCONV_CONVERSION_TIMEOUT_SECS";
pub const ENV_MAX_UPLOAD_BYTES: &str = "VIDCONV_MAX_UPLOAD_BYTES";
pub const ENV_UPLOADS_DIR: &str = "VIDCONV_UPLOADS_DIR";
pub const ENV_OUTPUTS_DIR: &str = "VIDCONV_OUTPUTS_DIR";

/// Configuration for the artifact lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleConfig {
    /// Seconds between expiry sweeps.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    /// Age in seconds after which an Active artifact is overdue.
    #[serde(default = "default_retention_secs")]
    pub retention_secs: u64,

    /// Delay between a completed download and removal of the result.
    #[serde(default = "default_reap_grace_secs")]
    pub reap_grace_secs: u64,

    /// Upper bound on a single conversion.
    #[serde(default = "default_conversion_timeout_secs")]
    pub conversion_timeout_secs: u64,

    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: u64,

    #[serde(default = "default_intake_dir")]
    pub intake_dir: PathBuf,

    #[serde(default = "default_results_dir")]
    pub results_dir: PathBuf,
}

fn default_sweep_interval_secs() -> u64 {
    15 * 60
}

fn default_retention_secs() -> u64 {
    30 * 60
}

fn default_reap_grace_secs() -> u64 {
    5
}

fn default_conversion_timeout_secs() -> u64 {
    10 * 60
}

fn default_max_upload_bytes() -> u64 {
    50 * 1024 * 1024
}

fn default_intake_dir() -> PathBuf {
    PathBuf::from("./uploads")
}

fn default_results_dir() -> PathBuf {
    PathBuf::from("./outputs")
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            sweep_interval_secs: default_sweep_interval_secs(),
            retention_secs: default_retention_secs(),
            reap_grace_secs: default_reap_grace_secs(),
            conversion_timeout_secs: default_conversion_timeout_secs(),
            max_upload_bytes: default_max_upload_bytes(),
            intake_dir: default_intake_dir(),
            results_dir: default_results_dir(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} must be a non-negative integer, got {value:?}")]
    InvalidNumber { var: &'static str, value: String },
}

impl LifecycleConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by `VIDCONV_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Like [`from_env`](Self::from_env) with an arbitrary variable source.
    /// Empty values are treated as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |var: &str| lookup(var).filter(|value| !value.trim().is_empty());
        let number = |var: &'static str, fallback: u64| -> Result<u64, ConfigError> {
            match get(var) {
                Some(value) => value
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidNumber { var, value }),
                None => Ok(fallback),
            }
        };

        let defaults = Self::default();
        Ok(Self {
            sweep_interval_secs: number(ENV_SWEEP_INTERVAL_SECS, defaults.sweep_interval_secs)?,
            retention_secs: number(ENV_RETENTION_SECS, defaults.retention_secs)?,
            reap_grace_secs: number(ENV_REAP_GRACE_SECS, defaults.reap_grace_secs)?,
            conversion_timeout_secs: number(
                ENV_CONVERSION_TIMEOUT_SECS,
                defaults.conversion_timeout_secs,
            )?,
            max_upload_bytes: number(ENV_MAX_UPLOAD_BYTES, defaults.max_upload_bytes)?,
            intake_dir: get(ENV_UPLOADS_DIR)
                .map(PathBuf::from)
                .unwrap_or(defaults.intake_dir),
            results_dir: get(ENV_OUTPUTS_DIR)
                .map(PathBuf::from)
                .unwrap_or(defaults.results_dir),
        })
    }

    pub fn with_sweep_interval_secs(mut self, secs: u64) -> Self {
        self.sweep_interval_secs = secs;
        self
    }

    pub fn with_retention_secs(mut self, secs: u64) -> Self {
        self.retention_secs = secs;
        self
    }

    pub fn with_reap_grace_secs(mut self, secs: u64) -> Self {
        self.reap_grace_secs = secs;
        self
    }

    pub fn with_conversion_timeout_secs(mut self, secs: u64) -> Self {
        self.conversion_timeout_secs = secs;
        self
    }

    pub fn with_max_upload_bytes(mut self, bytes: u64) -> Self {
        self.max_upload_bytes = bytes;
        self
    }

    pub fn with_intake_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.intake_dir = dir.into();
        self
    }

    pub fn with_results_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.results_dir = dir.into();
        self
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn retention_window(&self) -> Duration {
        Duration::from_secs(self.retention_secs)
    }

    pub fn reap_grace(&self) -> Duration {
        Duration::from_secs(self.reap_grace_secs)
    }

    pub fn conversion_timeout(&self) -> Duration {
        Duration::from_secs(self.conversion_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn defaults_match_service_policy() {
        let config = LifecycleConfig::default();

        assert_eq!(config.sweep_interval(), Duration::from_secs(900));
        assert_eq!(config.retention_window(), Duration::from_secs(1800));
        assert_eq!(config.reap_grace(), Duration::from_secs(5));
        assert_eq!(config.max_upload_bytes, 52_428_800);
        assert_eq!(config.intake_dir, PathBuf::from("./uploads"));
        assert_eq!(config.results_dir, PathBuf::from("./outputs"));
    }

    #[test]
    fn lookup_overrides_defaults() {
        let config = LifecycleConfig::from_lookup(lookup(&[
            (ENV_RETENTION_SECS, "60"),
            (ENV_REAP_GRACE_SECS, " 10 "),
            (ENV_OUTPUTS_DIR, "/srv/out"),
            (ENV_UPLOADS_DIR, ""),
        ]))
        .unwrap();

        assert_eq!(config.retention_secs, 60);
        assert_eq!(config.reap_grace_secs, 10);
        assert_eq!(config.results_dir, PathBuf::from("/srv/out"));
        assert_eq!(config.intake_dir, PathBuf::from("./uploads"));
        assert_eq!(config.sweep_interval_secs, 900);
    }

    #[test]
    fn invalid_number_is_rejected() {
        let err =
            LifecycleConfig::from_lookup(lookup(&[(ENV_MAX_UPLOAD_BYTES, "50MB")])).unwrap_err();

        assert!(matches!(
            err,
            ConfigError::InvalidNumber { var: ENV_MAX_UPLOAD_BYTES, ref value } if value == "50MB"
        ));
    }

    #[test]
    fn serde_fills_missing_fields() {
        let config: LifecycleConfig =
            serde_json::from_str(r#"{ "retention_secs": 120 }"#).unwrap();

        assert_eq!(config, LifecycleConfig::default().with_retention_secs(120));
    }
}
