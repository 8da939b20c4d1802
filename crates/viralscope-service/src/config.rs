//! Service configuration
//!
//! Sources, lowest precedence first: built-in defaults, an optional YAML
//! file, `VIRALSCOPE_*` environment variables (`__` separates nested keys,
//! e.g. `VIRALSCOPE_MONITOR__DRIFT_THRESHOLD`), then CLI overrides.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use viralscope_core::{Error, Result};
use viralscope_telemetry::MonitorConfig;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "VIRALSCOPE";

/// Prediction service configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Model store root
    pub model_dir: PathBuf,

    /// Suggestion rule file; built-in rules when absent
    pub rules_path: Option<PathBuf>,

    /// Maximum requests per batch
    pub max_batch_size: usize,

    /// Promotion gate on `test_accuracy`
    pub min_accuracy: Option<f64>,

    /// Monitor thresholds
    pub monitor: MonitorConfig,

    /// Seconds between `watch` iterations
    pub watch_interval_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("./models"),
            rules_path: None,
            max_batch_size: 100,
            min_accuracy: None,
            monitor: MonitorConfig::default(),
            watch_interval_secs: 300,
        }
    }
}

impl ServiceConfig {
    /// Load from an optional file plus the environment.
    ///
    /// A missing file is not an error; a malformed one is.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            debug!("Reading configuration from {}", path.display());
            builder = builder.add_source(config::File::from(path).required(false));
        }
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: Self = builder
            .build()
            .and_then(|settings| settings.try_deserialize())
            .map_err(|e| Error::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse YAML directly, without environment overrides
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)
            .map_err(|e| Error::config(format!("invalid configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        if self.max_batch_size == 0 {
            return Err(Error::config("max_batch_size must be at least 1"));
        }
        if let Some(min) = self.min_accuracy {
            if !(0.0..=1.0).contains(&min) {
                return Err(Error::config(format!(
                    "min_accuracy {} is outside [0, 1]",
                    min
                )));
            }
        }
        if !(0.0..=1.0).contains(&self.monitor.drift_threshold) {
            return Err(Error::config(format!(
                "monitor.drift_threshold {} is outside [0, 1]",
                self.monitor.drift_threshold
            )));
        }
        if self.monitor.log_capacity == 0 || self.monitor.alert_capacity == 0 {
            return Err(Error::config("monitor capacities must be at least 1"));
        }
        if self.watch_interval_secs == 0 {
            return Err(Error::config("watch_interval_secs must be at least 1"));
        }
        Ok(())
    }

    /// Override the model directory
    pub fn with_model_dir(mut self, model_dir: impl Into<PathBuf>) -> Self {
        self.model_dir = model_dir.into();
        self
    }

    /// Override the suggestion rule file
    pub fn with_rules_path(mut self, rules_path: impl Into<PathBuf>) -> Self {
        self.rules_path = Some(rules_path.into());
        self
    }

    /// Override the promotion accuracy gate
    pub fn with_min_accuracy(mut self, min_accuracy: f64) -> Self {
        self.min_accuracy = Some(min_accuracy);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServiceConfig::default();
        assert_eq!(config.max_batch_size, 100);
        assert_eq!(config.monitor.alert_capacity, 1_000);
        assert_eq!(config.monitor.max_model_age_days, 14);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = r#"
model_dir: /var/lib/viralscope
max_batch_size: 25
monitor:
  drift_threshold: 0.1
"#;
        let config = ServiceConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.model_dir, PathBuf::from("/var/lib/viralscope"));
        assert_eq!(config.max_batch_size, 25);
        assert_eq!(config.monitor.drift_threshold, 0.1);
        assert_eq!(config.monitor.drift_min_samples, 100);
        assert_eq!(config.watch_interval_secs, 300);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(ServiceConfig::from_yaml("max_batch_size: 0").is_err());
        assert!(ServiceConfig::from_yaml("min_accuracy: 1.5").is_err());
        assert!(ServiceConfig::from_yaml("monitor:\n  drift_threshold: -0.1").is_err());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = ServiceConfig::load(Some(Path::new("/nonexistent/viralscope.yaml"))).unwrap();
        assert_eq!(config.max_batch_size, ServiceConfig::default().max_batch_size);
    }
}
