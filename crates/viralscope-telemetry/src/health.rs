//! Model health checks over the model store

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use tracing::{info, warn};

use viralscope_classifiers::ModelStore;
use viralscope_core::features::parse_timestamp;

/// Metadata fields every current artifact must carry
pub const REQUIRED_METADATA_FIELDS: [&str; 4] =
    ["version", "trained_at", "feature_names", "class_names"];

/// Health status; later variants dominate earlier ones
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Warning,
    Unhealthy,
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Healthy => "healthy",
            Self::Warning => "warning",
            Self::Unhealthy => "unhealthy",
        })
    }
}

/// A single named check
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthCheck {
    pub name: &'static str,
    pub status: HealthStatus,
    pub message: String,
}

impl HealthCheck {
    fn new(name: &'static str, status: HealthStatus, message: impl Into<String>) -> Self {
        Self {
            name,
            status,
            message: message.into(),
        }
    }
}

/// Aggregated health of the serving model
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub checks: Vec<HealthCheck>,
    pub checked_at: DateTime<Utc>,
}

impl HealthReport {
    /// Look up a check by name
    pub fn check(&self, name: &str) -> Option<&HealthCheck> {
        self.checks.iter().find(|c| c.name == name)
    }

    /// Messages of every check that is not healthy
    pub fn issues(&self) -> Vec<&str> {
        self.checks
            .iter()
            .filter(|c| c.status != HealthStatus::Healthy)
            .map(|c| c.message.as_str())
            .collect()
    }
}

/// Run every check against the store
pub fn check_health(store: &ModelStore, max_age_days: u32) -> HealthReport {
    let now = Utc::now();
    let metadata = store.current_metadata_raw();

    let checks = vec![
        check_model_exists(store),
        check_model_age(&metadata, max_age_days, now),
        check_metadata(&metadata),
        check_archive(store),
    ];
    let status = checks
        .iter()
        .map(|c| c.status)
        .max()
        .unwrap_or(HealthStatus::Healthy);

    if status == HealthStatus::Healthy {
        info!("Model health: {}", status);
    } else {
        let failing: Vec<_> = checks
            .iter()
            .filter(|c| c.status != HealthStatus::Healthy)
            .map(|c| c.name)
            .collect();
        warn!("Model health: {} (failing: {})", status, failing.join(", "));
    }

    HealthReport {
        status,
        checks,
        checked_at: now,
    }
}

type RawMetadata = viralscope_core::Result<Option<serde_json::Value>>;

fn check_model_exists(store: &ModelStore) -> HealthCheck {
    if store.has_current() {
        HealthCheck::new("model_exists", HealthStatus::Healthy, "Model file exists")
    } else {
        HealthCheck::new("model_exists", HealthStatus::Unhealthy, "Model file not found")
    }
}

fn check_model_age(metadata: &RawMetadata, max_age_days: u32, now: DateTime<Utc>) -> HealthCheck {
    let warning = |message: String| HealthCheck::new("model_age", HealthStatus::Warning, message);

    let metadata = match metadata {
        Ok(Some(metadata)) => metadata,
        Ok(None) => return warning("Cannot determine model age - metadata missing".to_string()),
        Err(e) => return warning(format!("Error checking model age: {}", e)),
    };
    let Some(raw) = metadata.get("trained_at").and_then(|v| v.as_str()) else {
        return warning("Error checking model age: trained_at missing".to_string());
    };
    let Some(trained_at) = parse_timestamp(raw) else {
        return warning(format!("Error checking model age: unparsable trained_at '{}'", raw));
    };

    let age_days = (now - trained_at.with_timezone(&Utc)).num_days();
    if age_days <= i64::from(max_age_days) {
        HealthCheck::new(
            "model_age",
            HealthStatus::Healthy,
            format!("Model age: {} days", age_days),
        )
    } else {
        warning(format!(
            "Model age: {} days (exceeds {} days)",
            age_days, max_age_days
        ))
    }
}

fn check_metadata(metadata: &RawMetadata) -> HealthCheck {
    let warning = |message: String| HealthCheck::new("metadata", HealthStatus::Warning, message);

    let metadata = match metadata {
        Ok(Some(metadata)) => metadata,
        Ok(None) => return warning("Metadata file not found".to_string()),
        Err(e) => return warning(format!("Error reading metadata: {}", e)),
    };

    let missing: Vec<&str> = REQUIRED_METADATA_FIELDS
        .iter()
        .copied()
        .filter(|field| metadata.get(*field).is_none())
        .collect();
    if !missing.is_empty() {
        return warning(format!("Metadata missing fields: {}", missing.join(", ")));
    }

    let version = metadata
        .get("version")
        .and_then(|v| v.as_str())
        .unwrap_or("unknown");
    HealthCheck::new(
        "metadata",
        HealthStatus::Healthy,
        format!("Metadata valid (version {})", version),
    )
}

fn check_archive(store: &ModelStore) -> HealthCheck {
    let message = match store.list_archive() {
        Ok(archived) => format!("{} archived versions available", archived.len()),
        Err(e) => format!("Archive unreadable: {}", e),
    };
    HealthCheck::new("archive", HealthStatus::Healthy, message)
}
