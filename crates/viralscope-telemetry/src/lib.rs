//! ViralScope Telemetry
//!
//! Runtime observability for the prediction service.
//!
//! Provides:
//! - Running prediction counters and Prometheus instrumentation
//! - A bounded prediction log with low-confidence and high-latency alerts
//! - Class distribution drift detection
//! - Model health checks against the model store

pub mod drift;
pub mod health;
pub mod metrics;
pub mod monitor;

pub use crate::drift::{DriftOutcome, DriftReport};
pub use crate::health::{check_health, HealthCheck, HealthReport, HealthStatus};
pub use crate::metrics::{describe_metrics, MetricsSnapshot, PredictionMetrics};
pub use crate::monitor::{Alert, AlertKind, MonitorConfig, PredictionMonitor, PredictionStats};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::drift::DriftOutcome;
    pub use crate::health::{check_health, HealthReport, HealthStatus};
    pub use crate::metrics::{MetricsSnapshot, PredictionMetrics};
    pub use crate::monitor::{MonitorConfig, PredictionMonitor};
}
