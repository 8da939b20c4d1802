//! Rolling prediction log and alert buffer

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use tracing::warn;

use crate::metrics::{names, percentile};
use viralscope_core::ViralClass;

/// Monitor thresholds and buffer sizes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Prediction log capacity
    pub log_capacity: usize,

    /// Alert buffer capacity
    pub alert_capacity: usize,

    /// Confidence below this raises an alert
    pub low_confidence_threshold: f64,

    /// Latency above this raises an alert
    pub high_latency_ms: f64,

    /// Default max per-class drift
    pub drift_threshold: f64,

    /// Predictions required before drift is evaluated
    pub drift_min_samples: usize,

    /// Age after which the current model is reported stale
    pub max_model_age_days: u32,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            log_capacity: 10_000,
            alert_capacity: 1_000,
            low_confidence_threshold: 0.3,
            high_latency_ms: 500.0,
            drift_threshold: 0.2,
            drift_min_samples: 100,
            max_model_age_days: 14,
        }
    }
}

/// One logged prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionLogEntry {
    pub timestamp: DateTime<Utc>,
    pub video_id: String,
    pub viral_class: ViralClass,
    pub confidence: f64,
    pub latency_ms: f64,
}

impl PredictionLogEntry {
    /// Entry stamped with the current time
    pub fn new(
        video_id: impl Into<String>,
        viral_class: ViralClass,
        confidence: f64,
        latency_ms: f64,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            video_id: video_id.into(),
            viral_class,
            confidence,
            latency_ms,
        }
    }

    /// Override the timestamp
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// What an alert is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    LowConfidence,
    HighLatency,
    DistributionDrift,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LowConfidence => "low_confidence",
            Self::HighLatency => "high_latency",
            Self::DistributionDrift => "distribution_drift",
        }
    }

    fn severity(&self) -> AlertSeverity {
        match self {
            Self::LowConfidence | Self::HighLatency => AlertSeverity::Warning,
            Self::DistributionDrift => AlertSeverity::Critical,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Warning,
    Critical,
}

/// A monitoring alert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub timestamp: DateTime<Utc>,
    pub kind: AlertKind,
    pub severity: AlertSeverity,
    pub message: String,
}

/// Aggregates over the prediction log for a time window
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionStats {
    pub total_predictions: usize,
    pub window_hours: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_confidence: Option<f64>,
    pub avg_latency_ms: f64,
    pub p95_latency_ms: f64,
    pub class_distribution: BTreeMap<ViralClass, usize>,
}

/// Prediction log, alert buffer, and the statistics derived from them
pub struct PredictionMonitor {
    config: MonitorConfig,
    inner: RwLock<MonitorInner>,
}

struct MonitorInner {
    log: VecDeque<PredictionLogEntry>,
    alerts: VecDeque<Alert>,
}

impl PredictionMonitor {
    pub fn new(config: MonitorConfig) -> Self {
        Self {
            inner: RwLock::new(MonitorInner {
                log: VecDeque::with_capacity(config.log_capacity.min(1024)),
                alerts: VecDeque::new(),
            }),
            config,
        }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Log a prediction made now
    pub fn log_prediction(
        &self,
        video_id: &str,
        viral_class: ViralClass,
        confidence: f64,
        latency_ms: f64,
    ) {
        self.record(PredictionLogEntry::new(
            video_id,
            viral_class,
            confidence,
            latency_ms,
        ));
    }

    /// Append an entry and raise any alerts it warrants
    pub fn record(&self, entry: PredictionLogEntry) {
        let confidence = entry.confidence;
        let latency_ms = entry.latency_ms;

        {
            let mut inner = self.inner.write();
            inner.log.push_back(entry);
            while inner.log.len() > self.config.log_capacity {
                inner.log.pop_front();
            }
        }

        if confidence < self.config.low_confidence_threshold {
            self.add_alert(
                AlertKind::LowConfidence,
                format!("Very low confidence prediction: {:.2}", confidence),
            );
        }
        if latency_ms > self.config.high_latency_ms {
            self.add_alert(
                AlertKind::HighLatency,
                format!("High prediction latency: {:.0}ms", latency_ms),
            );
        }
    }

    pub(crate) fn add_alert(&self, kind: AlertKind, message: String) {
        warn!(kind = kind.as_str(), "{}", message);
        metrics::counter!(names::ALERTS_TOTAL, "kind" => kind.as_str()).increment(1);

        let mut inner = self.inner.write();
        inner.alerts.push_back(Alert {
            timestamp: Utc::now(),
            kind,
            severity: kind.severity(),
            message,
        });
        while inner.alerts.len() > self.config.alert_capacity {
            inner.alerts.pop_front();
        }
    }

    /// Number of logged predictions
    pub fn log_len(&self) -> usize {
        self.inner.read().log.len()
    }

    /// Entries newer than `now - window`
    pub(crate) fn recent(&self, window: Duration) -> Vec<PredictionLogEntry> {
        let cutoff = Utc::now() - window;
        self.inner
            .read()
            .log
            .iter()
            .filter(|entry| entry.timestamp > cutoff)
            .cloned()
            .collect()
    }

    /// Statistics over the predictions in the window
    pub fn prediction_stats(&self, window: Duration) -> PredictionStats {
        let recent = self.recent(window);
        let window_hours = window.num_seconds() as f64 / 3600.0;

        let mut class_distribution = BTreeMap::new();
        for entry in &recent {
            *class_distribution.entry(entry.viral_class).or_insert(0) += 1;
        }

        if recent.is_empty() {
            return PredictionStats {
                total_predictions: 0,
                window_hours,
                avg_confidence: None,
                min_confidence: None,
                max_confidence: None,
                avg_latency_ms: 0.0,
                p95_latency_ms: 0.0,
                class_distribution,
            };
        }

        let count = recent.len() as f64;
        let confidences = recent.iter().map(|e| e.confidence);
        PredictionStats {
            total_predictions: recent.len(),
            window_hours,
            avg_confidence: Some(confidences.clone().sum::<f64>() / count),
            min_confidence: confidences.clone().reduce(f64::min),
            max_confidence: confidences.reduce(f64::max),
            avg_latency_ms: recent.iter().map(|e| e.latency_ms).sum::<f64>() / count,
            p95_latency_ms: percentile(recent.iter().map(|e| e.latency_ms), 95.0),
            class_distribution,
        }
    }

    /// The most recent `limit` alerts, oldest first
    pub fn alerts(&self, limit: usize) -> Vec<Alert> {
        let inner = self.inner.read();
        let skip = inner.alerts.len().saturating_sub(limit);
        inner.alerts.iter().skip(skip).cloned().collect()
    }

    /// Alerts raised within the window, oldest first
    pub fn alerts_since(&self, window: Duration) -> Vec<Alert> {
        let cutoff = Utc::now() - window;
        self.inner
            .read()
            .alerts
            .iter()
            .filter(|alert| alert.timestamp > cutoff)
            .cloned()
            .collect()
    }
}

impl Default for PredictionMonitor {
    fn default() -> Self {
        Self::new(MonitorConfig::default())
    }
}
