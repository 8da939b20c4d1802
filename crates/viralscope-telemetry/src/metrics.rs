//! Running prediction metrics and Prometheus instrumentation

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::{BTreeMap, VecDeque};

use viralscope_core::ViralClass;

/// Latency samples kept for averages and percentiles
pub const MAX_HISTORY_SIZE: usize = 10000;

/// Prometheus metric names
pub mod names {
    pub const PREDICTIONS_TOTAL: &str = "viralscope_predictions_total";
    pub const PREDICTION_FAILURES_TOTAL: &str = "viralscope_prediction_failures_total";
    pub const PREDICTION_LATENCY_MS: &str = "viralscope_prediction_latency_ms";
    pub const ALERTS_TOTAL: &str = "viralscope_alerts_total";
    pub const MODEL_RELOADS_TOTAL: &str = "viralscope_model_reloads_total";
}

/// Register descriptions for every metric this workspace emits
pub fn describe_metrics() {
    metrics::describe_counter!(
        names::PREDICTIONS_TOTAL,
        "Predictions served, labelled by viral class and scoring mode"
    );
    metrics::describe_counter!(
        names::PREDICTION_FAILURES_TOTAL,
        "Predictions that failed and returned an error"
    );
    metrics::describe_histogram!(
        names::PREDICTION_LATENCY_MS,
        "End-to-end prediction latency in milliseconds"
    );
    metrics::describe_counter!(names::ALERTS_TOTAL, "Monitor alerts raised, by kind");
    metrics::describe_counter!(
        names::MODEL_RELOADS_TOTAL,
        "Model reloads, labelled by outcome"
    );
}

/// In-process prediction counters
pub struct PredictionMetrics {
    inner: RwLock<MetricsInner>,
}

struct MetricsInner {
    total_predictions: u64,
    failed_predictions: u64,
    class_counts: BTreeMap<ViralClass, u64>,
    latencies: VecDeque<f64>,
    last_updated: Option<DateTime<Utc>>,
}

impl PredictionMetrics {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MetricsInner {
                total_predictions: 0,
                failed_predictions: 0,
                class_counts: BTreeMap::new(),
                latencies: VecDeque::with_capacity(MAX_HISTORY_SIZE),
                last_updated: None,
            }),
        }
    }

    /// Record a successful prediction
    pub fn record(&self, class: ViralClass, mode: &'static str, latency_ms: f64) {
        {
            let mut inner = self.inner.write();

            inner.total_predictions += 1;
            *inner.class_counts.entry(class).or_insert(0) += 1;

            inner.latencies.push_back(latency_ms);
            if inner.latencies.len() > MAX_HISTORY_SIZE {
                inner.latencies.pop_front();
            }
            inner.last_updated = Some(Utc::now());
        }

        metrics::counter!(names::PREDICTIONS_TOTAL, "class" => class.as_str(), "mode" => mode)
            .increment(1);
        metrics::histogram!(names::PREDICTION_LATENCY_MS).record(latency_ms);
    }

    /// Record a failed prediction
    pub fn record_failure(&self) {
        self.inner.write().failed_predictions += 1;
        metrics::counter!(names::PREDICTION_FAILURES_TOTAL).increment(1);
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        let inner = self.inner.read();

        let avg_latency_ms = if inner.latencies.is_empty() {
            0.0
        } else {
            inner.latencies.iter().sum::<f64>() / inner.latencies.len() as f64
        };

        MetricsSnapshot {
            total_predictions: inner.total_predictions,
            failed_predictions: inner.failed_predictions,
            avg_latency_ms,
            p95_latency_ms: percentile(inner.latencies.iter().copied(), 95.0),
            class_distribution: inner.class_counts.clone(),
            last_updated: inner.last_updated,
        }
    }

    /// Reset all counters
    pub fn reset(&self) {
        let mut inner = self.inner.write();
        inner.total_predictions = 0;
        inner.failed_predictions = 0;
        inner.class_counts.clear();
        inner.latencies.clear();
        inner.last_updated = None;
    }
}

impl Default for PredictionMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of prediction metrics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub total_predictions: u64,
    pub failed_predictions: u64,
    pub avg_latency_ms: f64,
    pub p95_latency_ms: f64,
    pub class_distribution: BTreeMap<ViralClass, u64>,
    pub last_updated: Option<DateTime<Utc>>,
}

/// Nearest-rank percentile; 0.0 for no samples
pub fn percentile(samples: impl Iterator<Item = f64>, percentile: f64) -> f64 {
    let mut sorted: Vec<f64> = samples.collect();
    if sorted.is_empty() {
        return 0.0;
    }
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let index = (percentile / 100.0 * (sorted.len() - 1) as f64).round() as usize;
    sorted[index.min(sorted.len() - 1)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_collection() {
        let metrics = PredictionMetrics::new();
        assert!(metrics.snapshot().last_updated.is_none());

        metrics.record(ViralClass::High, "fallback", 4.0);
        metrics.record(ViralClass::High, "fallback", 6.0);
        metrics.record(ViralClass::Low, "classifier", 2.0);
        metrics.record_failure();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.total_predictions, 3);
        assert_eq!(snapshot.failed_predictions, 1);
        assert_eq!(snapshot.avg_latency_ms, 4.0);
        assert_eq!(snapshot.class_distribution.get(&ViralClass::High), Some(&2));
        assert_eq!(snapshot.class_distribution.get(&ViralClass::Ultra), None);
        assert!(snapshot.last_updated.is_some());

        metrics.reset();
        assert_eq!(metrics.snapshot().total_predictions, 0);
    }

    #[test]
    fn test_latency_history_is_bounded() {
        let metrics = PredictionMetrics::new();
        for i in 0..(MAX_HISTORY_SIZE + 10) {
            metrics.record(ViralClass::Medium, "fallback", i as f64);
        }

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.total_predictions, (MAX_HISTORY_SIZE + 10) as u64);
        // the ten oldest samples were evicted
        let expected_avg = (10..MAX_HISTORY_SIZE + 10).sum::<usize>() as f64 / MAX_HISTORY_SIZE as f64;
        assert!((snapshot.avg_latency_ms - expected_avg).abs() < 1e-9);
    }

    #[test]
    fn test_percentile() {
        assert_eq!(percentile(std::iter::empty(), 95.0), 0.0);
        let samples = (1..=100).map(|i| i as f64);
        assert_eq!(percentile(samples.clone(), 50.0), 51.0);
        assert_eq!(percentile(samples, 95.0), 95.0);
    }
}
