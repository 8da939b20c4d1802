//! Class distribution drift detection

use chrono::Duration;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

use crate::monitor::{AlertKind, PredictionMonitor};
use viralscope_core::ViralClass;

/// Result of a drift check
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DriftOutcome {
    /// Too few predictions in the window to judge
    Insufficient { count: usize, required: usize },

    /// Enough data; see the report
    Evaluated(DriftReport),
}

impl DriftOutcome {
    /// Whether drift was detected
    pub fn drifted(&self) -> bool {
        matches!(self, Self::Evaluated(report) if report.drifted)
    }
}

/// Per-class comparison of observed and reference proportions
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DriftReport {
    pub drifted: bool,
    pub max_drift: f64,
    pub threshold: f64,
    pub sample_count: usize,
    pub class_drifts: BTreeMap<ViralClass, f64>,
    pub observed: BTreeMap<ViralClass, f64>,
    pub reference: BTreeMap<ViralClass, f64>,
}

/// Compare observed proportions against the reference classes
pub fn compare_distributions(
    observed_counts: &BTreeMap<ViralClass, usize>,
    reference: &BTreeMap<ViralClass, f64>,
    threshold: f64,
) -> DriftReport {
    let total: usize = observed_counts.values().sum();
    let observed: BTreeMap<ViralClass, f64> = observed_counts
        .iter()
        .map(|(class, count)| (*class, *count as f64 / total.max(1) as f64))
        .collect();

    let class_drifts: BTreeMap<ViralClass, f64> = reference
        .iter()
        .map(|(class, expected)| {
            let actual = observed.get(class).copied().unwrap_or(0.0);
            (*class, (actual - expected).abs())
        })
        .collect();

    let max_drift = class_drifts.values().copied().fold(0.0, f64::max);

    DriftReport {
        drifted: max_drift > threshold,
        max_drift,
        threshold,
        sample_count: total,
        class_drifts,
        observed,
        reference: reference.clone(),
    }
}

impl PredictionMonitor {
    /// Compare the window's predicted classes against a reference
    /// distribution; a detected drift is also recorded as an alert
    pub fn detect_drift(
        &self,
        reference: &BTreeMap<ViralClass, f64>,
        window: Duration,
        threshold: f64,
    ) -> DriftOutcome {
        let stats = self.prediction_stats(window);
        let required = self.config().drift_min_samples;

        if stats.total_predictions < required {
            debug!(
                "Skipping drift check: {} of {} predictions",
                stats.total_predictions, required
            );
            return DriftOutcome::Insufficient {
                count: stats.total_predictions,
                required,
            };
        }

        let report = compare_distributions(&stats.class_distribution, reference, threshold);
        if report.drifted {
            self.add_alert(
                AlertKind::DistributionDrift,
                format!(
                    "Distribution drift detected: max drift {:.2}%",
                    report.max_drift * 100.0
                ),
            );
        }
        DriftOutcome::Evaluated(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::MonitorConfig;

    fn reference() -> BTreeMap<ViralClass, f64> {
        [
            (ViralClass::Low, 0.4),
            (ViralClass::Medium, 0.3),
            (ViralClass::High, 0.2),
            (ViralClass::Ultra, 0.1),
        ]
        .into_iter()
        .collect()
    }

    fn log_many(monitor: &PredictionMonitor, class: ViralClass, n: usize) {
        for i in 0..n {
            monitor.log_prediction(&format!("{}-{}", class, i), class, 0.9, 5.0);
        }
    }

    #[test]
    fn test_insufficient_data_regardless_of_skew() {
        let monitor = PredictionMonitor::default();
        log_many(&monitor, ViralClass::Ultra, 99);

        let outcome = monitor.detect_drift(&reference(), Duration::hours(24), 0.2);
        assert_eq!(
            outcome,
            DriftOutcome::Insufficient {
                count: 99,
                required: 100
            }
        );
        assert!(!outcome.drifted());
        assert!(monitor.alerts(10).is_empty());
    }

    #[test]
    fn test_skewed_distribution_drifts() {
        let monitor = PredictionMonitor::default();
        log_many(&monitor, ViralClass::Ultra, 100);

        let outcome = monitor.detect_drift(&reference(), Duration::hours(24), 0.2);
        let DriftOutcome::Evaluated(report) = outcome else {
            panic!("expected an evaluated drift report");
        };
        assert!(report.drifted);
        assert!((report.max_drift - 0.9).abs() < 1e-12);
        assert_eq!(report.sample_count, 100);

        let alerts = monitor.alerts(10);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].kind, AlertKind::DistributionDrift);
    }

    #[test]
    fn test_matching_distribution_does_not_drift() {
        let monitor = PredictionMonitor::new(MonitorConfig {
            drift_min_samples: 10,
            ..MonitorConfig::default()
        });
        log_many(&monitor, ViralClass::Low, 4);
        log_many(&monitor, ViralClass::Medium, 3);
        log_many(&monitor, ViralClass::High, 2);
        log_many(&monitor, ViralClass::Ultra, 1);

        let outcome = monitor.detect_drift(&reference(), Duration::hours(1), 0.2);
        assert!(!outcome.drifted());
        assert!(monitor.alerts(10).is_empty());
    }

    #[test]
    fn test_only_reference_classes_compared() {
        let mut counts = BTreeMap::new();
        counts.insert(ViralClass::Low, 5);
        counts.insert(ViralClass::Ultra, 5);
        let mut reference = BTreeMap::new();
        reference.insert(ViralClass::Low, 0.5);

        let report = compare_distributions(&counts, &reference, 0.2);
        assert_eq!(report.class_drifts.len(), 1);
        assert_eq!(report.max_drift, 0.0);
        assert!(!report.drifted);
    }
}
