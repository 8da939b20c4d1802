//! End-to-end tests for the prediction facade over a real model store

use chrono::Duration;
use std::collections::BTreeMap;
use std::sync::Arc;
use tempfile::TempDir;
use viralscope_classifiers::{
    ArtifactMetadata, ClassProbabilities, Classifier, ModelArtifact, ScoringMode, SoftmaxModel,
};
use viralscope_core::features::FEATURE_COUNT;
use viralscope_core::{EngagementData, Error, PredictionRequest, Result, VideoMetadata, ViralClass};
use viralscope_service::{PredictionService, Predictor, ServiceConfig};
use viralscope_telemetry::{AlertKind, DriftOutcome, MonitorConfig};

fn softmax_artifact(version: &str, bias: [f64; 4]) -> ModelArtifact {
    let model = SoftmaxModel {
        classes: ViralClass::ALL.to_vec(),
        weights: vec![vec![0.0; FEATURE_COUNT]; 4],
        bias: bias.to_vec(),
    };
    ModelArtifact::new(
        ArtifactMetadata::new(version).with_metric("test_accuracy", 0.62),
        model.to_bytes().unwrap(),
    )
}

fn scenario(video_id: &str) -> PredictionRequest {
    PredictionRequest::new(
        video_id,
        VideoMetadata::new("Check out this amazing video! #fyp #viral")
            .with_hashtags(["fyp", "viral", "trending"])
            .with_duration(15.5)
            .with_engagement(EngagementData::new(100_000, 10_000, 500, 200)),
    )
}

fn started(dir: &TempDir) -> Arc<Predictor> {
    PredictionService::new()
        .start(ServiceConfig::default().with_model_dir(dir.path()))
        .unwrap()
}

/// Always fails, as a broken model would
struct FailingClassifier;

impl Classifier for FailingClassifier {
    fn classify(&self, _features: &[f64]) -> Result<ClassProbabilities> {
        Err(Error::classifier("model exploded"))
    }

    fn name(&self) -> &str {
        "failing"
    }
}

#[test]
fn test_fallback_scenario() {
    let dir = TempDir::new().unwrap();
    let predictor = started(&dir);

    let response = predictor.predict(&scenario("vid-1")).unwrap();
    assert_eq!(response.scoring_mode, ScoringMode::Fallback);
    assert_eq!(response.overall_score, 77);
    assert_eq!(response.viral_class, ViralClass::High);
    assert_eq!(response.confidence, 0.5);
    assert!(response.suggestions.len() <= 5);
    assert!(response
        .suggestions
        .windows(2)
        .all(|pair| pair[0].priority <= pair[1].priority));
}

#[test]
fn test_classifier_mode_after_promotion() {
    let dir = TempDir::new().unwrap();
    let predictor = started(&dir);
    assert_eq!(predictor.mode(), ScoringMode::Fallback);

    predictor
        .store()
        .promote(&softmax_artifact("v1", [0.0, 1.0, 0.0, 0.0]))
        .unwrap();
    assert!(predictor.reload());
    assert_eq!(predictor.model_version().as_deref(), Some("v1"));

    let response = predictor.predict(&scenario("vid-1")).unwrap();
    let (low, high) = ViralClass::Medium.score_range();
    assert_eq!(response.scoring_mode, ScoringMode::Classifier);
    assert_eq!(response.viral_class, ViralClass::Medium);
    assert!((low..=high).contains(&response.overall_score));
    assert_eq!(response.confidence, 0.475);
    assert_eq!(response.model_version.as_deref(), Some("v1"));

    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["modelVersion"], "v1");
    assert_eq!(json["scoringMode"], "classifier");
}

#[test]
fn test_rollback_then_reload_serves_archived_version() {
    let dir = TempDir::new().unwrap();
    let predictor = started(&dir);
    let store = predictor.store();

    store.promote(&softmax_artifact("v1", [0.0, 1.0, 0.0, 0.0])).unwrap();
    store.promote(&softmax_artifact("v2", [0.0, 0.0, 0.0, 1.0])).unwrap();
    assert!(predictor.reload());
    assert_eq!(
        predictor.predict(&scenario("a")).unwrap().viral_class,
        ViralClass::Ultra
    );

    store.rollback("v1").unwrap();
    assert!(predictor.reload());
    assert_eq!(predictor.model_version().as_deref(), Some("v1"));
    assert_eq!(
        predictor.predict(&scenario("b")).unwrap().viral_class,
        ViralClass::Medium
    );
}

#[test]
fn test_overlapping_reloads_publish_latest_store_state() {
    let dir = TempDir::new().unwrap();
    let predictor = started(&dir);

    std::thread::scope(|scope| {
        for worker in 0..8 {
            let predictor = &predictor;
            scope.spawn(move || {
                let version = format!("v{:02}", worker);
                predictor
                    .store()
                    .promote(&softmax_artifact(&version, [0.0, 1.0, 0.0, 0.0]))
                    .unwrap();
                for _ in 0..5 {
                    assert!(predictor.reload());
                }
            });
        }
    });

    let current = predictor.store().current_version();
    assert!(current.is_some());
    assert_eq!(predictor.model_version(), current);
}

#[test]
fn test_unloadable_artifact_falls_back() {
    let dir = TempDir::new().unwrap();
    let predictor = started(&dir);

    let broken = ModelArtifact::new(
        ArtifactMetadata::new("v1").with_format("onnx"),
        b"not a model".to_vec(),
    );
    predictor.store().promote(&broken).unwrap();

    assert!(!predictor.reload());
    assert_eq!(predictor.mode(), ScoringMode::Fallback);
    assert!(predictor.fallback_reason().unwrap().contains("v1"));
    assert_eq!(
        predictor.predict(&scenario("vid-1")).unwrap().overall_score,
        77
    );
}

#[test]
fn test_classifier_failure_is_isolated_per_item() {
    let dir = TempDir::new().unwrap();
    let predictor = started(&dir);
    predictor.install(Arc::new(FailingClassifier), &ArtifactMetadata::new("v1"));

    let outcome = predictor
        .predict_batch(&[scenario("a"), scenario("b")])
        .unwrap();
    assert_eq!(outcome.processed_count, 0);
    assert_eq!(outcome.failed_count, 2);
    assert!(outcome.failures[0].message.contains("model exploded"));
    assert_eq!(predictor.metrics().failed_predictions, 2);
    assert_eq!(predictor.metrics().total_predictions, 0);
}

#[test]
fn test_batch_keeps_input_order() {
    let dir = TempDir::new().unwrap();
    let predictor = started(&dir);

    let requests: Vec<_> = (0..10).map(|i| scenario(&format!("vid-{}", i))).collect();
    let outcome = predictor.predict_batch(&requests).unwrap().ensure_complete().unwrap();

    let ids: Vec<_> = outcome.results.iter().map(|r| r.video_id.as_str()).collect();
    let expected: Vec<_> = (0..10).map(|i| format!("vid-{}", i)).collect();
    assert_eq!(ids, expected);
    assert_eq!(predictor.metrics().total_predictions, 10);
}

#[test]
fn test_empty_batch() {
    let dir = TempDir::new().unwrap();
    let predictor = started(&dir);

    let outcome = predictor.predict_batch(&[]).unwrap();
    assert_eq!(outcome.processed_count, 0);
    assert!(outcome.ensure_complete().is_ok());
}

#[test]
fn test_drift_against_training_distribution() {
    let dir = TempDir::new().unwrap();
    let config = ServiceConfig {
        monitor: MonitorConfig {
            drift_min_samples: 20,
            ..MonitorConfig::default()
        },
        ..ServiceConfig::default().with_model_dir(dir.path())
    };
    let predictor = PredictionService::new().start(config).unwrap();

    let reference: BTreeMap<_, _> = [
        (ViralClass::Low, 0.4),
        (ViralClass::Medium, 0.3),
        (ViralClass::High, 0.2),
        (ViralClass::Ultra, 0.1),
    ]
    .into_iter()
    .collect();
    predictor.install(
        Arc::new(viralscope_classifiers::SoftmaxClassifier::new(
            "all-medium",
            SoftmaxModel {
                classes: ViralClass::ALL.to_vec(),
                weights: vec![vec![0.0; FEATURE_COUNT]; 4],
                bias: vec![0.0, 5.0, 0.0, 0.0],
            },
            viralscope_core::features::feature_names(),
        )
        .unwrap()),
        &ArtifactMetadata::new("v1").with_class_distribution(reference),
    );

    let early = predictor
        .detect_drift(None, Duration::hours(24), None)
        .unwrap();
    assert!(matches!(early, DriftOutcome::Insufficient { count: 0, required: 20 }));

    let requests: Vec<_> = (0..20).map(|i| scenario(&format!("vid-{}", i))).collect();
    predictor.predict_batch(&requests).unwrap();

    let outcome = predictor
        .detect_drift(None, Duration::hours(24), None)
        .unwrap();
    let DriftOutcome::Evaluated(report) = outcome else {
        panic!("expected an evaluated drift report");
    };
    assert!(report.drifted);
    assert!((report.max_drift - 0.7).abs() < 1e-9);

    let alerts = predictor.monitor().alerts(10);
    assert!(alerts.iter().any(|a| a.kind == AlertKind::DistributionDrift));
}

#[test]
fn test_health_follows_store() {
    let dir = TempDir::new().unwrap();
    let predictor = started(&dir);
    assert!(!predictor.check_health().issues().is_empty());

    predictor
        .store()
        .promote(&softmax_artifact("v1", [0.0, 1.0, 0.0, 0.0]))
        .unwrap();
    assert!(predictor.check_health().issues().is_empty());
}

#[tokio::test]
async fn test_concurrent_predictions_during_reload() {
    let dir = TempDir::new().unwrap();
    let service = Arc::new(PredictionService::new());
    let predictor = service.start(ServiceConfig::default().with_model_dir(dir.path())).unwrap();
    predictor
        .store()
        .promote(&softmax_artifact("v1", [0.0, 1.0, 0.0, 0.0]))
        .unwrap();

    let mut handles = Vec::new();
    for worker in 0..4 {
        let service = Arc::clone(&service);
        handles.push(tokio::task::spawn_blocking(move || {
            let predictor = service.predictor().unwrap();
            for i in 0..25 {
                let response = predictor
                    .predict(&scenario(&format!("w{}-{}", worker, i)))
                    .unwrap();
                assert!(response.overall_score <= 100);
            }
        }));
    }
    predictor.reload();
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(predictor.metrics().total_predictions, 100);
    assert_eq!(predictor.mode(), ScoringMode::Classifier);

    service.stop();
    assert!(matches!(service.predictor(), Err(Error::ServiceNotReady)));
}
