//! Prediction facade
//!
//! Wires extraction, classification (or the fallback formulas), scoring and
//! suggestions into one call, and keeps the running metrics and monitor log
//! up to date. The serving model is chosen once per [`Predictor::reload`]
//! and swapped atomically; predictions in flight keep the model they
//! started with.

use chrono::Duration;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::config::ServiceConfig;
use viralscope_advisor::SuggestionEngine;
use viralscope_classifiers::{
    ArtifactMetadata, Classifier, CurrentArtifact, LoaderRegistry, ModelStore, ScoringEngine,
    ScoringMode, ScoringOutcome,
};
use viralscope_core::features::{FeatureExtractor, SchemaAlignment, FEATURE_VERSION};
use viralscope_core::{Error, PredictionRequest, Result, ScoreSet, Suggestion, ViralClass};
use viralscope_telemetry::metrics::names;
use viralscope_telemetry::{
    check_health, DriftOutcome, HealthReport, MetricsSnapshot, PredictionMetrics,
    PredictionMonitor,
};

/// The model predictions are currently served with
pub enum ServingModel {
    /// A loaded classifier and the column order it expects
    Classifier {
        classifier: Arc<dyn Classifier>,
        version: String,
        alignment: SchemaAlignment,
        class_distribution: Option<BTreeMap<ViralClass, f64>>,
    },

    /// Formula scoring, with the reason no classifier is serving
    Fallback { reason: String },
}

impl ServingModel {
    fn fallback(reason: impl Into<String>) -> Self {
        Self::Fallback {
            reason: reason.into(),
        }
    }

    /// Scoring mode this model produces
    pub fn mode(&self) -> ScoringMode {
        match self {
            Self::Classifier { .. } => ScoringMode::Classifier,
            Self::Fallback { .. } => ScoringMode::Fallback,
        }
    }
}

/// Response for one prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionResponse {
    pub video_id: String,
    pub overall_score: u8,
    pub hook_score: u8,
    pub trend_score: u8,
    pub audio_score: u8,
    pub timing_score: u8,
    pub hashtag_score: u8,
    pub suggestions: Vec<Suggestion>,
    pub viral_class: ViralClass,
    pub confidence: f64,
    pub prediction_time_ms: f64,
    pub scoring_mode: ScoringMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_version: Option<String>,
}

impl PredictionResponse {
    fn new(
        video_id: &str,
        outcome: &ScoringOutcome,
        suggestions: Vec<Suggestion>,
        latency_ms: f64,
        model_version: Option<String>,
    ) -> Self {
        let scores = outcome.scores;
        Self {
            video_id: video_id.to_string(),
            overall_score: scores.overall,
            hook_score: scores.hook,
            trend_score: scores.trend,
            audio_score: scores.audio,
            timing_score: scores.timing,
            hashtag_score: scores.hashtag,
            suggestions,
            viral_class: outcome.viral_class,
            confidence: round_to(outcome.confidence, 3),
            prediction_time_ms: round_to(latency_ms, 2),
            scoring_mode: outcome.mode,
            model_version,
        }
    }

    /// The six scores as a set
    pub fn scores(&self) -> ScoreSet {
        ScoreSet {
            overall: self.overall_score,
            hook: self.hook_score,
            trend: self.trend_score,
            audio: self.audio_score,
            timing: self.timing_score,
            hashtag: self.hashtag_score,
        }
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// A batch item that failed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchFailure {
    /// Position in the submitted batch
    pub index: usize,
    pub video_id: String,
    pub message: String,
}

/// Results of a batch; successes keep their input order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchOutcome {
    pub results: Vec<PredictionResponse>,
    pub failures: Vec<BatchFailure>,
    pub processed_count: usize,
    pub failed_count: usize,
}

impl BatchOutcome {
    /// Turn any failure into a `PartialBatchFailure` error
    pub fn ensure_complete(self) -> Result<Self> {
        if self.failed_count > 0 {
            return Err(Error::PartialBatchFailure {
                failed: self.failed_count,
                total: self.processed_count + self.failed_count,
            });
        }
        Ok(self)
    }
}

/// The prediction facade
pub struct Predictor {
    config: ServiceConfig,
    extractor: FeatureExtractor,
    scoring: ScoringEngine,
    suggestions: SuggestionEngine,
    store: Arc<ModelStore>,
    loaders: LoaderRegistry,
    serving: RwLock<Arc<ServingModel>>,
    /// Serializes store reads with the swap that publishes them
    reload_lock: Mutex<()>,
    metrics: PredictionMetrics,
    monitor: PredictionMonitor,
}

impl Predictor {
    /// Build from configuration: opens the store and loads the rule set.
    ///
    /// Starts in fallback mode; call [`Predictor::reload`] to load the
    /// current artifact.
    pub fn new(config: ServiceConfig) -> Result<Self> {
        let store = ModelStore::open(&config.model_dir)?.with_min_accuracy(config.min_accuracy);
        let suggestions = match &config.rules_path {
            Some(path) => SuggestionEngine::from_file(path)?,
            None => SuggestionEngine::with_defaults(),
        };
        Ok(Self::from_parts(
            config,
            Arc::new(store),
            LoaderRegistry::with_defaults(),
            suggestions,
        ))
    }

    /// Build from already constructed collaborators
    pub fn from_parts(
        config: ServiceConfig,
        store: Arc<ModelStore>,
        loaders: LoaderRegistry,
        suggestions: SuggestionEngine,
    ) -> Self {
        let monitor = PredictionMonitor::new(config.monitor.clone());
        Self {
            config,
            extractor: FeatureExtractor::new(),
            scoring: ScoringEngine::new(),
            suggestions,
            store,
            loaders,
            serving: RwLock::new(Arc::new(ServingModel::fallback("model not loaded yet"))),
            reload_lock: Mutex::new(()),
            metrics: PredictionMetrics::new(),
            monitor,
        }
    }

    /// Replace the feature extractor, e.g. to pin the reference time
    pub fn with_extractor(mut self, extractor: FeatureExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    /// Re-read the current artifact and swap the serving model.
    ///
    /// Returns `true` when a classifier is serving afterwards. Every failure
    /// to load falls back to formula scoring instead of erroring. Concurrent
    /// reloads publish in the order they read the store.
    pub fn reload(&self) -> bool {
        let _reload = self.reload_lock.lock();
        let serving = match self.store.load_current() {
            CurrentArtifact::Missing => ServingModel::fallback("no current model artifact"),
            CurrentArtifact::Corrupt(reason) => {
                ServingModel::fallback(format!("current artifact is corrupt: {}", reason))
            }
            CurrentArtifact::Ready(artifact) => match self.loaders.load(&artifact) {
                Ok(classifier) => serving_classifier(classifier, &artifact.metadata),
                Err(e) => ServingModel::fallback(format!(
                    "failed to load model {}: {}",
                    artifact.version(),
                    e
                )),
            },
        };

        let loaded = serving.mode() == ScoringMode::Classifier;
        metrics::counter!(
            names::MODEL_RELOADS_TOTAL,
            "outcome" => if loaded { "classifier" } else { "fallback" }
        )
        .increment(1);
        self.swap(serving);
        loaded
    }

    /// Serve a classifier directly, bypassing the store
    pub fn install(&self, classifier: Arc<dyn Classifier>, metadata: &ArtifactMetadata) {
        let _reload = self.reload_lock.lock();
        self.swap(serving_classifier(classifier, metadata));
    }

    fn swap(&self, serving: ServingModel) {
        match &serving {
            ServingModel::Classifier {
                classifier,
                version,
                ..
            } => info!("Serving model {} ({})", version, classifier.name()),
            ServingModel::Fallback { reason } => {
                warn!("Serving with fallback formulas: {}", reason)
            }
        }
        *self.serving.write() = Arc::new(serving);
    }

    /// Predict one video
    pub fn predict(&self, request: &PredictionRequest) -> Result<PredictionResponse> {
        let result = self.predict_inner(request);
        if let Err(e) = &result {
            warn!(video_id = %request.video_id, "Prediction failed: {}", e);
            self.metrics.record_failure();
        }
        result
    }

    fn predict_inner(&self, request: &PredictionRequest) -> Result<PredictionResponse> {
        request.validate()?;
        let start = Instant::now();

        let fv = self.extractor.extract(&request.metadata);
        let serving = self.serving.read().clone();
        let (outcome, model_version) = match serving.as_ref() {
            ServingModel::Classifier {
                classifier,
                version,
                alignment,
                ..
            } => {
                let probabilities = classifier.classify(&alignment.apply(&fv))?;
                let outcome = self.scoring.score_with_probabilities(&fv, &probabilities)?;
                (outcome, Some(version.clone()))
            }
            ServingModel::Fallback { .. } => (self.scoring.score_fallback(&fv), None),
        };
        let suggestions = self.suggestions.suggest(&fv, &outcome.scores);

        let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
        self.metrics
            .record(outcome.viral_class, outcome.mode.as_str(), latency_ms);
        self.monitor.log_prediction(
            &request.video_id,
            outcome.viral_class,
            outcome.confidence,
            latency_ms,
        );
        debug!(
            video_id = %request.video_id,
            class = %outcome.viral_class,
            overall = outcome.scores.overall,
            mode = outcome.mode.as_str(),
            "Prediction complete"
        );

        Ok(PredictionResponse::new(
            &request.video_id,
            &outcome,
            suggestions,
            latency_ms,
            model_version,
        ))
    }

    /// Predict a batch; item failures are collected, not propagated
    pub fn predict_batch(&self, requests: &[PredictionRequest]) -> Result<BatchOutcome> {
        if requests.len() > self.config.max_batch_size {
            return Err(Error::validation(format!(
                "batch of {} videos exceeds the maximum of {}",
                requests.len(),
                self.config.max_batch_size
            )));
        }

        let mut outcome = BatchOutcome::default();
        for (index, request) in requests.iter().enumerate() {
            match self.predict(request) {
                Ok(response) => outcome.results.push(response),
                Err(e) => outcome.failures.push(BatchFailure {
                    index,
                    video_id: request.video_id.clone(),
                    message: e.to_string(),
                }),
            }
        }
        outcome.processed_count = outcome.results.len();
        outcome.failed_count = outcome.failures.len();

        if outcome.failed_count > 0 {
            warn!(
                "Batch finished with {} of {} failures",
                outcome.failed_count,
                requests.len()
            );
        }
        Ok(outcome)
    }

    /// Version of the serving classifier; `None` in fallback mode
    pub fn model_version(&self) -> Option<String> {
        match self.serving.read().as_ref() {
            ServingModel::Classifier { version, .. } => Some(version.clone()),
            ServingModel::Fallback { .. } => None,
        }
    }

    /// Why the facade is in fallback mode, if it is
    pub fn fallback_reason(&self) -> Option<String> {
        match self.serving.read().as_ref() {
            ServingModel::Fallback { reason } => Some(reason.clone()),
            ServingModel::Classifier { .. } => None,
        }
    }

    /// Current scoring mode
    pub fn mode(&self) -> ScoringMode {
        self.serving.read().mode()
    }

    /// Running prediction metrics
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn monitor(&self) -> &PredictionMonitor {
        &self.monitor
    }

    pub fn store(&self) -> &ModelStore {
        &self.store
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Health of the model store under the configured age limit
    pub fn check_health(&self) -> HealthReport {
        check_health(&self.store, self.config.monitor.max_model_age_days)
    }

    /// Drift of recent predictions against `reference`, or against the
    /// serving model's training distribution when none is given
    pub fn detect_drift(
        &self,
        reference: Option<&BTreeMap<ViralClass, f64>>,
        window: Duration,
        threshold: Option<f64>,
    ) -> Result<DriftOutcome> {
        let threshold = threshold.unwrap_or(self.config.monitor.drift_threshold);
        if let Some(reference) = reference {
            return Ok(self.monitor.detect_drift(reference, window, threshold));
        }

        let serving = self.serving.read().clone();
        match serving.as_ref() {
            ServingModel::Classifier {
                class_distribution: Some(reference),
                ..
            } => Ok(self.monitor.detect_drift(reference, window, threshold)),
            _ => Err(Error::model_unavailable(
                "no reference class distribution: pass one or serve a model that records it",
            )),
        }
    }
}

fn serving_classifier(classifier: Arc<dyn Classifier>, metadata: &ArtifactMetadata) -> ServingModel {
    if metadata.feature_version != FEATURE_VERSION {
        warn!(
            "Model {} was trained on feature schema {}, extractor produces {}",
            metadata.version, metadata.feature_version, FEATURE_VERSION
        );
    }

    let alignment = SchemaAlignment::new(&metadata.feature_names);
    if !alignment.unknown_names().is_empty() {
        warn!(
            "Model {} expects {} unknown features, padding with 0: {:?}",
            metadata.version,
            alignment.unknown_names().len(),
            alignment.unknown_names()
        );
    }
    if !alignment.unused_features().is_empty() {
        debug!(
            "Model {} ignores {} extracted features",
            metadata.version,
            alignment.unused_features().len()
        );
    }

    ServingModel::Classifier {
        classifier,
        version: metadata.version.clone(),
        alignment,
        class_distribution: metadata.class_distribution.clone(),
    }
}
