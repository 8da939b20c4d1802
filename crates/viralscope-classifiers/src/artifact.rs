//! Trained classifier artifacts and their metadata records

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{de, Deserialize, Deserializer, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::sync::OnceLock;

use viralscope_core::features::{feature_names, parse_timestamp, FEATURE_VERSION};
use viralscope_core::{Error, Result, ViralClass};

/// Format name of the built-in linear softmax model
pub const SOFTMAX_FORMAT: &str = "softmax-json";

/// Metric checked by the promotion accuracy gate
pub const ACCURACY_METRIC: &str = "test_accuracy";

/// Metadata stored next to every classifier binary
///
/// Reading also accepts the trainer's flat layout: a naive ISO-8601
/// `trained_at`, top-level `test_accuracy`/`cv_mean`/`cv_std`, null
/// optional fields, and class counts instead of proportions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "StoredMetadata")]
pub struct ArtifactMetadata {
    /// Lexically sortable version string
    pub version: String,

    /// When training finished
    pub trained_at: DateTime<Utc>,

    /// Column order the classifier expects
    pub feature_names: Vec<String>,

    /// Class order used by the trainer
    pub class_names: Vec<String>,

    /// Evaluation metrics such as `test_accuracy` and `cv_mean`
    #[serde(default)]
    pub metrics: BTreeMap<String, f64>,

    /// Feature schema version the trainer extracted with
    #[serde(default = "default_feature_version")]
    pub feature_version: String,

    /// Loader format of the classifier binary
    #[serde(default = "default_format")]
    pub format: String,

    /// SHA-256 of the classifier binary
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,

    /// Number of training rows
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_count: Option<u64>,

    /// Class proportions of the training labels, used as the drift reference
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_distribution: Option<BTreeMap<ViralClass, f64>>,
}

/// On-disk form of [`ArtifactMetadata`]
#[derive(Deserialize)]
struct StoredMetadata {
    version: String,
    #[serde(deserialize_with = "deserialize_timestamp")]
    trained_at: DateTime<Utc>,
    feature_names: Vec<String>,
    class_names: Vec<String>,
    #[serde(default)]
    metrics: BTreeMap<String, f64>,
    #[serde(default = "default_feature_version")]
    feature_version: String,
    #[serde(default = "default_format")]
    format: String,
    #[serde(default)]
    checksum: Option<String>,
    #[serde(default)]
    data_count: Option<u64>,
    #[serde(default)]
    class_distribution: Option<BTreeMap<ViralClass, f64>>,
    #[serde(default)]
    test_accuracy: Option<f64>,
    #[serde(default)]
    cv_mean: Option<f64>,
    #[serde(default)]
    cv_std: Option<f64>,
}

impl From<StoredMetadata> for ArtifactMetadata {
    fn from(stored: StoredMetadata) -> Self {
        let mut metrics = stored.metrics;
        let flat = [
            (ACCURACY_METRIC, stored.test_accuracy),
            ("cv_mean", stored.cv_mean),
            ("cv_std", stored.cv_std),
        ];
        for (name, value) in flat {
            if let Some(value) = value {
                metrics.entry(name.to_string()).or_insert(value);
            }
        }

        Self {
            version: stored.version,
            trained_at: stored.trained_at,
            feature_names: stored.feature_names,
            class_names: stored.class_names,
            metrics,
            feature_version: stored.feature_version,
            format: stored.format,
            checksum: stored.checksum,
            data_count: stored.data_count,
            class_distribution: stored.class_distribution.and_then(proportions),
        }
    }
}

/// Scale to proportions; `None` when there is no positive mass
fn proportions(distribution: BTreeMap<ViralClass, f64>) -> Option<BTreeMap<ViralClass, f64>> {
    let total: f64 = distribution.values().filter(|v| v.is_finite() && **v > 0.0).sum();
    if total <= 0.0 {
        return None;
    }
    Some(
        distribution
            .into_iter()
            .map(|(class, v)| {
                let v = if v.is_finite() && v > 0.0 { v } else { 0.0 };
                (class, v / total)
            })
            .collect(),
    )
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> std::result::Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| de::Error::custom(format!("unrecognised trained_at '{}'", raw)))
}

fn default_feature_version() -> String {
    FEATURE_VERSION.to_string()
}

fn default_format() -> String {
    SOFTMAX_FORMAT.to_string()
}

impl ArtifactMetadata {
    /// Metadata for a model trained on the canonical feature layout
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            trained_at: Utc::now(),
            feature_names: feature_names(),
            class_names: ViralClass::ALL.iter().map(|c| c.to_string()).collect(),
            metrics: BTreeMap::new(),
            feature_version: default_feature_version(),
            format: default_format(),
            checksum: None,
            data_count: None,
            class_distribution: None,
        }
    }

    /// Set the loader format
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
        self
    }

    /// Set the expected feature order
    pub fn with_feature_names(mut self, names: Vec<String>) -> Self {
        self.feature_names = names;
        self
    }

    /// Record an evaluation metric
    pub fn with_metric(mut self, name: impl Into<String>, value: f64) -> Self {
        self.metrics.insert(name.into(), value);
        self
    }

    /// Set the training time
    pub fn with_trained_at(mut self, trained_at: DateTime<Utc>) -> Self {
        self.trained_at = trained_at;
        self
    }

    /// Set the training class distribution
    pub fn with_class_distribution(mut self, distribution: BTreeMap<ViralClass, f64>) -> Self {
        self.class_distribution = Some(distribution);
        self
    }

    /// Held-out accuracy, if recorded
    pub fn accuracy(&self) -> Option<f64> {
        self.metrics.get(ACCURACY_METRIC).copied()
    }

    /// Check fields the store and loaders rely on
    pub fn validate(&self) -> Result<()> {
        validate_version(&self.version)?;
        if self.feature_names.is_empty() {
            return Err(Error::validation("artifact metadata lists no feature names"));
        }
        for name in &self.class_names {
            name.parse::<ViralClass>()?;
        }
        Ok(())
    }
}

/// A classifier binary plus its metadata
#[derive(Debug, Clone, PartialEq)]
pub struct ModelArtifact {
    pub metadata: ArtifactMetadata,
    pub classifier: Vec<u8>,
}

impl ModelArtifact {
    /// Bundle bytes with metadata, stamping the checksum
    pub fn new(mut metadata: ArtifactMetadata, classifier: Vec<u8>) -> Self {
        metadata.checksum = Some(checksum(&classifier));
        Self {
            metadata,
            classifier,
        }
    }

    /// Artifact version
    pub fn version(&self) -> &str {
        &self.metadata.version
    }

    /// Verify the stored checksum, if one was recorded
    pub fn verify_checksum(&self) -> Result<()> {
        match &self.metadata.checksum {
            Some(expected) if *expected != checksum(&self.classifier) => Err(Error::store(format!(
                "checksum mismatch for artifact {}",
                self.metadata.version
            ))),
            _ => Ok(()),
        }
    }
}

/// Hex SHA-256 of classifier bytes
pub fn checksum(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Version string for a model trained now, e.g. `20240615_120000`
pub fn new_version() -> String {
    Utc::now().format("%Y%m%d_%H%M%S").to_string()
}

fn version_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]*$").ok())
        .as_ref()
}

/// Reject versions that are not safe as a single path component
pub fn validate_version(version: &str) -> Result<()> {
    let pattern =
        version_pattern().ok_or_else(|| Error::internal("version pattern failed to compile"))?;
    if version.len() > 128 || !pattern.is_match(version) {
        return Err(Error::validation(format!("invalid artifact version '{}'", version)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_validation() {
        assert!(validate_version("20240615_120000").is_ok());
        assert!(validate_version("v1.2-rc1").is_ok());
        assert!(validate_version("").is_err());
        assert!(validate_version("../escape").is_err());
        assert!(validate_version(".hidden").is_err());
        assert!(validate_version("a/b").is_err());
    }

    #[test]
    fn test_new_version_shape() {
        let version = new_version();
        assert_eq!(version.len(), 15);
        assert!(validate_version(&version).is_ok());
    }

    #[test]
    fn test_checksum_roundtrip() {
        let artifact = ModelArtifact::new(ArtifactMetadata::new("v1"), b"weights".to_vec());
        assert!(artifact.verify_checksum().is_ok());

        let mut tampered = artifact.clone();
        tampered.classifier.push(0);
        assert!(tampered.verify_checksum().is_err());
    }

    #[test]
    fn test_metadata_defaults_when_fields_missing() {
        let json = r#"{
            "version": "20240101_000000",
            "trained_at": "2024-01-01T00:00:00Z",
            "feature_names": ["views_log"],
            "class_names": ["low", "medium", "high", "ultra"]
        }"#;
        let metadata: ArtifactMetadata = serde_json::from_str(json).unwrap();

        assert_eq!(metadata.format, SOFTMAX_FORMAT);
        assert_eq!(metadata.feature_version, FEATURE_VERSION);
        assert!(metadata.metrics.is_empty());
        assert!(metadata.accuracy().is_none());
        assert!(metadata.validate().is_ok());
    }

    #[test]
    fn test_class_distribution_serializes_by_name() {
        let mut distribution = BTreeMap::new();
        distribution.insert(ViralClass::Low, 0.7);
        distribution.insert(ViralClass::Ultra, 0.3);
        let metadata = ArtifactMetadata::new("v1").with_class_distribution(distribution);

        let json = serde_json::to_value(&metadata).unwrap();
        assert_eq!(json["class_distribution"]["low"], 0.7);

        let parsed: ArtifactMetadata = serde_json::from_value(json).unwrap();
        assert_eq!(parsed.class_distribution, metadata.class_distribution);
    }

    #[test]
    fn test_trainer_layout_is_accepted() {
        let json = r#"{
            "version": "20240115_103000",
            "trained_at": "2024-01-15T10:30:00.123456",
            "feature_names": ["views_log", "likes_log"],
            "class_names": ["high", "low", "medium", "ultra"],
            "data_count": 1200,
            "test_accuracy": 0.71,
            "cv_mean": 0.69,
            "cv_std": null,
            "class_distribution": {"low": 600, "medium": 300, "high": 240, "ultra": 60}
        }"#;
        let metadata: ArtifactMetadata = serde_json::from_str(json).unwrap();

        assert_eq!(metadata.trained_at.to_rfc3339(), "2024-01-15T10:30:00.123456+00:00");
        assert_eq!(metadata.accuracy(), Some(0.71));
        assert_eq!(metadata.metrics.get("cv_mean"), Some(&0.69));
        assert!(!metadata.metrics.contains_key("cv_std"));
        let distribution = metadata.class_distribution.unwrap();
        assert!((distribution[&ViralClass::Low] - 0.5).abs() < 1e-12);
        assert!((distribution[&ViralClass::Ultra] - 0.05).abs() < 1e-12);
    }

    #[test]
    fn test_nested_metric_wins_over_flat() {
        let json = r#"{
            "version": "v1",
            "trained_at": "2024-01-15T10:30:00Z",
            "feature_names": ["views_log"],
            "class_names": ["low"],
            "metrics": {"test_accuracy": 0.8},
            "test_accuracy": 0.5
        }"#;
        let metadata: ArtifactMetadata = serde_json::from_str(json).unwrap();
        assert_eq!(metadata.accuracy(), Some(0.8));
    }

    #[test]
    fn test_unparseable_trained_at_rejected() {
        let json = r#"{
            "version": "v1",
            "trained_at": "last tuesday",
            "feature_names": ["views_log"],
            "class_names": ["low"]
        }"#;
        let err = serde_json::from_str::<ArtifactMetadata>(json).unwrap_err();
        assert!(err.to_string().contains("last tuesday"));
    }
}
