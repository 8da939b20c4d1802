//! Multinomial logistic (softmax) classifier stored as JSON

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::artifact::{ArtifactMetadata, SOFTMAX_FORMAT};
use crate::classifier::{ClassProbabilities, Classifier};
use crate::loader_plugin::ClassifierLoader;
use viralscope_core::{Error, Result, ViralClass};

/// Serialized softmax model: one weight row and bias per class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoftmaxModel {
    pub classes: Vec<ViralClass>,
    pub weights: Vec<Vec<f64>>,
    pub bias: Vec<f64>,
}

impl SoftmaxModel {
    /// Encode as artifact bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    fn check_shape(&self, width: usize) -> Result<()> {
        if self.classes.is_empty() {
            return Err(Error::classifier("softmax model has no classes"));
        }
        if self.weights.len() != self.classes.len() || self.bias.len() != self.classes.len() {
            return Err(Error::classifier(format!(
                "softmax model has {} classes but {} weight rows and {} biases",
                self.classes.len(),
                self.weights.len(),
                self.bias.len()
            )));
        }
        if let Some(row) = self.weights.iter().find(|row| row.len() != width) {
            return Err(Error::classifier(format!(
                "softmax weight row has {} columns, expected {}",
                row.len(),
                width
            )));
        }
        Ok(())
    }
}

/// Classifier backed by a [`SoftmaxModel`]
pub struct SoftmaxClassifier {
    name: String,
    model: SoftmaxModel,
    feature_names: Vec<String>,
}

impl SoftmaxClassifier {
    /// Wrap a model whose rows are laid out in `feature_names` order
    pub fn new(
        name: impl Into<String>,
        model: SoftmaxModel,
        feature_names: Vec<String>,
    ) -> Result<Self> {
        model.check_shape(feature_names.len())?;
        Ok(Self {
            name: name.into(),
            model,
            feature_names,
        })
    }
}

impl Classifier for SoftmaxClassifier {
    fn classify(&self, features: &[f64]) -> Result<ClassProbabilities> {
        if features.len() != self.feature_names.len() {
            return Err(Error::classifier(format!(
                "expected {} features, got {}",
                self.feature_names.len(),
                features.len()
            )));
        }

        let logits: Vec<f64> = self
            .model
            .weights
            .iter()
            .zip(&self.model.bias)
            .map(|(row, bias)| row.iter().zip(features).map(|(w, x)| w * x).sum::<f64>() + bias)
            .collect();

        let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let exps: Vec<f64> = logits.iter().map(|l| (l - max).exp()).collect();
        let total: f64 = exps.iter().sum();

        ClassProbabilities::from_pairs(
            self.model
                .classes
                .iter()
                .zip(exps)
                .map(|(class, e)| (*class, e / total)),
        )
        .normalized()
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn feature_importance(&self) -> Option<Vec<(String, f64)>> {
        let classes = self.model.weights.len() as f64;
        Some(
            self.feature_names
                .iter()
                .enumerate()
                .map(|(i, name)| {
                    let mean_abs =
                        self.model.weights.iter().map(|row| row[i].abs()).sum::<f64>() / classes;
                    (name.clone(), mean_abs)
                })
                .collect(),
        )
    }
}

/// Loader for [`SOFTMAX_FORMAT`] artifacts
#[derive(Debug, Default, Clone, Copy)]
pub struct SoftmaxLoader;

impl ClassifierLoader for SoftmaxLoader {
    fn format(&self) -> &str {
        SOFTMAX_FORMAT
    }

    fn load(&self, bytes: &[u8], metadata: &ArtifactMetadata) -> Result<Arc<dyn Classifier>> {
        let model: SoftmaxModel = serde_json::from_slice(bytes)?;
        debug!(
            "Decoded softmax model {} with {} classes",
            metadata.version,
            model.classes.len()
        );
        let classifier = SoftmaxClassifier::new(
            format!("softmax-{}", metadata.version),
            model,
            metadata.feature_names.clone(),
        )?;
        Ok(Arc::new(classifier))
    }
}
