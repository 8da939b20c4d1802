//! Loader registry mapping artifact formats to decoders

use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

use crate::artifact::ModelArtifact;
use crate::classifier::Classifier;
use crate::loader_plugin::ClassifierLoader;
use crate::softmax::SoftmaxLoader;
use viralscope_core::{Error, Result};

/// Registry of classifier loaders keyed by format name
#[derive(Clone)]
pub struct LoaderRegistry {
    loaders: HashMap<String, Arc<dyn ClassifierLoader>>,
}

impl LoaderRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self {
            loaders: HashMap::new(),
        }
    }

    /// Registry with the built-in loaders
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(SoftmaxLoader));
        registry
    }

    /// Register a loader, replacing any loader for the same format
    pub fn register(&mut self, loader: Arc<dyn ClassifierLoader>) {
        let format = loader.format().to_string();
        if self.loaders.insert(format.clone(), loader).is_some() {
            info!("Replaced classifier loader for format: {}", format);
        }
    }

    /// Registered format names, sorted
    pub fn formats(&self) -> Vec<String> {
        let mut formats: Vec<_> = self.loaders.keys().cloned().collect();
        formats.sort();
        formats
    }

    /// Decode an artifact with the loader for its format
    pub fn load(&self, artifact: &ModelArtifact) -> Result<Arc<dyn Classifier>> {
        let format = &artifact.metadata.format;
        let loader = self.loaders.get(format).ok_or_else(|| {
            Error::model_unavailable(format!("no loader registered for format '{}'", format))
        })?;
        loader.load(&artifact.classifier, &artifact.metadata)
    }
}

impl Default for LoaderRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
