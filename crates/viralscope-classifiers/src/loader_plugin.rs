//! Extension points for artifact-backed classifier loading.

use std::sync::Arc;

use crate::artifact::ArtifactMetadata;
use crate::classifier::Classifier;
use viralscope_core::Result;

/// Pluggable decoder for stored classifier binaries.
///
/// The model store treats classifier bytes as opaque. A loader turns them
/// back into a [`Classifier`] for the format named in the artifact
/// metadata, so trainer backends can be added without touching the store
/// or the prediction path.
pub trait ClassifierLoader: Send + Sync {
    /// Format name recorded in [`ArtifactMetadata::format`]
    fn format(&self) -> &str;

    /// Decode a classifier from its stored bytes
    fn load(&self, bytes: &[u8], metadata: &ArtifactMetadata) -> Result<Arc<dyn Classifier>>;
}
