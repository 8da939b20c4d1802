//! ViralScope Classifiers
//!
//! Classification and scoring for viral-tier prediction, plus lifecycle
//! management of trained classifier artifacts.
//!
//! - [`Classifier`] is the narrow contract trained models satisfy
//! - [`LoaderRegistry`] decodes stored artifacts by format name
//! - [`ScoringEngine`] turns features and optional probabilities into scores
//! - [`ModelStore`] owns the current/archive directory structure
//!
//! Scoring runs synchronously on the CPU and takes microseconds per video.

pub mod artifact;
pub mod classifier;
pub mod loader_plugin;
pub mod registry;
pub mod scoring;
pub mod softmax;
pub mod store;

pub use artifact::{ArtifactMetadata, ModelArtifact};
pub use classifier::{ClassProbabilities, Classifier};
pub use loader_plugin::ClassifierLoader;
pub use registry::LoaderRegistry;
pub use scoring::{ScoringEngine, ScoringMode, ScoringOutcome};
pub use softmax::{SoftmaxClassifier, SoftmaxLoader, SoftmaxModel};
pub use store::{CurrentArtifact, ModelStore, PromotionReport, StoreState};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::artifact::{ArtifactMetadata, ModelArtifact};
    pub use crate::classifier::{ClassProbabilities, Classifier};
    pub use crate::registry::LoaderRegistry;
    pub use crate::scoring::{ScoringEngine, ScoringMode, ScoringOutcome};
    pub use crate::store::{CurrentArtifact, ModelStore};
}
