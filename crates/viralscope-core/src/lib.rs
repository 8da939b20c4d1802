//! ViralScope Core
//!
//! Core types and utilities shared across ViralScope components.
//!
//! This crate provides:
//! - The input data model for short-form videos and the scoring output types
//! - Error types and result handling
//! - Deterministic feature extraction into a versioned, ordered vector

pub mod error;
pub mod features;
pub mod types;

pub use error::{Error, Result};
pub use features::{Feature, FeatureExtractor, FeatureVector, SchemaAlignment};
pub use types::{
    EngagementData, PredictionRequest, Priority, ScoreDimension, ScoreSet, Suggestion,
    SuggestionCategory, VideoMetadata, ViralClass,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::features::{Feature, FeatureExtractor, FeatureVector, SchemaAlignment};
    pub use crate::types::{
        EngagementData, PredictionRequest, Priority, ScoreSet, Suggestion, SuggestionCategory,
        VideoMetadata, ViralClass,
    };
}
