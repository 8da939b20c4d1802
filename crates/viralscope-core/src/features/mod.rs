//! Feature extraction
//!
//! [`FeatureExtractor`] turns raw [`VideoMetadata`](crate::types::VideoMetadata)
//! into a [`FeatureVector`] laid out in the versioned [`Feature`] order.
//! [`SchemaAlignment`] reorders that vector into whatever column order a
//! trained classifier was fitted on.

pub mod extractor;
pub mod layout;
pub mod text;
pub mod vector;

pub use extractor::{parse_timestamp, FeatureExtractor, ReferenceTime};
pub use layout::{feature_names, layout_hash, Feature, FEATURE_COUNT, FEATURE_VERSION};
pub use vector::{FeatureVector, SchemaAlignment};
