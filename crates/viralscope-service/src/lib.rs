//! ViralScope Service
//!
//! The prediction facade and its lifecycle, shared by the `viralscope`
//! binary and embedding applications.

pub mod config;
pub mod predictor;
pub mod service;

pub use config::ServiceConfig;
pub use predictor::{BatchFailure, BatchOutcome, PredictionResponse, Predictor, ServingModel};
pub use service::PredictionService;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::config::ServiceConfig;
    pub use crate::predictor::{BatchOutcome, PredictionResponse, Predictor};
    pub use crate::service::PredictionService;
}
