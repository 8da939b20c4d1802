//! Service lifecycle
//!
//! Holds the predictor between `start` and `stop`. Callers get a
//! `ServiceNotReady` error instead of a half-initialized predictor.

use parking_lot::RwLock;
use std::sync::Arc;
use tracing::info;

use crate::config::ServiceConfig;
use crate::predictor::Predictor;
use viralscope_core::{Error, Result};

/// Owns the running predictor
#[derive(Default)]
pub struct PredictionService {
    predictor: RwLock<Option<Arc<Predictor>>>,
}

impl PredictionService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a predictor from `config`, load the current model and start
    /// serving. Replaces any predictor already running.
    pub fn start(&self, config: ServiceConfig) -> Result<Arc<Predictor>> {
        let predictor = Predictor::new(config)?;
        Ok(self.start_with(predictor))
    }

    /// Start serving an already built predictor
    pub fn start_with(&self, predictor: Predictor) -> Arc<Predictor> {
        predictor.reload();
        let predictor = Arc::new(predictor);
        *self.predictor.write() = Some(Arc::clone(&predictor));
        info!(
            "Prediction service started ({} mode)",
            predictor.mode().as_str()
        );
        predictor
    }

    /// Stop serving; in-flight callers keep their handle
    pub fn stop(&self) {
        if self.predictor.write().take().is_some() {
            info!("Prediction service stopped");
        }
    }

    /// The running predictor
    pub fn predictor(&self) -> Result<Arc<Predictor>> {
        self.predictor.read().clone().ok_or(Error::ServiceNotReady)
    }

    pub fn is_running(&self) -> bool {
        self.predictor.read().is_some()
    }
}
