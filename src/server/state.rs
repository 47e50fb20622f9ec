//! Shared application state for request handlers

use crate::config::AppConfig;
use crate::metrics::InferenceMetrics;
use crate::models::Classifier;
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

/// State handed to every handler. Read-only after startup.
pub struct AppState {
    /// Predictor shared by all requests
    pub classifier: Arc<dyn Classifier>,
    /// Confidence threshold, `None` when thresholding is disabled
    pub threshold: Option<f32>,
    /// Directory holding the HTML views
    pub view_dir: PathBuf,
    /// Request statistics
    pub metrics: Arc<InferenceMetrics>,
    /// Wall-clock start time
    pub started_at: DateTime<Utc>,
    started: Instant,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(
        classifier: Arc<dyn Classifier>,
        config: &AppConfig,
        metrics: Arc<InferenceMetrics>,
    ) -> Self {
        Self {
            classifier,
            threshold: config.classification.effective_threshold(),
            view_dir: config.server.view_dir.clone(),
            metrics,
            started_at: Utc::now(),
            started: Instant::now(),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started.elapsed().as_secs()
    }
}
