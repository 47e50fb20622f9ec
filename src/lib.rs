//! Traffic-Sign Recognition Server Library
//!
//! Serves a pretrained German traffic-sign classifier over HTTP. The model
//! artifact is downloaded once, loaded into ONNX Runtime at startup and
//! shared read-only by all requests.

pub mod artifact;
pub mod config;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod preprocess;
pub mod server;
pub mod types;

pub use config::AppConfig;
pub use metrics::InferenceMetrics;
pub use models::inference::{Classifier, OnnxClassifier};
pub use preprocess::ImagePreprocessor;
pub use types::prediction::{AnalyzeResponse, Classification, Verdict};
