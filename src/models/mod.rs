//! ML model inference components

pub mod inference;
pub mod loader;
pub mod scoring;

pub use inference::{Classifier, OnnxClassifier};
pub use loader::{ModelLoadError, ModelLoader};
