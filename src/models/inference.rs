//! Traffic-sign inference engine

use crate::config::{AppConfig, ModelOutput};
use crate::models::loader::{LoadedModel, ModelLoader};
use crate::models::scoring::softmax;
use crate::preprocess::ImagePreprocessor;
use crate::types::labels::default_labels;
use crate::types::prediction::Classification;
use anyhow::{Context, Result};
use image::DynamicImage;
use std::path::Path;
use std::sync::Mutex;
use std::time::Instant;
use tracing::{debug, info};

/// Maps a decoded image to a traffic-sign class.
///
/// Implementations are shared by every request and must not keep
/// per-request state.
pub trait Classifier: Send + Sync {
    /// Classify a single image
    fn classify(&self, image: &DynamicImage) -> Result<Classification>;

    /// Class labels in output order
    fn labels(&self) -> &[String];

    /// Human-readable model description, for health reporting
    fn describe(&self) -> String {
        format!("{} classes", self.labels().len())
    }
}

/// Classifier backed by an ONNX Runtime session
pub struct OnnxClassifier {
    /// Loaded model. ONNX Runtime needs exclusive access to run a session.
    model: Mutex<LoadedModel>,
    /// Image to tensor conversion
    preprocessor: ImagePreprocessor,
    /// Class labels matching the model output order
    labels: Vec<String>,
    /// Interpretation of the raw output
    output: ModelOutput,
    /// Number of top classes kept per prediction
    top_k: usize,
    /// Artifact file name, for reporting
    artifact: String,
}

impl OnnxClassifier {
    /// Load the artifact at `path` using the model settings from `config`
    pub fn load(path: &Path, config: &AppConfig) -> Result<Self> {
        let loader = ModelLoader::with_threads(config.model.onnx_threads)?;
        let model = loader.load_model(path)?;

        let classifier = Self {
            model: Mutex::new(model),
            preprocessor: ImagePreprocessor::new(config.model.image_size, config.model.normalize),
            labels: default_labels(),
            output: config.model.output,
            top_k: config.classification.top_k,
            artifact: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
        };

        info!(
            classes = classifier.labels.len(),
            image_size = config.model.image_size,
            output = ?config.model.output,
            "Classifier initialized"
        );

        Ok(classifier)
    }

    /// Run the network and return the raw output scores
    fn run(&self, input: Vec<f32>) -> Result<Vec<f32>> {
        use ort::value::Tensor;

        let shape = self.preprocessor.input_shape().to_vec();
        let input_tensor =
            Tensor::from_array((shape, input)).context("Failed to create input tensor")?;

        let mut model = self
            .model
            .lock()
            .map_err(|e| anyhow::anyhow!("Lock error: {}", e))?;
        let LoadedModel {
            session,
            input_name,
            output_name,
        } = &mut *model;

        let outputs = session.run(ort::inputs![input_name.as_str() => input_tensor])?;

        let output = outputs
            .get(output_name.as_str())
            .with_context(|| format!("Model produced no output named {}", output_name))?;
        let (_shape, data) = output
            .try_extract_tensor::<f32>()
            .context("Model output is not a float tensor")?;

        Ok(data.to_vec())
    }
}

impl Classifier for OnnxClassifier {
    fn classify(&self, image: &DynamicImage) -> Result<Classification> {
        let start = Instant::now();
        let input = self.preprocessor.tensor_data(image);

        let raw = self.run(input)?;
        let probabilities = match self.output {
            ModelOutput::Logits => softmax(&raw),
            ModelOutput::Probabilities => raw,
        };

        let classification = Classification::from_probabilities(probabilities, &self.labels, self.top_k)?;

        debug!(
            label = %classification.label,
            confidence = classification.confidence,
            inference_time_us = start.elapsed().as_micros(),
            "Inference complete"
        );

        Ok(classification)
    }

    fn labels(&self) -> &[String] {
        &self.labels
    }

    fn describe(&self) -> String {
        format!("{} ({} classes)", self.artifact, self.labels.len())
    }
}
