//! ONNX model loader

use anyhow::{Context, Result};
use ort::session::{builder::GraphOptimizationLevel, Session};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{error, info};

/// Operator guidance attached to artifact/runtime mismatches
const REMEDIATION: &str = "This model was exported for a different ONNX Runtime version and cannot be \
loaded by this server. Re-export the trained network to ONNX with an opset supported by the \
bundled runtime (opset 17 is a safe choice) and replace the artifact, or point `model.url` \
at a compatible export.";

/// Load failures that the operator has to fix on the artifact side
#[derive(Debug, Error)]
pub enum ModelLoadError {
    #[error("incompatible model artifact {}: {reason}\n\n{}", .path.display(), REMEDIATION)]
    IncompatibleArtifact { path: PathBuf, reason: String },
}

/// Loaded ONNX model with metadata
pub struct LoadedModel {
    /// ONNX Runtime session
    pub session: Session,
    /// Input name for the model
    pub input_name: String,
    /// Output name for class scores
    pub output_name: String,
}

/// Loader for ONNX models
pub struct ModelLoader {
    /// Number of threads for ONNX inference
    onnx_threads: usize,
}

impl ModelLoader {
    /// Create a new model loader with specified number of threads
    pub fn with_threads(onnx_threads: usize) -> Result<Self> {
        ort::init().with_name("traffic-sign-server").commit()?;
        info!(onnx_threads = onnx_threads, "ONNX Runtime initialized");
        Ok(Self { onnx_threads })
    }

    /// Load an ONNX model from file.
    ///
    /// Version mismatches between the artifact and the runtime are reported
    /// as [`ModelLoadError::IncompatibleArtifact`]; anything else propagates
    /// unchanged.
    pub fn load_model<P: AsRef<Path>>(&self, path: P) -> Result<LoadedModel> {
        let path = path.as_ref();

        info!(path = %path.display(), threads = self.onnx_threads, "Loading ONNX model");

        let session = match Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(self.onnx_threads)?
            .commit_from_file(path)
        {
            Ok(session) => session,
            Err(e) => {
                let reason = e.to_string();
                if is_version_mismatch(&reason) {
                    error!(path = %path.display(), error = %reason, "Model artifact is incompatible with the runtime");
                    return Err(ModelLoadError::IncompatibleArtifact {
                        path: path.to_path_buf(),
                        reason,
                    }
                    .into());
                }
                return Err(e).context(format!("Failed to load model from {:?}", path));
            }
        };

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .unwrap_or_else(|| "input".to_string());

        let output_name = session
            .outputs
            .iter()
            .find(|o| o.name.contains("prob") || o.name.contains("output") || o.name.contains("logits"))
            .map(|o| o.name.clone())
            .unwrap_or_else(|| {
                session
                    .outputs
                    .first()
                    .map(|o| o.name.clone())
                    .unwrap_or_else(|| "output".to_string())
            });

        info!(
            input = %input_name,
            output = %output_name,
            "Model loaded successfully"
        );

        Ok(LoadedModel {
            session,
            input_name,
            output_name,
        })
    }
}

/// Whether a runtime load error stems from an artifact/runtime version mismatch
fn is_version_mismatch(message: &str) -> bool {
    let message = message.to_lowercase();
    message.contains("ir version") || message.contains("opset") || message.contains("unsupported model")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_mismatch_detection() {
        assert!(is_version_mismatch(
            "Load model from export.onnx failed:Unsupported model IR version: 10, max supported IR version: 9"
        ));
        assert!(is_version_mismatch(
            "ONNX Runtime only *guarantees* support for models stamped with official released onnx opset versions. Opset 23 is under development"
        ));
        assert!(!is_version_mismatch("No such file or directory"));
    }

    #[test]
    fn test_incompatible_artifact_message() {
        let err = ModelLoadError::IncompatibleArtifact {
            path: PathBuf::from("app/models/export.onnx"),
            reason: "Unsupported model IR version: 10".to_string(),
        };
        let message = err.to_string();

        assert!(message.contains("app/models/export.onnx"));
        assert!(message.contains("Re-export the trained network"));
    }
}
