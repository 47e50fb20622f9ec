//! Configuration management for the traffic-sign server

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default location of the configuration file
pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";

/// Prefix for environment overrides, e.g. `TRAFFIC_SIGN__SERVER__PORT`
const ENV_PREFIX: &str = "TRAFFIC_SIGN";

/// How to interpret the model's output tensor
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ModelOutput {
    /// Raw scores, softmax is applied by the server
    #[default]
    Logits,
    /// Output is already a probability distribution
    Probabilities,
}

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub model: ModelConfig,
    pub classification: ClassificationConfig,
    pub logging: LoggingConfig,
    pub metrics: MetricsConfig,
}

/// HTTP listener configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Maximum accepted request body size for uploads
    pub max_upload_bytes: usize,
    /// Directory holding `index.html` and `about.html`
    pub view_dir: PathBuf,
    /// Directory served under `/static`
    pub static_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5042,
            max_upload_bytes: 16 * 1024 * 1024,
            view_dir: PathBuf::from("app/view"),
            static_dir: PathBuf::from("app/static"),
        }
    }
}

/// Model artifact and runtime configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Remote location of the model artifact
    pub url: String,
    /// Local directory the artifact is cached in
    pub dir: PathBuf,
    /// File name of the cached artifact
    pub file_name: String,
    /// Number of intra-op threads for ONNX Runtime
    pub onnx_threads: usize,
    /// Square input size expected by the network
    pub image_size: u32,
    /// Apply ImageNet mean/std normalization to the input
    pub normalize: bool,
    /// Interpretation of the output tensor
    pub output: ModelOutput,
    /// Download timeout in seconds (0 waits indefinitely)
    pub download_timeout_secs: u64,
}

impl ModelConfig {
    /// Full path of the cached artifact
    pub fn artifact_path(&self) -> PathBuf {
        self.dir.join(&self.file_name)
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            url: "https://drive.google.com/uc?export=download&id=1hkSFPRFnw5hmkAnUnrDCOU8s0Wdc6I-T"
                .to_string(),
            dir: PathBuf::from("app/models"),
            file_name: "export.onnx".to_string(),
            onnx_threads: 1,
            image_size: 224,
            normalize: true,
            output: ModelOutput::Logits,
            download_timeout_secs: 0,
        }
    }
}

/// Classification decision configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClassificationConfig {
    /// Reject predictions whose top-1 confidence is below `threshold`
    pub apply_threshold: bool,
    /// Minimum top-1 probability for a recognized sign
    pub threshold: f32,
    /// Number of top classes recorded per prediction
    pub top_k: usize,
}

impl ClassificationConfig {
    /// Threshold to apply, if thresholding is enabled
    pub fn effective_threshold(&self) -> Option<f32> {
        self.apply_threshold.then_some(self.threshold)
    }
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        Self {
            apply_threshold: true,
            threshold: 0.85,
            top_k: 5,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

/// Metrics reporting configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Seconds between summary log lines (0 disables the reporter)
    pub report_interval_secs: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            report_interval_secs: 300,
        }
    }
}

impl AppConfig {
    /// Load configuration from a specific path.
    ///
    /// The file is optional; missing keys fall back to defaults and
    /// `TRAFFIC_SIGN__*` environment variables override both.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}
