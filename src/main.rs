//! Traffic-Sign Recognition Server - Main Entry Point
//!
//! Ensures the model artifact is present, loads it, and serves the
//! classification API.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use traffic_sign_server::{
    artifact::{ensure_artifact, HttpFetcher},
    config::{AppConfig, DEFAULT_CONFIG_PATH},
    logging,
    metrics::{InferenceMetrics, MetricsReporter},
    models::inference::OnnxClassifier,
    server::{self, AppState},
};

/// Traffic-sign recognition server
#[derive(Parser, Debug)]
#[command(name = "traffic-sign-server", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Download the model if needed, load it and serve the HTTP API
    Serve(ServeArgs),
    /// Download the model if needed and check that it loads
    Fetch(ConfigArgs),
}

#[derive(Args, Debug)]
struct ConfigArgs {
    /// Configuration file
    #[arg(short, long, env = "TRAFFIC_SIGN_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
}

#[derive(Args, Debug)]
struct ServeArgs {
    #[command(flatten)]
    config: ConfigArgs,

    /// Host to bind to (overrides the configuration file)
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on (overrides the configuration file)
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve(args) => {
            let mut config = load_config(&args.config)?;
            if let Some(host) = args.host {
                config.server.host = host;
            }
            if let Some(port) = args.port {
                config.server.port = port;
            }
            serve(config).await
        }
        Command::Fetch(args) => {
            let config = load_config(&args)?;
            let classifier = setup_classifier(&config).await?;
            info!(model = %traffic_sign_server::Classifier::describe(&classifier), "Model ready");
            Ok(())
        }
    }
}

fn load_config(args: &ConfigArgs) -> Result<AppConfig> {
    let config = AppConfig::load_from_path(&args.config)?;
    logging::init(&config.logging)?;
    info!(path = %args.config.display(), "Configuration loaded");
    Ok(config)
}

/// Make sure the artifact is cached locally and build the predictor from it
async fn setup_classifier(config: &AppConfig) -> Result<OnnxClassifier> {
    let fetcher = HttpFetcher::new(config.model.download_timeout_secs)?;
    let path = ensure_artifact(&fetcher, &config.model.url, &config.model.artifact_path())
        .await
        .context("Failed to obtain model artifact")?;

    let model_config = config.clone();
    tokio::task::spawn_blocking(move || OnnxClassifier::load(&path, &model_config))
        .await
        .context("Model loading task failed")?
}

async fn serve(config: AppConfig) -> Result<()> {
    info!("Starting Traffic-Sign Recognition Server v{}", env!("CARGO_PKG_VERSION"));
    info!(
        threshold = ?config.classification.effective_threshold(),
        top_k = config.classification.top_k,
        "Classification settings"
    );

    // The listener is only bound once the predictor is fully constructed
    let classifier = Arc::new(setup_classifier(&config).await?);

    let metrics = Arc::new(InferenceMetrics::new());
    if config.metrics.report_interval_secs > 0 {
        let reporter = MetricsReporter::new(metrics.clone(), config.metrics.report_interval_secs);
        tokio::spawn(reporter.start());
    }

    let state = Arc::new(AppState::new(classifier, &config, metrics));
    let router = server::build_router(state, &config.server);

    server::serve(router, &config.server.host, config.server.port).await
}
