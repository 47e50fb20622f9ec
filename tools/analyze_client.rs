//! Analyze Client
//!
//! Uploads one or more images to a running server and prints the verdicts.

use anyhow::{bail, Context, Result};
use clap::Parser;
use reqwest::multipart::{Form, Part};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{error, info};
use traffic_sign_server::AnalyzeResponse;

#[derive(Parser, Debug)]
#[command(name = "analyze-client", about = "Send images to the traffic-sign server")]
struct Cli {
    /// Images to classify
    #[arg(required = true)]
    images: Vec<PathBuf>,

    /// Server base URL
    #[arg(long, default_value = "http://127.0.0.1:5042")]
    url: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("analyze_client=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let endpoint = format!("{}/analyze", cli.url.trim_end_matches('/'));

    let mut failures = 0;
    for path in &cli.images {
        match analyze(&client, &endpoint, path).await {
            Ok((response, elapsed_ms)) => {
                info!(
                    image = %path.display(),
                    result = %response.result,
                    elapsed_ms = elapsed_ms,
                    "Classified"
                );
            }
            Err(e) => {
                failures += 1;
                error!(image = %path.display(), error = %e, "Request failed");
            }
        }
    }

    if failures > 0 {
        bail!("{} of {} requests failed", failures, cli.images.len());
    }
    Ok(())
}

async fn analyze(
    client: &reqwest::Client,
    endpoint: &str,
    path: &Path,
) -> Result<(AnalyzeResponse, u128)> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());

    let form = Form::new().part("file", Part::bytes(bytes).file_name(file_name));

    let start = Instant::now();
    let response = client.post(endpoint).multipart(form).send().await?;
    let elapsed_ms = start.elapsed().as_millis();

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        bail!("server answered {}: {}", status, body);
    }

    Ok((response.json::<AnalyzeResponse>().await?, elapsed_ms))
}
