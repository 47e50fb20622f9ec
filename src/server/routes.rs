//! Request handlers

use crate::preprocess::decode_image;
use crate::server::error::ApiError;
use crate::server::state::SharedState;
use crate::types::prediction::{AnalyzeResponse, Classification, Verdict};
use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    response::Html,
    Json,
};
use serde::Serialize;
use std::time::Instant;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Multipart field carrying the uploaded image
pub const FILE_FIELD: &str = "file";

/// GET / - landing page
pub async fn index(State(state): State<SharedState>) -> Result<Html<String>, ApiError> {
    render_view(&state, "index.html").await
}

/// GET /about - informational page
pub async fn about(State(state): State<SharedState>) -> Result<Html<String>, ApiError> {
    render_view(&state, "about.html").await
}

async fn render_view(state: &SharedState, name: &str) -> Result<Html<String>, ApiError> {
    let path = state.view_dir.join(name);
    let html = tokio::fs::read_to_string(&path).await.map_err(|e| {
        warn!(path = %path.display(), error = %e, "Failed to read view");
        ApiError::View(e)
    })?;
    Ok(Html(html))
}

/// POST /analyze - classify an uploaded image
pub async fn analyze(
    State(state): State<SharedState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let request_id = Uuid::new_v4();
    let span = info_span!("analyze", request_id = %request_id);

    async move {
        state.metrics.record_request();

        let result = match multipart {
            Ok(multipart) => classify_upload(&state, multipart).await,
            Err(rejection) => Err(ApiError::from(rejection)),
        };
        match result {
            Ok(response) => Ok(Json(response)),
            Err(e) => {
                state.metrics.record_failure();
                debug!(error = %e, "Analyze request failed");
                Err(e)
            }
        }
    }
    .instrument(span)
    .await
}

async fn classify_upload(
    state: &SharedState,
    mut multipart: Multipart,
) -> Result<AnalyzeResponse, ApiError> {
    let bytes = read_file_field(&mut multipart).await?;
    debug!(bytes = bytes.len(), "Received upload");

    let start = Instant::now();
    let classifier = state.classifier.clone();

    // Decoding and the forward pass are CPU-bound
    let classification = tokio::task::spawn_blocking(move || -> Result<Classification, ApiError> {
        let image = decode_image(&bytes)?;
        classifier.classify(&image).map_err(ApiError::Inference)
    })
    .await
    .map_err(|e| ApiError::Inference(anyhow::anyhow!("Inference task failed: {}", e)))??;

    let elapsed = start.elapsed();
    let verdict = Verdict::from_classification(&classification, state.threshold);

    state.metrics.record_prediction(
        &classification.label,
        classification.confidence,
        verdict.is_rejected(),
        elapsed,
    );

    info!(
        label = %classification.label,
        confidence = classification.confidence,
        rejected = verdict.is_rejected(),
        top_k = ?classification.top_k,
        elapsed_us = elapsed.as_micros(),
        "Image classified"
    );

    Ok(verdict.into())
}

/// Read the complete content of the upload field
async fn read_file_field(multipart: &mut Multipart) -> Result<Vec<u8>, ApiError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some(FILE_FIELD) {
            return Ok(field.bytes().await?.to_vec());
        }
    }
    Err(ApiError::MissingField(FILE_FIELD))
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub started_at: String,
    pub uptime_seconds: u64,
    pub model: String,
    pub threshold: Option<f32>,
    pub requests: u64,
    pub rejections: u64,
    pub failures: u64,
}

/// GET /health - liveness and request counters
pub async fn health(State(state): State<SharedState>) -> Json<HealthResponse> {
    let counters = state.metrics.counters();

    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        started_at: state.started_at.to_rfc3339(),
        uptime_seconds: state.uptime_seconds(),
        model: state.classifier.describe(),
        threshold: state.threshold,
        requests: counters.requests,
        rejections: counters.rejected,
        failures: counters.failed,
    })
}
