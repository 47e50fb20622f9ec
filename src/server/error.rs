//! HTTP error responses

use axum::{
    extract::multipart::{MultipartError, MultipartRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Errors surfaced to HTTP clients
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("missing form field `{0}`")]
    MissingField(&'static str),

    #[error("invalid multipart body: {}", .0.body_text())]
    Multipart(#[from] MultipartError),

    #[error("invalid upload request: {}", .0.body_text())]
    Rejected(#[from] MultipartRejection),

    #[error("could not decode image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("inference failed: {0:#}")]
    Inference(anyhow::Error),

    #[error("page not available: {0}")]
    View(#[source] std::io::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingField(_) | ApiError::Decode(_) => StatusCode::BAD_REQUEST,
            ApiError::Multipart(e) => e.status(),
            ApiError::Rejected(e) => e.status(),
            ApiError::Inference(_) | ApiError::View(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "Request failed");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_errors_are_bad_request() {
        assert_eq!(ApiError::MissingField("file").status(), StatusCode::BAD_REQUEST);

        let decode = image::load_from_memory(b"nope").unwrap_err();
        assert_eq!(ApiError::Decode(decode).status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_inference_error_is_server_error() {
        let err = ApiError::Inference(anyhow::anyhow!("session crashed"));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "inference failed: session crashed");
    }

    #[test]
    fn test_multipart_rejection_keeps_axum_status() {
        let rejection = MultipartRejection::from(
            axum::extract::multipart::InvalidBoundary::default(),
        );
        let err = ApiError::from(rejection);

        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert!(err.to_string().starts_with("invalid upload request: "));
    }
}
