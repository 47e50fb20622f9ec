//! HTTP surface: routes, shared state and error mapping

pub mod error;
pub mod routes;
pub mod state;

use crate::config::ServerConfig;
use anyhow::{Context, Result};
use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderName, Method},
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

pub use error::ApiError;
pub use state::{AppState, SharedState};

/// Build the application router
pub fn build_router(state: SharedState, config: &ServerConfig) -> Router {
    Router::new()
        .route("/", get(routes::index))
        .route("/about", get(routes::about))
        .route("/analyze", post(routes::analyze))
        .route("/health", get(routes::health))
        .nest_service("/static", ServeDir::new(&config.static_dir))
        .with_state(state)
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer())
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([HeaderName::from_static("x-requested-with"), header::CONTENT_TYPE])
}

/// Bind the listener and serve until the process is stopped.
///
/// `host` may be an IP literal (v4 or v6) or a resolvable name.
pub async fn serve(router: Router, host: &str, port: u16) -> Result<()> {
    let listener = tokio::net::TcpListener::bind((host, port))
        .await
        .with_context(|| format!("Failed to bind {}:{}", host, port))?;
    info!("Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router).await?;
    Ok(())
}
