//! Model artifact download
//!
//! The artifact is fetched at most once: if the destination file already
//! exists no network request is made.

use anyhow::{bail, Context, Result};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Source of artifact bytes
pub trait ArtifactFetcher {
    /// Fetch the complete body located at `url`
    fn fetch(&self, url: &str) -> impl Future<Output = Result<Vec<u8>>> + Send;
}

/// Fetches artifacts over HTTP(S)
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Create a fetcher. A zero timeout waits indefinitely.
    pub fn new(timeout_secs: u64) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if timeout_secs > 0 {
            builder = builder.timeout(Duration::from_secs(timeout_secs));
        }
        let client = builder.build().context("Failed to build HTTP client")?;
        Ok(Self { client })
    }
}

impl ArtifactFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Failed to request {}", url))?;

        let status = response.status();
        if !status.is_success() {
            bail!("Download of {} failed with status {}", url, status);
        }

        let body = response
            .bytes()
            .await
            .with_context(|| format!("Failed to read body from {}", url))?;

        Ok(body.to_vec())
    }
}

/// Make sure the artifact exists at `dest`, downloading it from `url` if not.
///
/// The body is written to a `.part` sibling and renamed into place once
/// complete, so an interrupted download never leaves a truncated artifact at
/// `dest`.
pub async fn ensure_artifact<F: ArtifactFetcher>(
    fetcher: &F,
    url: &str,
    dest: &Path,
) -> Result<PathBuf> {
    let present = tokio::fs::try_exists(dest)
        .await
        .with_context(|| format!("Failed to check for {}", dest.display()))?;
    if present {
        debug!(path = %dest.display(), "Model artifact already present, skipping download");
        return Ok(dest.to_path_buf());
    }

    if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    info!(url = %url, path = %dest.display(), "Downloading model artifact");
    let data = fetcher.fetch(url).await?;

    let partial = partial_path(dest);
    tokio::fs::write(&partial, &data)
        .await
        .with_context(|| format!("Failed to write {}", partial.display()))?;
    tokio::fs::rename(&partial, dest)
        .await
        .with_context(|| format!("Failed to move artifact into {}", dest.display()))?;

    info!(path = %dest.display(), bytes = data.len(), "Model artifact downloaded");
    Ok(dest.to_path_buf())
}

fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    dest.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::get, Router};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Fetcher that counts calls and returns a fixed body
    struct CountingFetcher {
        calls: AtomicUsize,
        body: Vec<u8>,
    }

    impl CountingFetcher {
        fn new(body: &[u8]) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                body: body.to_vec(),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl ArtifactFetcher for CountingFetcher {
        async fn fetch(&self, _url: &str) -> Result<Vec<u8>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.body.clone())
        }
    }

    struct FailingFetcher;

    impl ArtifactFetcher for FailingFetcher {
        async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
            bail!("connection refused: {}", url)
        }
    }

    #[tokio::test]
    async fn test_cached_artifact_skips_fetch() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("export.onnx");
        std::fs::write(&dest, b"cached").unwrap();

        let fetcher = CountingFetcher::new(b"fresh");
        let path = ensure_artifact(&fetcher, "http://example.invalid/model", &dest)
            .await
            .unwrap();

        assert_eq!(path, dest);
        assert_eq!(fetcher.calls(), 0);
        assert_eq!(std::fs::read(&dest).unwrap(), b"cached");
    }

    #[tokio::test]
    async fn test_missing_artifact_is_downloaded_once() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("models").join("export.onnx");

        let fetcher = CountingFetcher::new(b"weights");
        ensure_artifact(&fetcher, "http://example.invalid/model", &dest)
            .await
            .unwrap();
        ensure_artifact(&fetcher, "http://example.invalid/model", &dest)
            .await
            .unwrap();

        assert_eq!(fetcher.calls(), 1);
        assert_eq!(std::fs::read(&dest).unwrap(), b"weights");
        assert!(!partial_path(&dest).exists());
    }

    #[tokio::test]
    async fn test_fetch_failure_leaves_no_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("export.onnx");

        let result = ensure_artifact(&FailingFetcher, "http://example.invalid/model", &dest).await;

        assert!(result.is_err());
        assert!(!dest.exists());
    }

    /// Serve `/model.onnx` with a fixed body and `/missing` as 404
    async fn spawn_artifact_server() -> String {
        let app = Router::new()
            .route("/model.onnx", get(|| async { b"onnx-weights".to_vec() }))
            .route("/missing", get(|| async { StatusCode::NOT_FOUND }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_http_download_writes_body() {
        let base = spawn_artifact_server().await;
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("export.onnx");

        let fetcher = HttpFetcher::new(5).unwrap();
        ensure_artifact(&fetcher, &format!("{}/model.onnx", base), &dest)
            .await
            .unwrap();

        assert_eq!(std::fs::read(&dest).unwrap(), b"onnx-weights");
    }

    #[tokio::test]
    async fn test_http_error_status_leaves_no_artifact() {
        let base = spawn_artifact_server().await;
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("export.onnx");

        let fetcher = HttpFetcher::new(0).unwrap();
        let err = ensure_artifact(&fetcher, &format!("{}/missing", base), &dest)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("404"));
        assert!(!dest.exists());
        assert!(!partial_path(&dest).exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_unreadable_cache_dir_is_an_error() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let locked = dir.path().join("locked");
        std::fs::create_dir(&locked).unwrap();
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o000)).unwrap();
        let dest = locked.join("export.onnx");

        // root ignores directory permissions
        let readable = std::fs::metadata(&dest).is_ok()
            || std::fs::read_dir(&locked).is_ok();

        let fetcher = CountingFetcher::new(b"weights");
        let result = ensure_artifact(&fetcher, "http://example.invalid/model", &dest).await;
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();

        if !readable {
            let err = result.unwrap_err();
            assert!(err.to_string().contains("Failed to check for"));
            assert_eq!(fetcher.calls(), 0);
        }
    }

    #[test]
    fn test_partial_path() {
        let path = partial_path(Path::new("app/models/export.onnx"));
        assert_eq!(path, PathBuf::from("app/models/export.onnx.part"));
    }
}
