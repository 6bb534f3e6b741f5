//! Upload orchestrator
//!
//! Runs the per-request workflow: optional cross-environment delegation,
//! staging into the scratch directory, compression for image payloads,
//! storing through the router, and guaranteed scratch cleanup. A single
//! failed attempt is final; there are no retries at this layer.

use mediagate_core::constants::{BYTES_PER_MB, SCRATCH_TOKEN_LEN};
use mediagate_core::{random_token, Config};
use mediagate_processing::{compress_to_file, is_compressible_extension};
use mediagate_storage::StorageRouter;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Bound on a delegated upload round trip.
const DELEGATE_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Serialize)]
struct DelegatedUploadRequest<'a> {
    url: &'a str,
    folder: &'a str,
    file_ext: &'a str,
}

#[derive(Deserialize)]
struct DelegatedUploadResponse {
    data: Option<String>,
    url: Option<String>,
}

/// Top-level upload workflow service.
pub struct UploadService {
    router: Arc<StorageRouter>,
    config: Config,
    client: reqwest::Client,
}

impl UploadService {
    pub fn new(router: Arc<StorageRouter>, config: Config) -> Self {
        UploadService {
            router,
            config,
            client: reqwest::Client::new(),
        }
    }

    /// Upload a remote source to cloud storage and return its public URL.
    ///
    /// Image extensions are staged locally and re-encoded before storage;
    /// everything else is streamed straight from the source to the backend.
    /// Returns `None` on any failure; the scratch file, when one was staged,
    /// is removed on success and failure alike.
    pub async fn upload_file_to_cloud(
        &self,
        topic: &str,
        source_url: &str,
        file_ext: &str,
    ) -> Option<String> {
        // Non-primary environments centralize writes through a peer gateway
        // when one is configured; local handling is the fallback.
        if !self.config.is_production() && !self.config.peer_gateways.is_empty() {
            if let Some(url) = self.delegate_upload(topic, source_url, file_ext).await {
                return Some(url);
            }
        }

        let file_name = scratch_file_name(file_ext);
        let destination = format!("{topic}/{file_name}");

        if is_compressible_extension(file_ext) {
            let scratch_path = match self.stage_dir().await {
                Some(dir) => dir.join(&file_name),
                None => return None,
            };

            if let Err(e) = self.stage_compressed_from_url(source_url, &scratch_path).await {
                tracing::error!(
                    url = %source_url,
                    error = %e,
                    "Failed to download and compress image"
                );
                remove_scratch(&scratch_path).await;
                return None;
            }

            let stored = self
                .router
                .select_for_write(None)
                .store_from_path(&scratch_path, &destination, None)
                .await;
            remove_scratch(&scratch_path).await;

            match stored {
                Ok(url) => Some(url),
                Err(e) => {
                    tracing::error!(destination = %destination, error = %e, "Store failed");
                    None
                }
            }
        } else {
            match self
                .router
                .select_for_write(None)
                .store_from_url(source_url, &destination, None)
                .await
            {
                Ok(url) => Some(url),
                Err(e) => {
                    tracing::error!(
                        url = %source_url,
                        destination = %destination,
                        error = %e,
                        "Streamed store failed"
                    );
                    None
                }
            }
        }
    }

    /// Upload a locally materialized source file.
    ///
    /// Same workflow as [`upload_file_to_cloud`](Self::upload_file_to_cloud)
    /// with the download step skipped: images are compressed into the scratch
    /// directory, other extensions are stored from the original path as-is.
    pub async fn upload_local_file_to_cloud(
        &self,
        topic: &str,
        local_path: &Path,
        file_ext: &str,
    ) -> Option<String> {
        let file_name = scratch_file_name(file_ext);
        let destination = format!("{topic}/{file_name}");

        if is_compressible_extension(file_ext) {
            let scratch_path = match self.stage_dir().await {
                Some(dir) => dir.join(&file_name),
                None => return None,
            };

            let staged = async {
                let data = tokio::fs::read(local_path).await?;
                let size_mb = data.len() as f64 / BYTES_PER_MB as f64;
                compress_to_file(data, size_mb, &scratch_path).await?;
                Ok::<(), anyhow::Error>(())
            }
            .await;

            if let Err(e) = staged {
                tracing::error!(
                    path = %local_path.display(),
                    error = %e,
                    "Failed to compress local image"
                );
                remove_scratch(&scratch_path).await;
                return None;
            }

            let stored = self
                .router
                .select_for_write(None)
                .store_from_path(&scratch_path, &destination, None)
                .await;
            remove_scratch(&scratch_path).await;

            match stored {
                Ok(url) => Some(url),
                Err(e) => {
                    tracing::error!(destination = %destination, error = %e, "Store failed");
                    None
                }
            }
        } else {
            match self
                .router
                .select_for_write(None)
                .store_from_path(local_path, &destination, None)
                .await
            {
                Ok(url) => Some(url),
                Err(e) => {
                    tracing::error!(destination = %destination, error = %e, "Store failed");
                    None
                }
            }
        }
    }

    /// Forward the whole request to a random peer gateway.
    ///
    /// Best effort with a bounded timeout; any failure falls through to
    /// local handling.
    async fn delegate_upload(
        &self,
        topic: &str,
        source_url: &str,
        file_ext: &str,
    ) -> Option<String> {
        let peers = &self.config.peer_gateways;
        let peer = &peers[rand::rng().random_range(0..peers.len())];
        let endpoint = format!(
            "{}/media/upload-file-from-url?token={}",
            peer, self.config.peer_upload_credential
        );

        let response = self
            .client
            .post(&endpoint)
            .timeout(DELEGATE_TIMEOUT)
            .json(&DelegatedUploadRequest {
                url: source_url,
                folder: topic,
                file_ext,
            })
            .send()
            .await;

        let parsed = match response {
            Ok(response) if response.status().is_success() => {
                response.json::<DelegatedUploadResponse>().await
            }
            Ok(response) => {
                tracing::warn!(peer = %peer, status = %response.status(), "Delegated upload rejected");
                return None;
            }
            Err(e) => {
                tracing::warn!(peer = %peer, error = %e, "Delegated upload unreachable");
                return None;
            }
        };

        match parsed {
            Ok(body) => {
                let url = body.data.or(body.url);
                if let Some(url) = &url {
                    tracing::info!(peer = %peer, url = %url, "Upload delegated to peer gateway");
                }
                url
            }
            Err(e) => {
                tracing::warn!(peer = %peer, error = %e, "Delegated upload returned malformed body");
                None
            }
        }
    }

    /// Ensure the scratch directory exists.
    async fn stage_dir(&self) -> Option<PathBuf> {
        let dir = self.config.scratch_dir.clone();
        if let Err(e) = tokio::fs::create_dir_all(&dir).await {
            tracing::error!(dir = %dir.display(), error = %e, "Failed to create scratch directory");
            return None;
        }
        Some(dir)
    }

    /// Download the source and re-encode it into the scratch file.
    ///
    /// The size driving the quality choice comes from the upstream
    /// Content-Length, falling back to the downloaded body length.
    async fn stage_compressed_from_url(
        &self,
        source_url: &str,
        destination: &Path,
    ) -> anyhow::Result<()> {
        let response = self
            .client
            .get(source_url)
            .send()
            .await?
            .error_for_status()?;
        let content_length = response.content_length();
        let data = response.bytes().await?.to_vec();
        let size_mb = content_length.unwrap_or(data.len() as u64) as f64 / BYTES_PER_MB as f64;

        compress_to_file(data, size_mb, destination).await?;
        Ok(())
    }
}

/// Unique scratch filename: random token + millisecond timestamp.
/// The token keeps concurrent requests apart even within one millisecond.
fn scratch_file_name(file_ext: &str) -> String {
    format!(
        "{}_{}.{}",
        random_token(SCRATCH_TOKEN_LEN),
        chrono::Utc::now().timestamp_millis(),
        file_ext
    )
}

/// Remove a scratch file if it exists. Failures are logged, never surfaced.
async fn remove_scratch(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Failed to remove scratch file");
        }
    }
}
