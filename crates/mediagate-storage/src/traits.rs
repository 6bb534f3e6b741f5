//! Storage abstraction trait
//!
//! This module defines the [`ObjectBackend`] trait that both storage backends
//! implement, together with the error and override types shared across them.

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use mediagate_core::BackendKind;
use std::path::Path;
use std::pin::Pin;
use std::time::Duration;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Signing failed: {0}")]
    SignFailed(String),

    #[error("Invalid object URL: {0}")]
    InvalidUrl(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// A stream of object bytes, as handed to [`ObjectBackend::store_from_stream`].
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, StorageError>> + Send>>;

/// Per-call overrides layered on top of the adapter defaults
/// (content type derived from the key, 7-day public cache directive).
#[derive(Debug, Clone, Default)]
pub struct PutOverrides {
    pub content_type: Option<String>,
    pub cache_control: Option<String>,
}

/// Storage backend capability set
///
/// Both backends (GCS, Spaces) implement this trait identically, differing
/// only in wire protocol, credentials and public URL shape. The rest of the
/// system never branches on provider identity outside the router.
///
/// Store operations return the constructed public URL; failures come back as
/// typed errors after being logged, and callers treat them as the failure
/// sentinel rather than propagating. Delete operations never error: they
/// report plain `bool` outcomes.
#[async_trait]
pub trait ObjectBackend: Send + Sync {
    /// Upload a local file to `destination` and return its public URL.
    ///
    /// The file is read fully into memory. Content type is derived from the
    /// destination key's extension, best effort (empty when unknown).
    async fn store_from_path(
        &self,
        local_path: &Path,
        destination: &str,
        overrides: Option<PutOverrides>,
    ) -> StorageResult<String>;

    /// Fetch `source_url` and upload it to `destination`.
    ///
    /// The source is fetched as a stream and handed to
    /// [`store_from_stream`](Self::store_from_stream); the upstream
    /// content-length is forwarded when present. Content type is derived from
    /// the source URL's path, not the destination key.
    async fn store_from_url(
        &self,
        source_url: &str,
        destination: &str,
        overrides: Option<PutOverrides>,
    ) -> StorageResult<String>;

    /// Pipe a byte stream into the backend write transport.
    ///
    /// No partial-object cleanup is attempted on failure; the backend may be
    /// left holding a truncated object (known limitation).
    async fn store_from_stream(
        &self,
        destination: &str,
        stream: ByteStream,
        content_length: Option<u64>,
        overrides: Option<PutOverrides>,
    ) -> StorageResult<String>;

    /// Delete the object identified by its public URL.
    ///
    /// Returns `false` on unparsable URLs, foreign buckets, missing objects
    /// and transport failures; never panics or errors.
    async fn delete_by_url(&self, url: &str) -> bool;

    /// Delete many objects concurrently, waiting for every attempt to settle.
    ///
    /// Always returns `true` once all attempts have settled; per-item
    /// outcomes are not reported here (see `StorageRouter::delete_many_outcomes`).
    async fn delete_many_by_url(&self, urls: &[String]) -> bool {
        futures::future::join_all(urls.iter().map(|url| self.delete_by_url(url))).await;
        true
    }

    /// Issue a write-only pre-signed PUT URL for `destination`.
    ///
    /// The signature is time-boxed by `expires_in` and covers the request
    /// host only: the uploading client sends a bare PUT with no additional
    /// headers. Object visibility for client-direct uploads follows the
    /// bucket's default policy.
    async fn issue_upload_credential(
        &self,
        destination: &str,
        expires_in: Duration,
    ) -> StorageResult<String>;

    /// Get the backend identity of this adapter.
    fn kind(&self) -> BackendKind;
}
