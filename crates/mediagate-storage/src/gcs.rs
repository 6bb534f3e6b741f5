use crate::common::{content_type_for, fetch_source, put_object, put_stream};
use crate::traits::{ByteStream, ObjectBackend, PutOverrides, StorageError, StorageResult};
use async_trait::async_trait;
use bytes::Bytes;
use http::Method;
use mediagate_core::BackendKind;
use object_store::gcp::{GoogleCloudStorage, GoogleCloudStorageBuilder};
use object_store::path::Path as ObjectPath;
use object_store::signer::Signer;
use object_store::Error as ObjectStoreError;
use object_store::{ObjectStoreExt, Result as ObjectResult};
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Well-known public API host for Google Cloud Storage.
pub const GCS_API_HOST: &str = "storage.googleapis.com";

/// Public URL for an object in a GCS bucket. The bucket is path-embedded.
pub fn gcs_public_url(bucket: &str, key: &str) -> String {
    format!("https://{}/{}/{}", GCS_API_HOST, bucket, key)
}

/// Recover (bucket, key) from a GCS public URL. Inverse of [`gcs_public_url`].
pub(crate) fn parse_gcs_url(url: &str) -> StorageResult<(String, String)> {
    let parsed = Url::parse(url).map_err(|e| StorageError::InvalidUrl(format!("{url}: {e}")))?;
    let path = parsed.path().trim_start_matches('/');
    match path.split_once('/') {
        Some((bucket, key)) if !bucket.is_empty() && !key.is_empty() => {
            Ok((bucket.to_string(), key.to_string()))
        }
        _ => Err(StorageError::InvalidUrl(format!(
            "no bucket/key in GCS URL: {url}"
        ))),
    }
}

/// Google Cloud Storage backend (primary object store)
#[derive(Clone)]
pub struct GcsBackend {
    store: GoogleCloudStorage,
    bucket: String,
    client: reqwest::Client,
}

impl GcsBackend {
    /// Create a new GcsBackend instance.
    ///
    /// Service-account credentials are picked up from the environment
    /// (`GOOGLE_SERVICE_ACCOUNT` and friends), matching the builder defaults.
    pub fn new(bucket: String) -> StorageResult<Self> {
        let store = GoogleCloudStorageBuilder::from_env()
            .with_bucket_name(bucket.clone())
            .build()
            .map_err(|e| StorageError::ConfigError(e.to_string()))?;

        Ok(GcsBackend {
            store,
            bucket,
            client: reqwest::Client::new(),
        })
    }

    fn public_url(&self, key: &str) -> String {
        gcs_public_url(&self.bucket, key)
    }
}

#[async_trait]
impl ObjectBackend for GcsBackend {
    async fn store_from_path(
        &self,
        local_path: &Path,
        destination: &str,
        overrides: Option<PutOverrides>,
    ) -> StorageResult<String> {
        let data = tokio::fs::read(local_path).await?;
        let size = data.len() as u64;
        let content_type = content_type_for(destination);
        let start = std::time::Instant::now();

        put_object(
            &self.store,
            destination,
            Bytes::from(data),
            &content_type,
            overrides.as_ref(),
        )
        .await
        .map_err(|e| {
            tracing::error!(
                error = %e,
                bucket = %self.bucket,
                key = %destination,
                size_bytes = size,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "GCS upload failed"
            );
            StorageError::UploadFailed(e.to_string())
        })?;

        tracing::info!(
            bucket = %self.bucket,
            key = %destination,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "GCS upload successful"
        );

        Ok(self.public_url(destination))
    }

    async fn store_from_url(
        &self,
        source_url: &str,
        destination: &str,
        overrides: Option<PutOverrides>,
    ) -> StorageResult<String> {
        let source = fetch_source(&self.client, source_url).await?;
        let overrides = Some(PutOverrides {
            content_type: overrides
                .as_ref()
                .and_then(|o| o.content_type.clone())
                .or(Some(source.content_type.clone())),
            cache_control: overrides.and_then(|o| o.cache_control),
        });
        self.store_from_stream(destination, source.stream, source.content_length, overrides)
            .await
    }

    async fn store_from_stream(
        &self,
        destination: &str,
        stream: ByteStream,
        content_length: Option<u64>,
        overrides: Option<PutOverrides>,
    ) -> StorageResult<String> {
        let start = std::time::Instant::now();
        let content_type = content_type_for(destination);

        let size = put_stream(
            &self.store,
            destination,
            stream,
            content_length,
            &content_type,
            overrides.as_ref(),
        )
        .await
        .map_err(|e| {
            tracing::error!(
                error = %e,
                bucket = %self.bucket,
                key = %destination,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "GCS stream upload failed"
            );
            e
        })?;

        tracing::info!(
            bucket = %self.bucket,
            key = %destination,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "GCS stream upload successful"
        );

        Ok(self.public_url(destination))
    }

    async fn delete_by_url(&self, url: &str) -> bool {
        let (bucket, key) = match parse_gcs_url(url) {
            Ok(parts) => parts,
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "GCS delete skipped, unparsable URL");
                return false;
            }
        };

        // The adapter is bound to one bucket at construction; URLs pointing
        // at another bucket cannot be addressed from here.
        if bucket != self.bucket {
            tracing::warn!(
                url = %url,
                url_bucket = %bucket,
                configured_bucket = %self.bucket,
                "GCS delete skipped, foreign bucket"
            );
            return false;
        }

        let start = std::time::Instant::now();
        let location = ObjectPath::from(key.clone());
        let result: ObjectResult<_> = self.store.delete(&location).await;

        match result {
            Ok(_) => {
                tracing::info!(
                    bucket = %self.bucket,
                    key = %key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "GCS delete successful"
                );
                true
            }
            Err(ObjectStoreError::NotFound { .. }) => {
                tracing::info!(bucket = %self.bucket, key = %key, "GCS delete target not found");
                false
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "GCS delete failed"
                );
                false
            }
        }
    }

    async fn issue_upload_credential(
        &self,
        destination: &str,
        expires_in: Duration,
    ) -> StorageResult<String> {
        let location = ObjectPath::from(destination.to_string());
        let url_result: ObjectResult<_> = self
            .store
            .signed_url(Method::PUT, &location, expires_in)
            .await;

        let url = url_result
            .map_err(|e| StorageError::SignFailed(e.to_string()))?
            .to_string();

        Ok(url)
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Gcs
    }
}
