use crate::common::{content_type_for, fetch_source, put_object, put_stream};
use crate::traits::{ByteStream, ObjectBackend, PutOverrides, StorageError, StorageResult};
use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, HeaderValue, Method};
use mediagate_core::{BackendKind, SpacesConfig};
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path as ObjectPath;
use object_store::signer::Signer;
use object_store::ClientOptions;
use object_store::Error as ObjectStoreError;
use object_store::{ObjectStoreExt, Result as ObjectResult};
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Public URL for an object behind a virtual-hosted bucket domain.
pub fn spaces_public_url(bucket_domain: &str, key: &str) -> String {
    format!("{}/{}", bucket_domain.trim_end_matches('/'), key)
}

/// Virtual-hosted bucket endpoint: the bucket becomes the leading label of
/// the region endpoint's host. Virtual-hosted addressing expects the bucket
/// already embedded in the endpoint, so the store must be handed this form,
/// not the bare region endpoint.
pub(crate) fn bucket_endpoint(endpoint: &str, bucket: &str) -> StorageResult<String> {
    let parsed =
        Url::parse(endpoint).map_err(|e| StorageError::ConfigError(format!("{endpoint}: {e}")))?;
    let host = parsed
        .host_str()
        .ok_or_else(|| StorageError::ConfigError(format!("no host in endpoint: {endpoint}")))?;
    Ok(format!("{}://{}.{}", parsed.scheme(), bucket, host))
}

/// Recover (bucket, key) from a Spaces public URL. The bucket is the first
/// label of the host (virtual-hosted style); the key is the full path.
pub(crate) fn parse_spaces_url(url: &str) -> StorageResult<(String, String)> {
    let parsed = Url::parse(url).map_err(|e| StorageError::InvalidUrl(format!("{url}: {e}")))?;
    let host = parsed
        .host_str()
        .ok_or_else(|| StorageError::InvalidUrl(format!("no host in URL: {url}")))?;
    let bucket = host
        .split('.')
        .next()
        .filter(|b| !b.is_empty())
        .ok_or_else(|| StorageError::InvalidUrl(format!("no bucket in host: {url}")))?;
    let key = parsed.path().trim_start_matches('/');
    if key.is_empty() {
        return Err(StorageError::InvalidUrl(format!("no key in URL: {url}")));
    }
    Ok((bucket.to_string(), key.to_string()))
}

/// DigitalOcean Spaces backend (secondary object store), S3 wire protocol
#[derive(Clone)]
pub struct SpacesBackend {
    store: AmazonS3,
    bucket: String,
    bucket_domain: String,
    client: reqwest::Client,
}

impl SpacesBackend {
    /// Create a new SpacesBackend instance from the deployment configuration.
    ///
    /// Requests are addressed virtual-hosted style against the bucket
    /// endpoint derived from the region endpoint. Gateway-mediated writes
    /// carry `x-amz-acl: public-read` as a default client header so stored
    /// objects are publicly readable; pre-signed PUT URLs sign the host only,
    /// so client-direct uploads send a bare PUT and object visibility follows
    /// the bucket's default policy.
    pub fn new(config: &SpacesConfig) -> StorageResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert("x-amz-acl", HeaderValue::from_static("public-read"));

        let store = AmazonS3Builder::new()
            .with_bucket_name(config.bucket.clone())
            .with_region(config.region.clone())
            .with_endpoint(bucket_endpoint(&config.endpoint, &config.bucket)?)
            .with_access_key_id(config.access_key.clone())
            .with_secret_access_key(config.secret_key.clone())
            .with_virtual_hosted_style_request(true)
            .with_client_options(ClientOptions::default().with_default_headers(headers))
            .build()
            .map_err(|e| StorageError::ConfigError(e.to_string()))?;

        Ok(SpacesBackend {
            store,
            bucket: config.bucket.clone(),
            bucket_domain: config.bucket_domain.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        })
    }

    fn public_url(&self, key: &str) -> String {
        spaces_public_url(&self.bucket_domain, key)
    }
}

#[async_trait]
impl ObjectBackend for SpacesBackend {
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
                "Spaces upload failed"
            );
            StorageError::UploadFailed(e.to_string())
        })?;

        tracing::info!(
            bucket = %self.bucket,
            key = %destination,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Spaces upload successful"
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
                "Spaces stream upload failed"
            );
            e
        })?;

        tracing::info!(
            bucket = %self.bucket,
            key = %destination,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Spaces stream upload successful"
        );

        Ok(self.public_url(destination))
    }

    async fn delete_by_url(&self, url: &str) -> bool {
        let (bucket, key) = match parse_spaces_url(url) {
            Ok(parts) => parts,
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Spaces delete skipped, unparsable URL");
                return false;
            }
        };

        if bucket != self.bucket {
            tracing::warn!(
                url = %url,
                url_bucket = %bucket,
                configured_bucket = %self.bucket,
                "Spaces delete skipped, foreign bucket"
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
                    "Spaces delete successful"
                );
                true
            }
            Err(ObjectStoreError::NotFound { .. }) => {
                tracing::info!(bucket = %self.bucket, key = %key, "Spaces delete target not found");
                false
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Spaces delete failed"
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
        BackendKind::Spaces
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_url_parse_round_trip() {
        let domain = "https://media.sgp1.digitaloceanspaces.com";
        let url = spaces_public_url(domain, "avatars/photo.jpg");
        assert_eq!(
            url,
            "https://media.sgp1.digitaloceanspaces.com/avatars/photo.jpg"
        );
        let (bucket, key) = parse_spaces_url(&url).unwrap();
        assert_eq!(bucket, "media");
        assert_eq!(key, "avatars/photo.jpg");
    }

    #[test]
    fn trailing_slash_on_domain_is_tolerated() {
        let url = spaces_public_url("https://media.sgp1.digitaloceanspaces.com/", "a/b.png");
        assert_eq!(url, "https://media.sgp1.digitaloceanspaces.com/a/b.png");
    }

    #[test]
    fn parse_rejects_keyless_urls() {
        assert!(parse_spaces_url("https://media.sgp1.digitaloceanspaces.com/").is_err());
        assert!(parse_spaces_url("::::").is_err());
    }

    fn sample_config() -> SpacesConfig {
        SpacesConfig {
            endpoint: "https://sgp1.digitaloceanspaces.com".to_string(),
            region: "sgp1".to_string(),
            access_key: "test-key".to_string(),
            secret_key: "test-secret".to_string(),
            bucket: "media".to_string(),
            bucket_domain: "https://media.sgp1.digitaloceanspaces.com".to_string(),
        }
    }

    #[test]
    fn bucket_endpoint_prepends_bucket_label() {
        assert_eq!(
            bucket_endpoint("https://sgp1.digitaloceanspaces.com", "media").unwrap(),
            "https://media.sgp1.digitaloceanspaces.com"
        );
        assert!(bucket_endpoint("not a url", "media").is_err());
    }

    #[tokio::test]
    async fn signed_put_urls_address_the_bucket_host() {
        let backend = SpacesBackend::new(&sample_config()).unwrap();
        let url = backend
            .issue_upload_credential("event/medias/2026-8/a-1.png", Duration::from_secs(600))
            .await
            .unwrap();

        let parsed = Url::parse(&url).unwrap();
        assert_eq!(parsed.host_str(), Some("media.sgp1.digitaloceanspaces.com"));
        assert!(parsed.path().ends_with("/a-1.png"));
        // The public URL (signed URL minus query) must agree with the
        // advertised object URL shape.
        let (bucket, key) = parse_spaces_url(&url).unwrap();
        assert_eq!(bucket, "media");
        assert_eq!(key, "event/medias/2026-8/a-1.png");
    }

    #[tokio::test]
    async fn signed_put_urls_cover_only_the_host() {
        let backend = SpacesBackend::new(&sample_config()).unwrap();
        let url = backend
            .issue_upload_credential("event/medias/2026-8/a-1.png", Duration::from_secs(600))
            .await
            .unwrap();

        // The client sends a bare PUT: no x-amz-* headers are part of the
        // signature.
        assert!(url.contains("X-Amz-SignedHeaders=host"));
        assert!(!url.to_lowercase().contains("x-amz-acl"));
    }
}
