//! Plumbing shared by both backend adapters: content-type lookup, source
//! fetching, and the `object_store` put-call shape.

use bytes::Bytes;
use futures::StreamExt;
use mediagate_core::constants::{BYTES_PER_MB, STORED_OBJECT_CACHE_CONTROL};
use object_store::path::Path as ObjectPath;
use object_store::{
    Attribute, Attributes, ObjectStore, ObjectStoreExt, PutMultipartOptions, PutOptions,
    PutPayload, Result as ObjectResult, WriteMultipart,
};
use url::Url;

use crate::traits::{ByteStream, PutOverrides, StorageError, StorageResult};

/// Known-length payloads up to this size go up in a single put; anything
/// larger (or of unknown length) is forwarded through a multipart upload.
const MULTIPART_THRESHOLD_BYTES: u64 = 10 * BYTES_PER_MB;

/// Bound on in-flight multipart part uploads.
const MAX_CONCURRENT_PARTS: usize = 8;

/// Derive a content type from a path-like string's extension.
/// Best effort: unknown extensions yield an empty string.
pub(crate) fn content_type_for(path: &str) -> String {
    mime_guess::from_path(path)
        .first_raw()
        .unwrap_or("")
        .to_string()
}

/// Attributes applied to every stored object: the derived content type and
/// the 7-day public cache directive, with per-call overrides layered on top.
fn object_attributes(content_type: &str, overrides: Option<&PutOverrides>) -> Attributes {
    let content_type = overrides
        .and_then(|o| o.content_type.clone())
        .unwrap_or_else(|| content_type.to_string());
    let cache_control = overrides
        .and_then(|o| o.cache_control.clone())
        .unwrap_or_else(|| STORED_OBJECT_CACHE_CONTROL.to_string());

    let mut attributes = Attributes::new();
    if !content_type.is_empty() {
        attributes.insert(Attribute::ContentType, content_type.into());
    }
    attributes.insert(Attribute::CacheControl, cache_control.into());
    attributes
}

/// Build the put options for a single-request store.
pub(crate) fn put_options(content_type: &str, overrides: Option<&PutOverrides>) -> PutOptions {
    PutOptions {
        attributes: object_attributes(content_type, overrides),
        ..Default::default()
    }
}

/// Write a fully buffered payload to the backend.
pub(crate) async fn put_object<S: ObjectStore + ObjectStoreExt>(
    store: &S,
    destination: &str,
    data: Bytes,
    content_type: &str,
    overrides: Option<&PutOverrides>,
) -> ObjectResult<()> {
    let location = ObjectPath::from(destination.to_string());
    store
        .put_opts(
            &location,
            PutPayload::from(data),
            put_options(content_type, overrides),
        )
        .await?;
    Ok(())
}

/// Pipe a byte stream into the backend write transport.
///
/// Payloads with a known length under the multipart threshold go up in one
/// put; everything else is forwarded chunk by chunk through a multipart
/// upload, so the full object is never held in memory. Returns the number of
/// bytes written.
pub(crate) async fn put_stream<S: ObjectStore + ObjectStoreExt>(
    store: &S,
    destination: &str,
    stream: ByteStream,
    content_length: Option<u64>,
    content_type: &str,
    overrides: Option<&PutOverrides>,
) -> StorageResult<u64> {
    if let Some(len) = content_length {
        if len <= MULTIPART_THRESHOLD_BYTES {
            let data = collect_stream(stream).await?;
            let size = data.len() as u64;
            put_object(store, destination, data, content_type, overrides)
                .await
                .map_err(|e| StorageError::UploadFailed(e.to_string()))?;
            return Ok(size);
        }
    }

    let location = ObjectPath::from(destination.to_string());
    let options = PutMultipartOptions {
        attributes: object_attributes(content_type, overrides),
        ..Default::default()
    };
    let upload = store
        .put_multipart_opts(&location, options)
        .await
        .map_err(|e| StorageError::UploadFailed(e.to_string()))?;

    let mut writer = WriteMultipart::new(upload);
    let mut written: u64 = 0;
    let mut stream = stream;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        written += chunk.len() as u64;
        writer
            .wait_for_capacity(MAX_CONCURRENT_PARTS)
            .await
            .map_err(|e| StorageError::UploadFailed(e.to_string()))?;
        writer.write(&chunk);
    }
    writer
        .finish()
        .await
        .map_err(|e| StorageError::UploadFailed(e.to_string()))?;
    Ok(written)
}

/// A remote source opened for streaming upload.
pub(crate) struct FetchedSource {
    pub stream: ByteStream,
    pub content_length: Option<u64>,
    pub content_type: String,
}

/// Open `source_url` as a byte stream.
///
/// The content type is derived from the URL's path, matching the contract of
/// `store_from_url`.
pub(crate) async fn fetch_source(
    client: &reqwest::Client,
    source_url: &str,
) -> StorageResult<FetchedSource> {
    let parsed =
        Url::parse(source_url).map_err(|e| StorageError::InvalidUrl(format!("{source_url}: {e}")))?;
    let content_type = content_type_for(parsed.path());

    let response = client
        .get(source_url)
        .send()
        .await
        .map_err(|e| StorageError::DownloadFailed(e.to_string()))?;

    if !response.status().is_success() {
        return Err(StorageError::DownloadFailed(format!(
            "source returned status {}",
            response.status()
        )));
    }

    let content_length = response.content_length();
    let stream = response
        .bytes_stream()
        .map(|chunk| chunk.map_err(|e| StorageError::DownloadFailed(e.to_string())));

    Ok(FetchedSource {
        stream: Box::pin(stream),
        content_length,
        content_type,
    })
}

/// Drain a byte stream into memory, for payloads small enough to go up in a
/// single put.
pub(crate) async fn collect_stream(mut stream: ByteStream) -> StorageResult<Bytes> {
    let mut buffer = Vec::new();
    while let Some(chunk) = stream.next().await {
        buffer.extend_from_slice(&chunk?);
    }
    Ok(Bytes::from(buffer))
}
