#![allow(dead_code)]

use async_trait::async_trait;
use image::{DynamicImage, Rgba, RgbaImage};
use mediagate_services::{
    BackendKind, ByteStream, Config, ObjectBackend, PutOverrides, StorageError, StorageResult,
};
use std::io::Cursor;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// One recorded store call on a [`RecordingBackend`].
#[derive(Debug, Clone)]
pub struct StoreCall {
    pub method: &'static str,
    pub destination: String,
    /// First two bytes of the stored file, captured for path-based stores.
    pub payload_magic: Option<[u8; 2]>,
}

/// In-memory backend that records store calls instead of talking to a cloud.
pub struct RecordingBackend {
    kind: BackendKind,
    pub calls: Mutex<Vec<StoreCall>>,
    pub fail_stores: bool,
}

impl RecordingBackend {
    pub fn new(kind: BackendKind) -> Arc<Self> {
        Arc::new(RecordingBackend {
            kind,
            calls: Mutex::new(Vec::new()),
            fail_stores: false,
        })
    }

    pub fn failing(kind: BackendKind) -> Arc<Self> {
        Arc::new(RecordingBackend {
            kind,
            calls: Mutex::new(Vec::new()),
            fail_stores: true,
        })
    }

    pub fn recorded(&self) -> Vec<StoreCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, method: &'static str, destination: &str, payload_magic: Option<[u8; 2]>) {
        self.calls.lock().unwrap().push(StoreCall {
            method,
            destination: destination.to_string(),
            payload_magic,
        });
    }

    fn public_url(&self, destination: &str) -> String {
        format!("https://{}.test.invalid/{destination}", self.kind)
    }
}

#[async_trait]
impl ObjectBackend for RecordingBackend {
    async fn store_from_path(
        &self,
        local_path: &Path,
        destination: &str,
        _overrides: Option<PutOverrides>,
    ) -> StorageResult<String> {
        let data = tokio::fs::read(local_path).await?;
        let magic = (data.len() >= 2).then(|| [data[0], data[1]]);
        self.record("store_from_path", destination, magic);
        if self.fail_stores {
            return Err(StorageError::UploadFailed("simulated".to_string()));
        }
        Ok(self.public_url(destination))
    }

    async fn store_from_url(
        &self,
        _source_url: &str,
        destination: &str,
        _overrides: Option<PutOverrides>,
    ) -> StorageResult<String> {
        self.record("store_from_url", destination, None);
        if self.fail_stores {
            return Err(StorageError::UploadFailed("simulated".to_string()));
        }
        Ok(self.public_url(destination))
    }

    async fn store_from_stream(
        &self,
        destination: &str,
        _stream: ByteStream,
        _content_length: Option<u64>,
        _overrides: Option<PutOverrides>,
    ) -> StorageResult<String> {
        self.record("store_from_stream", destination, None);
        if self.fail_stores {
            return Err(StorageError::UploadFailed("simulated".to_string()));
        }
        Ok(self.public_url(destination))
    }

    async fn delete_by_url(&self, _url: &str) -> bool {
        true
    }

    async fn issue_upload_credential(
        &self,
        destination: &str,
        _expires_in: Duration,
    ) -> StorageResult<String> {
        Ok(format!(
            "https://{}.test.invalid/{destination}?X-Amz-Signature=stub",
            self.kind
        ))
    }

    fn kind(&self) -> BackendKind {
        self.kind
    }
}

/// Test deployment configuration rooted at a temporary scratch directory.
pub fn test_config(scratch_dir: &Path) -> Config {
    Config {
        environment: "test".to_string(),
        scratch_dir: scratch_dir.to_path_buf(),
        gcs_bucket: "media".to_string(),
        spaces: None,
        peer_gateways: vec![],
        peer_upload_credential: String::new(),
    }
}

/// A small valid PNG for exercising the compression path.
pub fn sample_png() -> Vec<u8> {
    let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(48, 48, Rgba([20, 90, 200, 255])));
    let mut buffer = Vec::new();
    img.write_to(&mut Cursor::new(&mut buffer), image::ImageFormat::Png)
        .unwrap();
    buffer
}
