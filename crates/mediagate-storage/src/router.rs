//! Backend router
//!
//! Resolves which backend adapter owns (or should own) an object, either from
//! an explicit selector or from an existing object's public URL, and fans
//! delete operations out across backends.

use crate::gcs::{GcsBackend, GCS_API_HOST};
use crate::spaces::SpacesBackend;
use crate::traits::{ObjectBackend, StorageError, StorageResult};
use futures::future::join_all;
use mediagate_core::{BackendKind, Config};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Domain suffix identifying DigitalOcean Spaces hosts.
const SPACES_DOMAIN_SUFFIX: &str = "digitaloceanspaces.com";

/// Routes operations to the backend that owns the object.
///
/// The secondary backend is optional: deployments without Spaces credentials
/// degrade softly to primary-only writes.
#[derive(Clone)]
pub struct StorageRouter {
    primary: Arc<dyn ObjectBackend>,
    secondary: Option<Arc<dyn ObjectBackend>>,
}

impl StorageRouter {
    pub fn new(
        primary: Arc<dyn ObjectBackend>,
        secondary: Option<Arc<dyn ObjectBackend>>,
    ) -> Self {
        StorageRouter { primary, secondary }
    }

    /// Build the router with real adapters from the deployment configuration.
    pub fn from_config(config: &Config) -> StorageResult<Self> {
        if config.gcs_bucket.is_empty() {
            return Err(StorageError::ConfigError(
                "GCS_BUCKET not configured".to_string(),
            ));
        }
        let primary: Arc<dyn ObjectBackend> =
            Arc::new(GcsBackend::new(config.gcs_bucket.clone())?);
        let secondary: Option<Arc<dyn ObjectBackend>> = match &config.spaces {
            Some(spaces) => Some(Arc::new(SpacesBackend::new(spaces)?)),
            None => None,
        };
        Ok(StorageRouter { primary, secondary })
    }

    /// Pick the backend a new object should be written to.
    ///
    /// With no secondary configured this always resolves to the primary;
    /// otherwise the explicit selector wins, defaulting to the primary.
    pub fn select_for_write(&self, explicit: Option<BackendKind>) -> Arc<dyn ObjectBackend> {
        match (&self.secondary, explicit) {
            (Some(secondary), Some(BackendKind::Spaces)) => secondary.clone(),
            _ => self.primary.clone(),
        }
    }

    /// Resolve the backend that owns a public URL from its host.
    ///
    /// Heuristic: an exact match on the GCS API host maps to the primary, a
    /// host under the Spaces domain maps to the secondary, and anything else
    /// (including unparsable URLs) silently defaults to the primary.
    pub fn resolve_from_url(url: &str) -> BackendKind {
        let host = match Url::parse(url) {
            Ok(parsed) => parsed.host_str().unwrap_or_default().to_string(),
            Err(_) => String::new(),
        };

        if host == GCS_API_HOST {
            return BackendKind::Gcs;
        }
        if host.contains(SPACES_DOMAIN_SUFFIX) {
            return BackendKind::Spaces;
        }

        tracing::debug!(url = %url, "Unknown host, defaulting to primary backend");
        BackendKind::Gcs
    }

    fn backend_for(&self, kind: BackendKind) -> Arc<dyn ObjectBackend> {
        match kind {
            BackendKind::Spaces => self
                .secondary
                .clone()
                .unwrap_or_else(|| self.primary.clone()),
            BackendKind::Gcs => self.primary.clone(),
        }
    }

    /// Delete an object by its public URL, on whichever backend owns it.
    pub async fn delete_by_url(&self, url: &str) -> bool {
        let kind = Self::resolve_from_url(url);
        self.backend_for(kind).delete_by_url(url).await
    }

    /// Delete many objects concurrently, returning per-item outcomes in
    /// input order. A single call may span both backends.
    pub async fn delete_many_outcomes(&self, urls: &[String]) -> Vec<bool> {
        join_all(urls.iter().map(|url| self.delete_by_url(url))).await
    }

    /// Delete many objects concurrently, waiting for every attempt to settle.
    ///
    /// Always returns `true` once all attempts have settled, matching the
    /// per-adapter contract; callers needing per-item outcomes use
    /// [`delete_many_outcomes`](Self::delete_many_outcomes).
    pub async fn delete_many_by_url(&self, urls: &[String]) -> bool {
        let outcomes = self.delete_many_outcomes(urls).await;
        let failed = outcomes.iter().filter(|ok| !**ok).count();
        if failed > 0 {
            tracing::warn!(
                total = urls.len(),
                failed = failed,
                "Batch delete settled with failures"
            );
        }
        true
    }

    /// Issue a pre-signed upload credential for `destination`.
    ///
    /// Biased to the secondary backend: client-direct uploads land on Spaces
    /// when it is configured, the primary otherwise.
    pub async fn issue_upload_credential(
        &self,
        destination: &str,
        expires_in: Duration,
    ) -> StorageResult<String> {
        let backend = match &self.secondary {
            Some(secondary) => secondary.clone(),
            None => self.primary.clone(),
        };
        backend.issue_upload_credential(destination, expires_in).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gcs::gcs_public_url;
    use crate::spaces::spaces_public_url;
    use crate::traits::{ByteStream, PutOverrides};
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct MockBackend {
        kind: BackendKind,
        deletes: AtomicUsize,
        delete_result: bool,
    }

    impl MockBackend {
        fn new(kind: BackendKind) -> Arc<Self> {
            Arc::new(MockBackend {
                kind,
                deletes: AtomicUsize::new(0),
                delete_result: true,
            })
        }
    }

    #[async_trait]
    impl ObjectBackend for MockBackend {
        async fn store_from_path(
            &self,
            _local_path: &Path,
            destination: &str,
            _overrides: Option<PutOverrides>,
        ) -> StorageResult<String> {
            Ok(format!("https://example.invalid/{destination}"))
        }

        async fn store_from_url(
            &self,
            _source_url: &str,
            destination: &str,
            _overrides: Option<PutOverrides>,
        ) -> StorageResult<String> {
            Ok(format!("https://example.invalid/{destination}"))
        }

        async fn store_from_stream(
            &self,
            destination: &str,
            _stream: ByteStream,
            _content_length: Option<u64>,
            _overrides: Option<PutOverrides>,
        ) -> StorageResult<String> {
            Ok(format!("https://example.invalid/{destination}"))
        }

        async fn delete_by_url(&self, _url: &str) -> bool {
            self.deletes.fetch_add(1, Ordering::SeqCst);
            self.delete_result
        }

        async fn issue_upload_credential(
            &self,
            destination: &str,
            _expires_in: Duration,
        ) -> StorageResult<String> {
            Ok(format!(
                "https://{}.example.invalid/{destination}?X-Amz-Signature=mock",
                self.kind
            ))
        }

        fn kind(&self) -> BackendKind {
            self.kind
        }
    }

    /// Backend whose objects vanish on first delete: later deletes of the
    /// same URL report not-found as `false`.
    struct VanishingBackend {
        kind: BackendKind,
        deleted: std::sync::Mutex<std::collections::HashSet<String>>,
    }

    impl VanishingBackend {
        fn new(kind: BackendKind) -> Arc<Self> {
            Arc::new(VanishingBackend {
                kind,
                deleted: std::sync::Mutex::new(std::collections::HashSet::new()),
            })
        }
    }

    #[async_trait]
    impl ObjectBackend for VanishingBackend {
        async fn store_from_path(
            &self,
            _local_path: &Path,
            destination: &str,
            _overrides: Option<PutOverrides>,
        ) -> StorageResult<String> {
            Ok(format!("https://example.invalid/{destination}"))
        }

        async fn store_from_url(
            &self,
            _source_url: &str,
            destination: &str,
            _overrides: Option<PutOverrides>,
        ) -> StorageResult<String> {
            Ok(format!("https://example.invalid/{destination}"))
        }

        async fn store_from_stream(
            &self,
            destination: &str,
            _stream: ByteStream,
            _content_length: Option<u64>,
            _overrides: Option<PutOverrides>,
        ) -> StorageResult<String> {
            Ok(format!("https://example.invalid/{destination}"))
        }

        async fn delete_by_url(&self, url: &str) -> bool {
            self.deleted.lock().unwrap().insert(url.to_string())
        }

        async fn issue_upload_credential(
            &self,
            destination: &str,
            _expires_in: Duration,
        ) -> StorageResult<String> {
            Ok(format!("https://example.invalid/{destination}?sig=1"))
        }

        fn kind(&self) -> BackendKind {
            self.kind
        }
    }

    #[test]
    fn resolve_from_url_matches_known_hosts() {
        assert_eq!(
            StorageRouter::resolve_from_url(&gcs_public_url("media", "a/b.jpg")),
            BackendKind::Gcs
        );
        assert_eq!(
            StorageRouter::resolve_from_url(&spaces_public_url(
                "https://media.sgp1.digitaloceanspaces.com",
                "a/b.jpg"
            )),
            BackendKind::Spaces
        );
    }

    #[test]
    fn resolve_from_url_defaults_unknown_hosts_to_primary() {
        assert_eq!(
            StorageRouter::resolve_from_url("https://cdn.example.com/a/b.jpg"),
            BackendKind::Gcs
        );
        assert_eq!(
            StorageRouter::resolve_from_url("not a url"),
            BackendKind::Gcs
        );
    }

    #[test]
    fn select_for_write_degrades_without_secondary() {
        let router = StorageRouter::new(MockBackend::new(BackendKind::Gcs), None);
        assert_eq!(
            router.select_for_write(Some(BackendKind::Spaces)).kind(),
            BackendKind::Gcs
        );
    }

    #[test]
    fn select_for_write_honors_explicit_selector() {
        let router = StorageRouter::new(
            MockBackend::new(BackendKind::Gcs),
            Some(MockBackend::new(BackendKind::Spaces)),
        );
        assert_eq!(router.select_for_write(None).kind(), BackendKind::Gcs);
        assert_eq!(
            router.select_for_write(Some(BackendKind::Spaces)).kind(),
            BackendKind::Spaces
        );
        assert_eq!(
            router.select_for_write(Some(BackendKind::Gcs)).kind(),
            BackendKind::Gcs
        );
    }

    #[tokio::test]
    async fn delete_many_spans_both_backends() {
        let gcs = MockBackend::new(BackendKind::Gcs);
        let spaces = MockBackend::new(BackendKind::Spaces);
        let router = StorageRouter::new(gcs.clone(), Some(spaces.clone()));

        let urls = vec![
            gcs_public_url("media", "a.jpg"),
            spaces_public_url("https://media.sgp1.digitaloceanspaces.com", "b.jpg"),
            "https://cdn.example.com/c.jpg".to_string(),
        ];
        assert!(router.delete_many_by_url(&urls).await);
        // Unknown host falls back to primary.
        assert_eq!(gcs.deletes.load(Ordering::SeqCst), 2);
        assert_eq!(spaces.deletes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn delete_many_outcomes_reports_per_item_results() {
        let gcs = Arc::new(MockBackend {
            kind: BackendKind::Gcs,
            deletes: AtomicUsize::new(0),
            delete_result: false,
        });
        let spaces = MockBackend::new(BackendKind::Spaces);
        let router = StorageRouter::new(gcs, Some(spaces));

        let urls = vec![
            gcs_public_url("media", "gone.jpg"),
            spaces_public_url("https://media.sgp1.digitaloceanspaces.com", "b.jpg"),
        ];
        let outcomes = router.delete_many_outcomes(&urls).await;
        assert_eq!(outcomes, vec![false, true]);
        // The aggregate form still reports true after settling.
        assert!(router.delete_many_by_url(&urls).await);
    }

    #[tokio::test]
    async fn repeat_deletes_of_the_same_url_settle_false() {
        let backend = VanishingBackend::new(BackendKind::Gcs);
        let router = StorageRouter::new(backend, None);
        let url = gcs_public_url("media", "a.jpg");

        assert!(router.delete_by_url(&url).await);
        // The object is already gone: later deletes report false, never panic
        // or error.
        assert!(!router.delete_by_url(&url).await);
        assert!(!router.delete_by_url(&url).await);

        let outcomes = router.delete_many_outcomes(&[url.clone()]).await;
        assert_eq!(outcomes, vec![false]);
        // The aggregate form still settles true.
        assert!(router.delete_many_by_url(&[url]).await);
    }

    #[tokio::test]
    async fn upload_credentials_are_biased_to_secondary() {
        let router = StorageRouter::new(
            MockBackend::new(BackendKind::Gcs),
            Some(MockBackend::new(BackendKind::Spaces)),
        );
        let url = router
            .issue_upload_credential("event/medias/2024-9/a-1.png", Duration::from_secs(600))
            .await
            .unwrap();
        assert!(url.starts_with("https://spaces."));

        let primary_only = StorageRouter::new(MockBackend::new(BackendKind::Gcs), None);
        let url = primary_only
            .issue_upload_credential("event/medias/2024-9/a-1.png", Duration::from_secs(600))
            .await
            .unwrap();
        assert!(url.starts_with("https://gcs."));
    }
}
