//! Signed-upload credential issuance
//!
//! Clients that upload directly to object storage ask this service for a
//! pre-authorized PUT URL. The service derives the destination key from the
//! desired filename, so clients never pick their own keys.

use chrono::{DateTime, Datelike, Utc};
use futures::future::join_all;
use mediagate_core::constants::{DEFAULT_SIGNED_URL_EXPIRY_SECS, MEDIA_KEY_PREFIX};
use mediagate_core::slugify;
use mediagate_storage::{StorageResult, StorageRouter};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

/// A single issued upload grant.
#[derive(Debug, Clone, Serialize)]
pub struct SignedUpload {
    /// Pre-authorized PUT URL, valid until expiry.
    pub signed_url: String,
    /// Where the object will be readable once the client has uploaded it.
    pub public_url: String,
    /// The filename the grant was requested for, echoed back verbatim.
    pub filename: String,
}

/// Issues pre-authorized upload URLs through the router's signing backend.
pub struct CredentialIssuer {
    router: Arc<StorageRouter>,
}

impl CredentialIssuer {
    pub fn new(router: Arc<StorageRouter>) -> Self {
        CredentialIssuer { router }
    }

    /// Issue one signed PUT URL for `filename`.
    ///
    /// The destination key is `event/medias/<year>-<month>/<slug>-<millis>.<ext>`,
    /// so repeated requests for the same filename land on distinct objects.
    pub async fn issue_signed_upload_url(&self, filename: &str) -> StorageResult<SignedUpload> {
        let key = build_media_key(filename, Utc::now());
        let signed_url = self
            .router
            .issue_upload_credential(&key, Duration::from_secs(DEFAULT_SIGNED_URL_EXPIRY_SECS))
            .await?;
        let public_url = signed_url
            .split_once('?')
            .map(|(base, _)| base.to_string())
            .unwrap_or_else(|| signed_url.clone());

        Ok(SignedUpload {
            signed_url,
            public_url,
            filename: filename.to_string(),
        })
    }

    /// Issue signed URLs for a batch of filenames.
    ///
    /// Duplicate names are collapsed before signing. Best effort: names that
    /// fail to sign are logged and omitted from the result.
    pub async fn issue_signed_upload_urls(&self, filenames: &[String]) -> Vec<SignedUpload> {
        let unique: HashSet<&str> = filenames.iter().map(String::as_str).collect();
        let results = join_all(
            unique
                .into_iter()
                .map(|filename| self.issue_signed_upload_url(filename)),
        )
        .await;

        results
            .into_iter()
            .filter_map(|result| match result {
                Ok(grant) => Some(grant),
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to issue upload credential");
                    None
                }
            })
            .collect()
    }
}

/// Derive a storage key from a client-supplied filename.
///
/// The stem is slugified (diacritics stripped, lowercased, hyphenated) and
/// the extension carried over unchanged. Files are grouped into one folder
/// per calendar month.
fn build_media_key(filename: &str, now: DateTime<Utc>) -> String {
    let (stem, ext) = match filename.rsplit_once('.') {
        Some((stem, ext)) => (stem, ext),
        None => (filename, ""),
    };
    let slug = slugify(stem);
    let mut key = format!(
        "{}/{}-{}/{}-{}",
        MEDIA_KEY_PREFIX,
        now.year(),
        now.month(),
        slug,
        now.timestamp_millis()
    );
    if !ext.is_empty() {
        key.push('.');
        key.push_str(ext);
    }
    key
}
