//! Configuration module
//!
//! Deployment configuration for the gateway: backend credentials and bucket
//! names, the scratch directory, and the peer-delegation endpoints. The
//! configuration is built once at process start and injected read-only into
//! the adapters and services; nothing here mutates after construction.

use std::env;
use std::path::PathBuf;

const DEFAULT_SCRATCH_DIR: &str = "./upload";

/// DigitalOcean Spaces (secondary backend) settings.
///
/// `bucket_domain` is the public virtual-hosted origin of the bucket, e.g.
/// `https://my-bucket.sgp1.digitaloceanspaces.com`; stored object URLs are
/// `{bucket_domain}/{key}`.
#[derive(Clone, Debug)]
pub struct SpacesConfig {
    pub endpoint: String,
    pub region: String,
    pub access_key: String,
    pub secret_key: String,
    pub bucket: String,
    pub bucket_domain: String,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    pub environment: String,
    /// Local directory for transient staging files (created on demand).
    pub scratch_dir: PathBuf,
    /// Primary backend bucket (Google Cloud Storage).
    pub gcs_bucket: String,
    /// Secondary backend; `None` degrades the router to primary-only writes.
    pub spaces: Option<SpacesConfig>,
    /// Peer gateway base URLs used for cross-environment upload delegation.
    pub peer_gateways: Vec<String>,
    /// Shared credential echoed to peer gateways on delegated uploads.
    pub peer_upload_credential: String,
}

impl Config {
    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let spaces_bucket = env::var("SPACES_BUCKET").ok().filter(|s| !s.is_empty());
        let spaces = spaces_bucket.map(|bucket| SpacesConfig {
            endpoint: env::var("SPACES_ENDPOINT").unwrap_or_default(),
            region: env::var("SPACES_REGION").unwrap_or_default(),
            access_key: env::var("SPACES_KEY").unwrap_or_default(),
            secret_key: env::var("SPACES_SECRET").unwrap_or_default(),
            bucket,
            bucket_domain: env::var("SPACES_BUCKET_DOMAIN").unwrap_or_default(),
        });

        let peer_gateways = env::var("PEER_GATEWAYS")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().trim_end_matches('/').to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let config = Config {
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            scratch_dir: env::var("SCRATCH_DIR")
                .unwrap_or_else(|_| DEFAULT_SCRATCH_DIR.to_string())
                .into(),
            gcs_bucket: env::var("GCS_BUCKET").unwrap_or_default(),
            spaces,
            peer_gateways,
            peer_upload_credential: env::var("PEER_UPLOAD_CREDENTIAL").unwrap_or_default(),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.gcs_bucket.is_empty() {
            anyhow::bail!("GCS_BUCKET not configured");
        }

        if let Some(spaces) = &self.spaces {
            if spaces.endpoint.is_empty() {
                anyhow::bail!("SPACES_ENDPOINT not configured");
            }
            if spaces.region.is_empty() {
                anyhow::bail!("SPACES_REGION not configured");
            }
            if spaces.access_key.is_empty() || spaces.secret_key.is_empty() {
                anyhow::bail!("SPACES_KEY / SPACES_SECRET not configured");
            }
            if spaces.bucket_domain.is_empty() {
                anyhow::bail!("SPACES_BUCKET_DOMAIN not configured");
            }
        }

        Ok(())
    }
}
