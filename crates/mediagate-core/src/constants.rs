//! Shared constants.

pub const BYTES_PER_MB: u64 = 1024 * 1024;

/// Cache directive applied to every stored object (7 days).
pub const STORED_OBJECT_CACHE_CONTROL: &str = "public, max-age=604800";

/// Default lifetime of a pre-signed upload credential, in seconds.
pub const DEFAULT_SIGNED_URL_EXPIRY_SECS: u64 = 600;

/// Extensions that go through the compression pipeline before storage.
/// Everything else is streamed to the backend untouched.
pub const COMPRESSIBLE_IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// Key prefix for client-direct uploads issued by the credential issuer.
pub const MEDIA_KEY_PREFIX: &str = "event/medias";

/// Length of the random token embedded in scratch filenames.
pub const SCRATCH_TOKEN_LEN: usize = 20;
