//! Mediagate Storage Library
//!
//! This crate provides the storage abstraction and backend implementations
//! for the gateway. It includes the [`ObjectBackend`] trait, the Google Cloud
//! Storage and DigitalOcean Spaces adapters, and the [`StorageRouter`] that
//! resolves which backend owns an object.
//!
//! # Public URLs as identity
//!
//! No object metadata is stored anywhere; the public URL is the sole source
//! of truth for an object's location. Each backend constructs URLs with a
//! fixed, reversible shape:
//!
//! - **GCS**: `https://storage.googleapis.com/{bucket}/{key}` (bucket in the
//!   path)
//! - **Spaces**: `{bucket_domain}/{key}` with a virtual-hosted bucket domain
//!   (bucket in the host)
//!
//! The router recovers the owning backend from the URL host and each adapter
//! recovers the bucket/key pair from its own shape.

pub(crate) mod common;
pub mod gcs;
pub mod router;
pub mod spaces;
pub mod traits;

// Re-export commonly used types
pub use gcs::GcsBackend;
pub use mediagate_core::BackendKind;
pub use router::StorageRouter;
pub use spaces::SpacesBackend;
pub use traits::{ByteStream, ObjectBackend, PutOverrides, StorageError, StorageResult};
