//! Mediagate Services Layer
//!
//! This crate is the business service layer: the upload orchestrator (stage →
//! compress → store → cleanup, with optional cross-environment delegation)
//! and the credential issuer for client-direct uploads. Thin HTTP handling
//! lives in the surrounding gateway process, not here.

pub mod signing;
pub mod upload;

pub use mediagate_core::{BackendKind, Config, SpacesConfig};
pub use mediagate_storage::{
    ByteStream, ObjectBackend, PutOverrides, StorageError, StorageResult, StorageRouter,
};
pub use signing::{CredentialIssuer, SignedUpload};
pub use upload::UploadService;
