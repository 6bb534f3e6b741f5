//! Mediagate Core Library
//!
//! This crate provides the configuration, backend identity enum, shared
//! constants, and string/token utilities that are shared across all
//! mediagate components.

pub mod backend;
pub mod config;
pub mod constants;
pub mod text;

// Re-export commonly used types
pub use backend::BackendKind;
pub use config::{Config, SpacesConfig};
pub use text::{random_token, remove_diacritics, slugify};
