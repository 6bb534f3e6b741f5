//! Mediagate Processing Library
//!
//! Image compression for the upload path: a pure size→quality step function
//! and a mozjpeg re-encoder invoked by the orchestrator before storage.

pub mod compression;

pub use compression::{
    compress_jpeg, compress_to_file, is_compressible_extension, quality_for_size,
};
