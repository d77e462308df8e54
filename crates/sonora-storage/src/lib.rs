//! Sonora Storage Library
//!
//! This crate provides the `FileUploader` abstraction (the collaborator that
//! moves bytes over the wire) and its backends: a local directory served under
//! a base URL, and an HTTP simple-upload endpoint.
//!
//! # Storage key format
//!
//! Keys are `audio/{uuid}-{filename}`. Keys must not contain `..` or a leading
//! `/`. Key generation is centralized in the `keys` module so all backends stay
//! consistent.

pub mod factory;
#[cfg(feature = "uploader-local")]
pub(crate) mod keys;
#[cfg(feature = "uploader-http")]
pub mod http;
#[cfg(feature = "uploader-local")]
pub mod local;
pub mod traits;

// Re-export commonly used types
pub use factory::create_uploader;
#[cfg(feature = "uploader-http")]
pub use http::HttpUploader;
#[cfg(feature = "uploader-local")]
pub use local::LocalUploader;
pub use sonora_core::UploaderBackend;
pub use traits::{FileUploader, ProgressReporter, UploaderError, UploaderResult};
