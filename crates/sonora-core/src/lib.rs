//! Sonora Core Library
//!
//! This crate provides the domain models, error types, configuration, and
//! media type matching shared by every Sonora component.

pub mod config;
pub mod error;
pub mod media_type;
pub mod models;
pub mod uploader_types;

// Re-export commonly used types
pub use config::{AudioUploadConfig, AudioUploadOverrides, Config, EditorConfig, SimpleUploadConfig};
pub use error::{ErrorMetadata, FetchError, LogLevel, UploadError};
pub use media_type::{MediaTypeError, MediaTypeMatcher};
pub use models::{AcceptancePolicy, FileInfo, FilePayload, UploadId, UploadOutcome, UploadPhase};
pub use uploader_types::UploaderBackend;
