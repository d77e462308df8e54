//! Error types module
//!
//! This module provides the error kinds of the audio upload pipeline. Nothing
//! here is fatal to the host editor: every failure either degrades to a
//! visible, recoverable document state or is dropped with a log line.

use crate::models::UploadId;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected rejections like unsupported files
    Debug,
    /// Warning level - for recoverable issues like failed fetches
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata describing how an error should be reported
pub trait ErrorMetadata {
    /// Machine-readable error code (e.g., "UNSUPPORTED_TYPE")
    fn error_code(&self) -> &'static str;

    /// Whether the user can recover from this error (retry, remove, ...)
    fn is_recoverable(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

/// Emit `error` through `tracing` at the level it asks for.
pub fn log_error<E>(error: &E, context: &str)
where
    E: ErrorMetadata + std::fmt::Display,
{
    let code = error.error_code();
    match error.log_level() {
        LogLevel::Debug => tracing::debug!(error = %error, code, "{}", context),
        LogLevel::Warn => tracing::warn!(error = %error, code, "{}", context),
        LogLevel::Error => tracing::error!(error = %error, code, "{}", context),
    }
}

/// Errors raised while resolving embedded media back into a file payload
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Not a local media reference: {0}")]
    NotLocal(String),

    #[error("Malformed data URI: {0}")]
    MalformedDataUri(String),

    #[error("Resource unreachable: {0}")]
    Unreachable(String),

    #[error("Transfer failed: {0}")]
    Transfer(String),
}

impl ErrorMetadata for FetchError {
    fn error_code(&self) -> &'static str {
        match self {
            FetchError::NotLocal(_) => "NOT_LOCAL_MEDIA",
            FetchError::MalformedDataUri(_) => "MALFORMED_DATA_URI",
            FetchError::Unreachable(_) => "MEDIA_UNREACHABLE",
            FetchError::Transfer(_) => "MEDIA_TRANSFER_FAILED",
        }
    }

    fn is_recoverable(&self) -> bool {
        false
    }

    fn log_level(&self) -> LogLevel {
        match self {
            FetchError::NotLocal(_) => LogLevel::Debug,
            _ => LogLevel::Warn,
        }
    }
}

/// Errors of the upload pipeline
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("Unsupported media type: {mime_type} (accepted: {accepted:?})")]
    UnsupportedType {
        mime_type: String,
        accepted: Vec<String>,
    },

    #[error("Local media fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Upload failed: {0}")]
    UploadFailure(String),

    #[error("Placeholder of upload {0} is no longer in the document")]
    OrphanedTask(UploadId),
}

impl ErrorMetadata for UploadError {
    fn error_code(&self) -> &'static str {
        match self {
            UploadError::UnsupportedType { .. } => "UNSUPPORTED_TYPE",
            UploadError::Fetch(e) => e.error_code(),
            UploadError::UploadFailure(_) => "UPLOAD_FAILURE",
            UploadError::OrphanedTask(_) => "ORPHANED_TASK",
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            UploadError::UnsupportedType { .. } => false,
            UploadError::Fetch(e) => e.is_recoverable(),
            // The placeholder stays in the document; the user retries or removes it
            UploadError::UploadFailure(_) => true,
            UploadError::OrphanedTask(_) => true,
        }
    }

    fn log_level(&self) -> LogLevel {
        match self {
            UploadError::UnsupportedType { .. } => LogLevel::Debug,
            UploadError::Fetch(e) => e.log_level(),
            UploadError::UploadFailure(_) => LogLevel::Warn,
            UploadError::OrphanedTask(_) => LogLevel::Debug,
        }
    }
}
