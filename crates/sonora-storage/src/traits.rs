//! Uploader abstraction trait
//!
//! This module defines the FileUploader trait that all uploader backends must
//! implement.

use crate::UploaderBackend;
use async_trait::async_trait;
use sonora_core::FilePayload;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Uploader operation errors
#[derive(Debug, Error)]
pub enum UploaderError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Upload rejected: {0}")]
    Rejected(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Uploader backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for uploader operations
pub type UploaderResult<T> = Result<T, UploaderError>;

/// Sink for upload progress, as a ratio in `[0, 1]`.
///
/// Backends call it from whatever task performs the transfer; the receiving
/// side is responsible for marshalling the value onto its own context.
#[derive(Clone)]
pub struct ProgressReporter {
    sink: Arc<dyn Fn(f64) + Send + Sync>,
}

impl ProgressReporter {
    pub fn new<F>(sink: F) -> Self
    where
        F: Fn(f64) + Send + Sync + 'static,
    {
        Self {
            sink: Arc::new(sink),
        }
    }

    /// Reporter that drops every update
    pub fn noop() -> Self {
        Self::new(|_| {})
    }

    pub fn report(&self, ratio: f64) {
        (self.sink)(ratio.clamp(0.0, 1.0));
    }

    pub fn report_bytes(&self, sent: u64, total: u64) {
        if total == 0 {
            self.report(1.0);
        } else {
            self.report(sent as f64 / total as f64);
        }
    }
}

impl fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressReporter").finish_non_exhaustive()
    }
}

/// Uploader abstraction trait
///
/// All uploader backends (local directory, HTTP endpoint) must implement this
/// trait. The upload pipeline only ever talks to `dyn FileUploader`.
#[async_trait]
pub trait FileUploader: Send + Sync {
    /// Upload `file` and return its final resource locator.
    ///
    /// The locator is opaque to the pipeline; it ends up as the `src` of the
    /// audio element. Dropping the returned future aborts the transfer, which
    /// is how cancellation reaches the backend.
    async fn upload(&self, file: FilePayload, progress: ProgressReporter) -> UploaderResult<String>;

    /// Get the uploader backend type
    fn backend_type(&self) -> UploaderBackend;
}
