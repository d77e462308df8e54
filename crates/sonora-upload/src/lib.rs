//! Sonora Upload Library
//!
//! The audio upload pipeline: accepting files, creating placeholders in the
//! document, tracking in-flight uploads, projecting progress, and reconciling
//! asynchronous completion with a concurrently edited document.
//!
//! # Flow
//!
//! picker / paste / drop → [`UploadCommand`] validates and inserts placeholders
//! → one [`UploadTracker`] per file drives the `FileUploader` → progress and
//! completion come back as [`UploadMessage`]s → [`ProgressPresenter`] updates
//! the placeholder, and on completion [`UploadCommand`] commits the final state.
//! [`AudioUploadEditing`] ties it together.

pub mod attributes;
pub mod clipboard;
pub mod command;
pub mod editing;
pub mod presenter;
pub mod repository;
pub mod resolver;
pub mod tracker;
pub mod ui;

// Re-export commonly used types
pub use clipboard::DataTransfer;
pub use command::{PendingUpload, UploadCommand};
pub use editing::{AudioUploadEditing, UploadEvent, UploadMessage, UploaderEvent};
pub use presenter::ProgressPresenter;
pub use repository::{TaskHandle, UploadRepository};
pub use resolver::{
    audios_in_subtree, is_local_reference, BlobStore, FetchedMedia, LocalFetcher,
    LocalMediaResolver, MediaFetcher,
};
pub use tracker::{TrackerChange, TrackerInput, UploadTracker};
pub use ui::AudioUploadButton;
