//! File picker surface for the toolbar.

use crate::editing::AudioUploadEditing;
use sonora_core::{FilePayload, UploadId};
use sonora_document::EditorModel;
use tokio::sync::watch;

pub const UPLOAD_AUDIO_LABEL: &str = "Upload Audio";

/// Toolbar button that opens a file picker and uploads the chosen files.
#[derive(Debug, Clone)]
pub struct AudioUploadButton {
    label: String,
    accepted_type: String,
    allow_multiple_files: bool,
    enabled: watch::Receiver<bool>,
}

impl AudioUploadButton {
    pub fn new<M: EditorModel>(editing: &AudioUploadEditing<M>) -> Self {
        let policy = editing.policy();
        Self {
            label: UPLOAD_AUDIO_LABEL.to_string(),
            accepted_type: policy.accept_attribute(),
            allow_multiple_files: policy.allow_multiple_files(),
            enabled: editing.subscribe_enabled(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// `accept` filter of the picker, e.g. `audio/mp3,audio/wav`
    pub fn accepted_type(&self) -> &str {
        &self.accepted_type
    }

    pub fn allow_multiple_files(&self) -> bool {
        self.allow_multiple_files
    }

    pub fn is_enabled(&self) -> bool {
        *self.enabled.borrow()
    }

    /// Wait until the enabled state changes. `None` once the editing context
    /// is gone.
    pub async fn enabled_changed(&mut self) -> Option<bool> {
        self.enabled.changed().await.ok()?;
        Some(*self.enabled.borrow_and_update())
    }

    /// Picker callback: upload what the user chose.
    pub fn on_done<M: EditorModel>(&self, editing: &mut AudioUploadEditing<M>, files: Vec<FilePayload>) -> Vec<UploadId> {
        if files.is_empty() {
            return Vec::new();
        }
        editing.execute_upload(files)
    }
}
