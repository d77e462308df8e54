use crate::attributes::{find_placeholder, format_progress, STATUS_UPLOADING, UPLOAD_PROGRESS, UPLOAD_STATUS};
use crate::tracker::TrackerChange;
use sonora_core::UploadId;
use sonora_document::{DocumentResult, EditorModel};

/// Mirrors non-terminal tracker changes onto the placeholder.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProgressPresenter;

impl ProgressPresenter {
    /// Returns `false` when there was nothing to update (placeholder gone, or
    /// a terminal change, which the command commits).
    pub fn present<M: EditorModel>(&self, model: &mut M, id: UploadId, change: &TrackerChange) -> DocumentResult<bool> {
        let Some(node) = find_placeholder(model, id) else {
            return Ok(false);
        };

        match change {
            TrackerChange::Started => {
                model.change(|m| {
                    m.set_attribute(node, UPLOAD_STATUS, STATUS_UPLOADING)?;
                    m.set_attribute(node, UPLOAD_PROGRESS, &format_progress(0.0))
                })?;
                Ok(true)
            }
            TrackerChange::Progress(ratio) => {
                model.set_attribute(node, UPLOAD_PROGRESS, &format_progress(*ratio))?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
