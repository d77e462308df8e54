//! Attributes the pipeline keeps on `audio` elements.

use sonora_core::UploadId;
use sonora_document::schema::AUDIO;
use sonora_document::{EditorModel, NodeId};

pub const SRC: &str = "src";
pub const CONTROLS: &str = "controls";
pub const UPLOAD_ID: &str = "uploadId";
pub const UPLOAD_STATUS: &str = "uploadStatus";
pub const UPLOAD_PROGRESS: &str = "uploadProgress";
pub const UPLOAD_ERROR: &str = "uploadError";

pub const STATUS_READING: &str = "reading";
pub const STATUS_UPLOADING: &str = "uploading";
pub const STATUS_ERROR: &str = "error";

/// Placeholder of upload `id`, if it is still in the document.
pub fn find_placeholder<M: EditorModel>(model: &M, id: UploadId) -> Option<NodeId> {
    model
        .find_by_attribute(UPLOAD_ID, &id.to_string())
        .filter(|node| model.is_named(*node, AUDIO))
}

/// Progress ratio as stored in `uploadProgress`
pub fn format_progress(ratio: f64) -> String {
    format!("{:.2}", ratio)
}
