use sonora_core::{AcceptancePolicy, FilePayload};
use sonora_document::schema::AUDIO;
use sonora_document::{EditorModel, MemoryDocument, NodeId, Schema};
use sonora_storage::FileUploader;
use sonora_upload::{AudioUploadEditing, LocalMediaResolver};
use std::sync::Arc;

pub const CDN: &str = "https://cdn/";

pub fn policy(types: &[&str], allow_multiple_files: bool) -> Arc<AcceptancePolicy> {
    Arc::new(
        AcceptancePolicy::new(types.iter().copied(), allow_multiple_files)
            .expect("Failed to build acceptance policy"),
    )
}

/// Editing context over a document holding one empty paragraph
pub fn editing(
    uploader: Arc<dyn FileUploader>,
    types: &[&str],
    allow_multiple_files: bool,
) -> AudioUploadEditing<MemoryDocument> {
    editing_with(
        MemoryDocument::with_empty_paragraph(Arc::new(Schema::with_audio())),
        uploader,
        types,
        allow_multiple_files,
        LocalMediaResolver::default(),
    )
}

pub fn editing_with(
    model: MemoryDocument,
    uploader: Arc<dyn FileUploader>,
    types: &[&str],
    allow_multiple_files: bool,
    resolver: LocalMediaResolver,
) -> AudioUploadEditing<MemoryDocument> {
    AudioUploadEditing::new(model, policy(types, allow_multiple_files), uploader, resolver)
}

pub fn audio_file(name: &str, mime_type: &str) -> FilePayload {
    FilePayload::new(name, mime_type, vec![0u8; 32])
}

pub fn audio_elements(doc: &MemoryDocument) -> Vec<NodeId> {
    doc.subtree(doc.root())
        .into_iter()
        .filter(|node| doc.is_named(*node, AUDIO))
        .collect()
}
