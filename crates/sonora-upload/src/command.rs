//! The upload command: validates files, inserts placeholders, and commits
//! terminal upload states to the document.

use crate::attributes::{
    find_placeholder, CONTROLS, SRC, STATUS_ERROR, UPLOAD_ERROR, UPLOAD_ID, UPLOAD_PROGRESS,
    UPLOAD_STATUS,
};
use sonora_core::{AcceptancePolicy, FilePayload, UploadId};
use sonora_document::schema::AUDIO;
use sonora_document::{
    find_optimal_insertion_position, insertion_parent, DocumentResult, EditorModel, NewElement,
    NodeId, Position, Selection,
};
use std::sync::Arc;

/// A placeholder created for one accepted file.
#[derive(Debug, Clone)]
pub struct PendingUpload {
    pub id: UploadId,
    pub placeholder: NodeId,
    pub file: FilePayload,
}

#[derive(Debug, Clone)]
pub struct UploadCommand {
    policy: Arc<AcceptancePolicy>,
}

impl UploadCommand {
    pub fn new(policy: Arc<AcceptancePolicy>) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &AcceptancePolicy {
        &self.policy
    }

    /// Whether an audio element can be inserted at the current selection.
    pub fn is_enabled<M: EditorModel>(&self, model: &M) -> bool {
        let selection = model.selection();
        if selection
            .selected_element()
            .is_some_and(|node| model.is_object(node))
        {
            return false;
        }

        let focus = model.selection_focus();
        if model
            .ancestors_and_self(focus.parent)
            .into_iter()
            .any(|node| model.is_named(node, AUDIO))
        {
            return false;
        }

        let position = find_optimal_insertion_position(model);
        model.check_child(insertion_parent(model, position), AUDIO)
    }

    /// Insert one placeholder per accepted file.
    ///
    /// Does nothing while the command is disabled. Unsupported files are
    /// dropped before any placeholder exists.
    pub fn execute<M: EditorModel>(&self, model: &mut M, files: Vec<FilePayload>) -> Vec<PendingUpload> {
        if !self.is_enabled(model) {
            tracing::debug!(files = files.len(), "Audio upload not allowed at the current selection");
            return Vec::new();
        }

        let mut pending = Vec::new();
        for file in self.policy.select(files) {
            let id = UploadId::new();
            match insert_placeholder(model, id) {
                Ok(placeholder) => {
                    tracing::debug!(
                        upload_id = %id,
                        file_name = %file.name,
                        mime_type = %file.mime_type,
                        "Inserted audio placeholder"
                    );
                    pending.push(PendingUpload {
                        id,
                        placeholder,
                        file,
                    });
                }
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        file_name = %file.name,
                        "Failed to insert audio placeholder"
                    );
                }
            }
        }
        pending
    }

    /// Point the placeholder of `id` at its uploaded resource.
    ///
    /// Returns `false` when the placeholder is gone.
    pub fn complete<M: EditorModel>(&self, model: &mut M, id: UploadId, locator: &str) -> DocumentResult<bool> {
        let Some(node) = find_placeholder(model, id) else {
            return Ok(false);
        };
        model.change(|m| {
            m.set_attribute(node, SRC, locator)?;
            clear_upload_attributes(m, node)?;
            m.set_selection(Selection::On(node))
        })?;
        Ok(true)
    }

    /// Leave the placeholder of `id` in a visible error state.
    pub fn fail<M: EditorModel>(&self, model: &mut M, id: UploadId, reason: &str) -> DocumentResult<bool> {
        let Some(node) = find_placeholder(model, id) else {
            return Ok(false);
        };
        model.change(|m| {
            m.set_attribute(node, UPLOAD_STATUS, STATUS_ERROR)?;
            m.set_attribute(node, UPLOAD_ERROR, reason)?;
            m.remove_attribute(node, UPLOAD_ID)?;
            m.remove_attribute(node, UPLOAD_PROGRESS)
        })?;
        Ok(true)
    }

    /// Remove the placeholder of a cancelled upload, if still present.
    pub fn discard<M: EditorModel>(&self, model: &mut M, id: UploadId) -> DocumentResult<bool> {
        let Some(node) = find_placeholder(model, id) else {
            return Ok(false);
        };
        model.change(|m| m.remove(node))?;
        Ok(true)
    }
}

/// Remove every upload marker from `node`.
pub(crate) fn clear_upload_attributes<M: EditorModel>(model: &mut M, node: NodeId) -> DocumentResult<()> {
    for key in [UPLOAD_ID, UPLOAD_STATUS, UPLOAD_PROGRESS, UPLOAD_ERROR] {
        model.remove_attribute(node, key)?;
    }
    Ok(())
}

/// Insert the placeholder of `id` at the optimal position and select it.
fn insert_placeholder<M: EditorModel>(model: &mut M, id: UploadId) -> DocumentResult<NodeId> {
    let element = NewElement::new(AUDIO)
        .with_attribute(CONTROLS, CONTROLS)
        .with_attribute(UPLOAD_ID, id.to_string());

    model.change(|m| {
        let position = find_optimal_insertion_position(m);
        let node = insert_widget(m, element, position)?;
        m.set_selection(Selection::On(node))?;
        Ok(node)
    })
}

/// Insert at `position`; an empty non-root parent is replaced by the widget.
fn insert_widget<M: EditorModel>(model: &mut M, element: NewElement, position: Position) -> DocumentResult<NodeId> {
    let parent = position.parent;
    if model.is_empty(parent) && !model.is_root(parent) {
        if let Some(before) = model.position_before(parent) {
            let node = model.insert_element(element, before)?;
            model.remove(parent)?;
            return Ok(node);
        }
    }
    model.insert_element(element, position)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sonora_document::schema::{BLOCK_QUOTE, PARAGRAPH};
    use sonora_document::{MemoryDocument, Schema};

    fn command(types: &[&str], allow_multiple_files: bool) -> UploadCommand {
        UploadCommand::new(Arc::new(
            AcceptancePolicy::new(types.iter().copied(), allow_multiple_files).unwrap(),
        ))
    }

    fn empty_doc() -> MemoryDocument {
        MemoryDocument::with_empty_paragraph(Arc::new(Schema::with_audio()))
    }

    fn wav(name: &str) -> FilePayload {
        FilePayload::new(name, "audio/wav", vec![1u8, 2, 3])
    }

    #[test]
    fn test_execute_replaces_empty_paragraph() {
        let mut doc = empty_doc();
        let pending = command(&["mp3", "wav"], true).execute(&mut doc, vec![wav("a.wav")]);

        assert_eq!(pending.len(), 1);
        let root_children = doc.children(doc.root()).to_vec();
        assert_eq!(root_children, vec![pending[0].placeholder]);
        assert_eq!(doc.selection(), Selection::On(pending[0].placeholder));
        assert_eq!(
            doc.attribute(pending[0].placeholder, UPLOAD_ID),
            Some(pending[0].id.to_string().as_str())
        );
        assert_eq!(doc.attribute(pending[0].placeholder, CONTROLS), Some("controls"));
    }

    #[test]
    fn test_execute_multiple_files_in_order() {
        let mut doc = empty_doc();
        let pending = command(&["wav"], true).execute(&mut doc, vec![wav("a.wav"), wav("b.wav"), wav("c.wav")]);

        let placeholders: Vec<_> = pending.iter().map(|p| p.placeholder).collect();
        assert_eq!(doc.children(doc.root()), placeholders.as_slice());
        let names: Vec<_> = pending.iter().map(|p| p.file.name.as_str()).collect();
        assert_eq!(names, vec!["a.wav", "b.wav", "c.wav"]);
    }

    #[test]
    fn test_execute_single_file_mode() {
        let mut doc = empty_doc();
        let pending = command(&["wav"], false).execute(&mut doc, vec![wav("a.wav"), wav("b.wav"), wav("c.wav")]);
        assert_eq!(pending.len(), 1);
        assert_eq!(doc.children(doc.root()).len(), 1);
    }

    #[test]
    fn test_execute_rejects_unsupported_type_without_touching_document() {
        let mut doc = empty_doc();
        let before = doc.render_html();
        let version = doc.version();

        let pending = command(&["mp3", "wav"], true)
            .execute(&mut doc, vec![FilePayload::new("a.ogg", "audio/ogg", vec![1u8])]);

        assert!(pending.is_empty());
        assert_eq!(doc.render_html(), before);
        assert_eq!(doc.version(), version);
    }

    #[test]
    fn test_disabled_when_object_selected() {
        let mut doc = empty_doc();
        let cmd = command(&["wav"], true);
        assert!(cmd.is_enabled(&doc));
        cmd.execute(&mut doc, vec![wav("a.wav")]);
        assert!(!cmd.is_enabled(&doc));
        assert!(cmd.execute(&mut doc, vec![wav("b.wav")]).is_empty());
    }

    #[test]
    fn test_disabled_when_focus_inside_audio() {
        let mut doc = MemoryDocument::new(Arc::new(Schema::with_audio()));
        let audio = doc
            .insert_element(NewElement::new(AUDIO), Position::new(doc.root(), 0))
            .unwrap();
        doc.set_selection(Selection::Collapsed(Position::new(audio, 0)))
            .unwrap();
        assert!(!command(&["wav"], true).is_enabled(&doc));
    }

    #[test]
    fn test_disabled_when_schema_forbids_audio() {
        let mut schema = Schema::with_audio();
        schema.register(
            BLOCK_QUOTE,
            sonora_document::SchemaItem::default().allow_in(sonora_document::schema::ROOT),
        );
        schema.register(
            PARAGRAPH,
            sonora_document::SchemaItem::default()
                .allow_in(BLOCK_QUOTE)
                .allow_content_of(sonora_document::schema::BLOCK)
                .block(),
        );
        let mut doc = MemoryDocument::new(Arc::new(schema));
        let quote = doc
            .insert_element(NewElement::new(BLOCK_QUOTE), Position::new(doc.root(), 0))
            .unwrap();
        let paragraph = doc
            .insert_element(NewElement::new(PARAGRAPH), Position::new(quote, 0))
            .unwrap();
        doc.insert_text("text", Position::new(paragraph, 0)).unwrap();
        doc.set_selection(Selection::Collapsed(Position::new(paragraph, 0)))
            .unwrap();

        assert!(!command(&["wav"], true).is_enabled(&doc));
    }

    #[test]
    fn test_commit_states() {
        let mut doc = empty_doc();
        let cmd = command(&["wav"], true);
        let pending = cmd.execute(&mut doc, vec![wav("a.wav")]).remove(0);
        doc.set_attribute(pending.placeholder, UPLOAD_PROGRESS, "0.70").unwrap();

        assert!(cmd.complete(&mut doc, pending.id, "https://cdn/a1.wav").unwrap());
        assert_eq!(doc.attribute(pending.placeholder, SRC), Some("https://cdn/a1.wav"));
        assert_eq!(doc.attribute(pending.placeholder, UPLOAD_PROGRESS), None);
        assert_eq!(doc.attribute(pending.placeholder, UPLOAD_ID), None);

        // The placeholder no longer carries its id, so later commits miss
        assert!(!cmd.fail(&mut doc, pending.id, "late").unwrap());
        assert!(!cmd.discard(&mut doc, pending.id).unwrap());
        assert!(doc.contains(pending.placeholder));
    }

    #[test]
    fn test_fail_keeps_placeholder() {
        let mut doc = empty_doc();
        let cmd = command(&["wav"], true);
        let pending = cmd.execute(&mut doc, vec![wav("a.wav")]).remove(0);

        assert!(cmd.fail(&mut doc, pending.id, "HTTP 500").unwrap());
        assert_eq!(doc.attribute(pending.placeholder, UPLOAD_STATUS), Some(STATUS_ERROR));
        assert_eq!(doc.attribute(pending.placeholder, UPLOAD_ERROR), Some("HTTP 500"));
        assert_eq!(doc.attribute(pending.placeholder, UPLOAD_ID), None);
    }

    #[test]
    fn test_discard_removes_placeholder() {
        let mut doc = empty_doc();
        let cmd = command(&["wav"], true);
        let pending = cmd.execute(&mut doc, vec![wav("a.wav")]).remove(0);

        assert!(cmd.discard(&mut doc, pending.id).unwrap());
        assert!(!doc.contains(pending.placeholder));
    }
}
