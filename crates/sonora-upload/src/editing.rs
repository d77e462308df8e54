//! Audio upload editing
//!
//! [`AudioUploadEditing`] is the single place where upload state meets the
//! document. Uploads and local fetches run as spawned tasks; they never touch
//! the model, they only send [`UploadMessage`]s back over a channel. The
//! owner of the editing context drains that channel (`next_event`,
//! `drain_pending`, `run_until_idle`) and every message is applied here, in
//! order, on the owner's task.
//!
//! Placeholders are found by their `uploadId` attribute. When one disappears
//! (the user deleted it, undo, ...) its upload is cancelled, either eagerly by
//! [`AudioUploadEditing::reconcile`] or lazily when its next message arrives.

use crate::attributes::{find_placeholder, SRC, STATUS_READING, UPLOAD_ID, UPLOAD_STATUS};
use crate::clipboard::DataTransfer;
use crate::command::{clear_upload_attributes, PendingUpload, UploadCommand};
use crate::presenter::ProgressPresenter;
use crate::repository::{TaskHandle, UploadRepository};
use crate::resolver::{audios_in_subtree, is_local_reference, LocalMediaResolver};
use crate::tracker::{TrackerChange, TrackerInput, UploadTracker};
use futures::FutureExt;
use sonora_core::error::log_error;
use sonora_core::{AcceptancePolicy, FetchError, FilePayload, UploadError, UploadId};
use sonora_document::{EditorModel, NodeId};
use sonora_storage::{FileUploader, ProgressReporter, UploaderError};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

/// What an uploader reported for one upload.
#[derive(Debug, Clone, PartialEq)]
pub enum UploaderEvent {
    Progress(f64),
    Succeeded(String),
    Failed(String),
}

/// Message sent by a background task to the editing context.
#[derive(Debug)]
pub enum UploadMessage {
    Uploader {
        id: UploadId,
        event: UploaderEvent,
    },
    Resolved {
        id: UploadId,
        result: Result<FilePayload, FetchError>,
    },
}

impl UploadMessage {
    pub fn id(&self) -> UploadId {
        match self {
            UploadMessage::Uploader { id, .. } | UploadMessage::Resolved { id, .. } => *id,
        }
    }
}

/// Outcome of applying a message, for hosts that want to observe uploads.
#[derive(Debug, Clone, PartialEq)]
pub enum UploadEvent {
    Started { id: UploadId },
    Progress { id: UploadId, ratio: f64 },
    Succeeded { id: UploadId, locator: String },
    Failed { id: UploadId, reason: String },
    Cancelled { id: UploadId },
    /// Local media could not be read; the element was left as it was
    ResolveFailed { id: UploadId, reason: String },
}

impl UploadEvent {
    pub fn id(&self) -> UploadId {
        match self {
            UploadEvent::Started { id }
            | UploadEvent::Progress { id, .. }
            | UploadEvent::Succeeded { id, .. }
            | UploadEvent::Failed { id, .. }
            | UploadEvent::Cancelled { id }
            | UploadEvent::ResolveFailed { id, .. } => *id,
        }
    }
}

pub struct AudioUploadEditing<M: EditorModel> {
    model: M,
    command: UploadCommand,
    presenter: ProgressPresenter,
    uploader: Arc<dyn FileUploader>,
    resolver: LocalMediaResolver,
    uploads: UploadRepository,
    sender: mpsc::UnboundedSender<UploadMessage>,
    receiver: mpsc::UnboundedReceiver<UploadMessage>,
    enabled: watch::Sender<bool>,
}

impl<M: EditorModel> AudioUploadEditing<M> {
    pub fn new(
        model: M,
        policy: Arc<AcceptancePolicy>,
        uploader: Arc<dyn FileUploader>,
        resolver: LocalMediaResolver,
    ) -> Self {
        let command = UploadCommand::new(policy);
        let (sender, receiver) = mpsc::unbounded_channel();
        let (enabled, _) = watch::channel(command.is_enabled(&model));

        Self {
            model,
            command,
            presenter: ProgressPresenter,
            uploader,
            resolver,
            uploads: UploadRepository::new(),
            sender,
            receiver,
            enabled,
        }
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// Direct access to the model. Call [`Self::on_document_change`] after
    /// editing, or use [`Self::edit`] which does it for you.
    pub fn model_mut(&mut self) -> &mut M {
        &mut self.model
    }

    pub fn into_model(self) -> M {
        self.model
    }

    /// Run a host edit, then reconcile uploads with the new document.
    pub fn edit<R>(&mut self, edit: impl FnOnce(&mut M) -> R) -> R {
        let result = edit(&mut self.model);
        self.on_document_change();
        result
    }

    pub fn command(&self) -> &UploadCommand {
        &self.command
    }

    pub fn policy(&self) -> &AcceptancePolicy {
        self.command.policy()
    }

    pub fn uploads(&self) -> &UploadRepository {
        &self.uploads
    }

    pub fn tracker(&self, id: UploadId) -> Option<&UploadTracker> {
        self.uploads.get(id)
    }

    pub fn is_enabled(&self) -> bool {
        self.command.is_enabled(&self.model)
    }

    /// Signal that follows [`Self::is_enabled`] as the document changes.
    pub fn subscribe_enabled(&self) -> watch::Receiver<bool> {
        self.enabled.subscribe()
    }

    /// Upload `files` at the current selection.
    pub fn execute_upload(&mut self, files: Vec<FilePayload>) -> Vec<UploadId> {
        let pending = self.command.execute(&mut self.model, files);
        let ids = pending.iter().map(|p| p.id).collect();

        for PendingUpload { id, file, .. } in pending {
            self.uploads
                .insert(UploadTracker::new(id).with_file(file.info()));
            self.start_upload(id, file);
        }

        self.refresh_enabled();
        ids
    }

    /// Upload the audio files of a paste or drop that carries no markup.
    pub fn handle_clipboard_input(&mut self, data: DataTransfer) -> Vec<UploadId> {
        if data.is_html_included() {
            return Vec::new();
        }

        let files: Vec<FilePayload> = data
            .into_files()
            .into_iter()
            .filter(|file| self.command.policy().accepts(&file.mime_type))
            .collect();
        if files.is_empty() {
            return Vec::new();
        }

        self.execute_upload(files)
    }

    /// Re-upload every local `audio` inside freshly inserted content.
    ///
    /// Each element is marked as `reading` while its media is fetched; the
    /// upload starts once the fetch completes.
    pub fn upload_local_audios(&mut self, item: NodeId) -> Vec<UploadId> {
        let candidates: Vec<(NodeId, String)> = audios_in_subtree(&self.model, item)
            .into_iter()
            .filter(|node| self.model.attribute(*node, UPLOAD_ID).is_none())
            .filter_map(|node| {
                let src = self.model.attribute(node, SRC)?;
                is_local_reference(src).then(|| (node, src.to_string()))
            })
            .collect();

        let mut ids = Vec::with_capacity(candidates.len());
        for (node, src) in candidates {
            let id = UploadId::new();
            let marked = self.model.change(|m| {
                m.set_attribute(node, UPLOAD_ID, &id.to_string())?;
                m.set_attribute(node, UPLOAD_STATUS, STATUS_READING)
            });
            if let Err(e) = marked {
                tracing::warn!(error = %e, node = %node, "Failed to mark local audio for upload");
                continue;
            }

            self.uploads.insert(UploadTracker::new(id));
            self.spawn_resolve(id, src);
            ids.push(id);
        }
        ids
    }

    /// Apply one message from a background task.
    pub fn process(&mut self, message: UploadMessage) -> Option<UploadEvent> {
        let id = message.id();
        if !self.uploads.contains(id) {
            tracing::debug!(upload_id = %id, "Dropping message for a finished upload");
            return None;
        }

        if find_placeholder(&self.model, id).is_none() {
            let event = self.cancel_orphan(id);
            self.refresh_enabled();
            return event;
        }

        let event = match message {
            UploadMessage::Uploader { event, .. } => self.apply_uploader_event(id, event),
            UploadMessage::Resolved { result, .. } => self.apply_resolved(id, result),
        };
        self.refresh_enabled();
        event
    }

    /// Cancel every upload whose placeholder is no longer in the document.
    pub fn reconcile(&mut self) -> Vec<UploadId> {
        let orphaned: Vec<UploadId> = self
            .uploads
            .active_ids()
            .into_iter()
            .filter(|id| find_placeholder(&self.model, *id).is_none())
            .collect();

        for id in &orphaned {
            self.cancel_orphan(*id);
        }
        orphaned
    }

    /// Host hook for any document change.
    pub fn on_document_change(&mut self) -> Vec<UploadId> {
        let cancelled = self.reconcile();
        self.refresh_enabled();
        cancelled
    }

    /// Cancel an upload and remove its placeholder.
    pub fn cancel(&mut self, id: UploadId) -> bool {
        let accepted = self
            .uploads
            .get_mut(id)
            .and_then(|tracker| tracker.apply(TrackerInput::Cancel))
            .is_some();
        if !accepted {
            return false;
        }

        self.uploads.remove(id);
        if let Err(e) = self.command.discard(&mut self.model, id) {
            tracing::warn!(upload_id = %id, error = %e, "Failed to remove cancelled placeholder");
        }
        tracing::info!(upload_id = %id, "Audio upload cancelled");
        self.refresh_enabled();
        true
    }

    /// Wait for the next message that changes something.
    ///
    /// Returns `None` once no upload is in flight.
    pub async fn next_event(&mut self) -> Option<UploadEvent> {
        while !self.uploads.is_empty() {
            let message = self.receiver.recv().await?;
            if let Some(event) = self.process(message) {
                return Some(event);
            }
        }
        None
    }

    /// Apply every message already queued, without waiting.
    pub fn drain_pending(&mut self) -> Vec<UploadEvent> {
        let mut events = Vec::new();
        while let Ok(message) = self.receiver.try_recv() {
            if let Some(event) = self.process(message) {
                events.push(event);
            }
        }
        events
    }

    /// Drive uploads until none is in flight.
    pub async fn run_until_idle(&mut self) -> Vec<UploadEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.next_event().await {
            events.push(event);
        }
        events
    }

    fn start_upload(&mut self, id: UploadId, file: FilePayload) -> Option<UploadEvent> {
        let tracker = self.uploads.get_mut(id)?;
        tracker.set_file(file.info());
        let change = tracker.apply(TrackerInput::Start)?;
        self.present(id, &change);

        tracing::info!(
            upload_id = %id,
            file_name = %file.name,
            mime_type = %file.mime_type,
            size_bytes = file.size(),
            backend = %self.uploader.backend_type(),
            "Audio upload started"
        );

        let token = CancellationToken::new();
        let cancelled = token.clone();
        let uploader = Arc::clone(&self.uploader);
        let sender = self.sender.clone();
        let progress_sender = self.sender.clone();
        let reporter = ProgressReporter::new(move |ratio| {
            let _ = progress_sender.send(UploadMessage::Uploader {
                id,
                event: UploaderEvent::Progress(ratio),
            });
        });

        let task = tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = cancelled.cancelled() => {
                    tracing::debug!(upload_id = %id, "Upload task aborted");
                }
                result = AssertUnwindSafe(uploader.upload(file, reporter)).catch_unwind() => {
                    let event = match result {
                        Ok(Ok(locator)) => UploaderEvent::Succeeded(locator),
                        Ok(Err(e)) => UploaderEvent::Failed(failure_reason(e)),
                        Err(payload) => {
                            let message = panic_message(payload);
                            tracing::error!(upload_id = %id, panic = %message, "Uploader panicked");
                            UploaderEvent::Failed(format!("Uploader failed: {}", message))
                        }
                    };
                    let _ = sender.send(UploadMessage::Uploader { id, event });
                }
            }
        });

        self.uploads.attach(id, TaskHandle::new(token, task));
        Some(UploadEvent::Started { id })
    }

    fn spawn_resolve(&mut self, id: UploadId, src: String) {
        let token = CancellationToken::new();
        let cancelled = token.clone();
        let resolver = self.resolver.clone();
        let sender = self.sender.clone();

        let task = tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = cancelled.cancelled() => {
                    tracing::debug!(upload_id = %id, "Local audio fetch aborted");
                }
                result = AssertUnwindSafe(resolver.resolve(&src)).catch_unwind() => {
                    let result = result.unwrap_or_else(|payload| {
                        let message = panic_message(payload);
                        tracing::error!(upload_id = %id, panic = %message, "Local audio fetch panicked");
                        Err(FetchError::Transfer(message))
                    });
                    let _ = sender.send(UploadMessage::Resolved { id, result });
                }
            }
        });

        self.uploads.attach(id, TaskHandle::new(token, task));
    }

    fn apply_uploader_event(&mut self, id: UploadId, event: UploaderEvent) -> Option<UploadEvent> {
        let input = match event {
            UploaderEvent::Progress(ratio) => TrackerInput::Progress(ratio),
            UploaderEvent::Succeeded(locator) => TrackerInput::Succeeded(locator),
            UploaderEvent::Failed(reason) => TrackerInput::Failed(reason),
        };
        let change = self.uploads.get_mut(id)?.apply(input)?;

        match change {
            TrackerChange::Progress(ratio) => {
                self.present(id, &TrackerChange::Progress(ratio));
                Some(UploadEvent::Progress { id, ratio })
            }
            TrackerChange::Succeeded(locator) => {
                if let Err(e) = self.command.complete(&mut self.model, id, &locator) {
                    tracing::warn!(upload_id = %id, error = %e, "Failed to commit uploaded audio");
                }
                self.uploads.remove(id);
                tracing::info!(upload_id = %id, locator = %locator, "Audio upload completed");
                Some(UploadEvent::Succeeded { id, locator })
            }
            TrackerChange::Failed(reason) => {
                log_error(&UploadError::UploadFailure(reason.clone()), "Audio upload failed");
                if let Err(e) = self.command.fail(&mut self.model, id, &reason) {
                    tracing::warn!(upload_id = %id, error = %e, "Failed to mark audio upload as failed");
                }
                self.uploads.remove(id);
                Some(UploadEvent::Failed { id, reason })
            }
            TrackerChange::Started | TrackerChange::Cancelled => None,
        }
    }

    fn apply_resolved(&mut self, id: UploadId, result: Result<FilePayload, FetchError>) -> Option<UploadEvent> {
        let error = match result {
            Ok(file) => match self.command.policy().check(&file) {
                Ok(()) => return self.start_upload(id, file),
                Err(e) => e,
            },
            Err(e) => UploadError::Fetch(e),
        };

        log_error(&error, "Local audio not uploaded");
        self.abandon_local(id);
        Some(UploadEvent::ResolveFailed {
            id,
            reason: error.to_string(),
        })
    }

    /// Drop a local re-upload, leaving its element as it was before.
    fn abandon_local(&mut self, id: UploadId) {
        if let Some(node) = find_placeholder(&self.model, id) {
            if let Err(e) = self.model.change(|m| clear_upload_attributes(m, node)) {
                tracing::warn!(upload_id = %id, error = %e, "Failed to clear upload markers");
            }
        }
        self.uploads.remove(id);
    }

    fn cancel_orphan(&mut self, id: UploadId) -> Option<UploadEvent> {
        self.uploads.get_mut(id)?.apply(TrackerInput::Cancel)?;
        self.uploads.remove(id);
        log_error(&UploadError::OrphanedTask(id), "Cancelling upload");
        Some(UploadEvent::Cancelled { id })
    }

    fn present(&mut self, id: UploadId, change: &TrackerChange) {
        if let Err(e) = self.presenter.present(&mut self.model, id, change) {
            tracing::warn!(upload_id = %id, error = %e, "Failed to update upload placeholder");
        }
    }

    fn refresh_enabled(&self) {
        let enabled = self.command.is_enabled(&self.model);
        self.enabled.send_if_modified(|current| {
            if *current != enabled {
                *current = enabled;
                true
            } else {
                false
            }
        });
    }
}

/// Readable text for a caught panic payload
fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        return (*message).to_string();
    }
    if let Some(message) = payload.downcast_ref::<String>() {
        return message.clone();
    }
    "non-string panic payload".to_string()
}

fn failure_reason(error: UploaderError) -> String {
    match error {
        UploaderError::Rejected(message) => message,
        other => other.to_string(),
    }
}
