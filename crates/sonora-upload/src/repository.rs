//! In-flight uploads, keyed by [`UploadId`].

use crate::tracker::UploadTracker;
use sonora_core::UploadId;
use std::collections::HashMap;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Background work attached to an upload (resolve or transfer).
#[derive(Debug)]
pub struct TaskHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl TaskHandle {
    pub fn new(cancel: CancellationToken, task: JoinHandle<()>) -> Self {
        Self { cancel, task }
    }

    /// Ask the task to stop; the in-flight future is dropped at its next poll.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

#[derive(Debug)]
struct TrackedUpload {
    tracker: UploadTracker,
    handle: Option<TaskHandle>,
}

#[derive(Debug, Default)]
pub struct UploadRepository {
    entries: HashMap<UploadId, TrackedUpload>,
}

impl UploadRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, tracker: UploadTracker) {
        self.entries.insert(
            tracker.id(),
            TrackedUpload {
                tracker,
                handle: None,
            },
        );
    }

    /// Attach the background task of `id`, replacing (and cancelling) any
    /// previous one.
    pub fn attach(&mut self, id: UploadId, handle: TaskHandle) {
        match self.entries.get_mut(&id) {
            Some(entry) => {
                if let Some(previous) = entry.handle.replace(handle) {
                    previous.cancel();
                }
            }
            None => handle.cancel(),
        }
    }

    pub fn get(&self, id: UploadId) -> Option<&UploadTracker> {
        self.entries.get(&id).map(|entry| &entry.tracker)
    }

    pub fn get_mut(&mut self, id: UploadId) -> Option<&mut UploadTracker> {
        self.entries.get_mut(&id).map(|entry| &mut entry.tracker)
    }

    pub fn contains(&self, id: UploadId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Remove `id`, cancelling its task if it is still running.
    pub fn remove(&mut self, id: UploadId) -> Option<UploadTracker> {
        let entry = self.entries.remove(&id)?;
        if let Some(handle) = entry.handle {
            if !handle.is_finished() {
                handle.cancel();
            }
        }
        Some(entry.tracker)
    }

    pub fn active_ids(&self) -> Vec<UploadId> {
        self.entries.keys().copied().collect()
    }

    pub fn trackers(&self) -> impl Iterator<Item = &UploadTracker> {
        self.entries.values().map(|entry| &entry.tracker)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
