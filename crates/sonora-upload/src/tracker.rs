//! Per-upload state machine
//!
//! `Idle → Uploading → {Succeeded | Failed | Cancelled}`, with `Idle → Cancelled`
//! for uploads that never started. The tracker only records state; applying
//! its changes to the document is the job of the presenter and the command.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sonora_core::{FileInfo, UploadId, UploadOutcome, UploadPhase};

/// Something that happened to an upload, as delivered to its tracker.
#[derive(Debug, Clone, PartialEq)]
pub enum TrackerInput {
    Start,
    Progress(f64),
    Succeeded(String),
    Failed(String),
    Cancel,
}

/// Accepted transition, returned by [`UploadTracker::apply`].
#[derive(Debug, Clone, PartialEq)]
pub enum TrackerChange {
    Started,
    Progress(f64),
    Succeeded(String),
    Failed(String),
    Cancelled,
}

impl TrackerChange {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TrackerChange::Succeeded(_) | TrackerChange::Failed(_) | TrackerChange::Cancelled
        )
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UploadTracker {
    id: UploadId,
    file: Option<FileInfo>,
    phase: UploadPhase,
    progress: f64,
    outcome: Option<UploadOutcome>,
    created_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
}

impl UploadTracker {
    pub fn new(id: UploadId) -> Self {
        Self {
            id,
            file: None,
            phase: UploadPhase::Idle,
            progress: 0.0,
            outcome: None,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
        }
    }

    pub fn with_file(mut self, file: FileInfo) -> Self {
        self.file = Some(file);
        self
    }

    /// File metadata; unknown for local media until it has been resolved
    pub fn set_file(&mut self, file: FileInfo) {
        self.file = Some(file);
    }

    pub fn id(&self) -> UploadId {
        self.id
    }

    pub fn file(&self) -> Option<&FileInfo> {
        self.file.as_ref()
    }

    pub fn phase(&self) -> UploadPhase {
        self.phase
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn outcome(&self) -> Option<&UploadOutcome> {
        self.outcome.as_ref()
    }

    pub fn is_terminal(&self) -> bool {
        self.phase.is_terminal()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    /// Apply `input`, returning the change when it was accepted.
    ///
    /// Terminal trackers accept nothing. Progress is accepted only while
    /// uploading and never goes backwards.
    pub fn apply(&mut self, input: TrackerInput) -> Option<TrackerChange> {
        if self.phase.is_terminal() {
            return None;
        }

        match (self.phase, input) {
            (UploadPhase::Idle, TrackerInput::Start) => {
                self.phase = UploadPhase::Uploading;
                self.progress = 0.0;
                self.started_at = Some(Utc::now());
                Some(TrackerChange::Started)
            }
            (UploadPhase::Uploading, TrackerInput::Progress(ratio)) => {
                if ratio.is_nan() {
                    return None;
                }
                let ratio = ratio.clamp(0.0, 1.0);
                if ratio < self.progress {
                    return None;
                }
                self.progress = ratio;
                Some(TrackerChange::Progress(ratio))
            }
            (UploadPhase::Uploading, TrackerInput::Succeeded(locator)) => {
                self.progress = 1.0;
                self.finish(UploadPhase::Succeeded);
                self.outcome = Some(UploadOutcome::Uploaded(locator.clone()));
                Some(TrackerChange::Succeeded(locator))
            }
            (UploadPhase::Uploading, TrackerInput::Failed(reason)) => {
                self.finish(UploadPhase::Failed);
                self.outcome = Some(UploadOutcome::Failed(reason.clone()));
                Some(TrackerChange::Failed(reason))
            }
            (_, TrackerInput::Cancel) => {
                self.finish(UploadPhase::Cancelled);
                Some(TrackerChange::Cancelled)
            }
            _ => None,
        }
    }

    fn finish(&mut self, phase: UploadPhase) {
        self.phase = phase;
        self.finished_at = Some(Utc::now());
    }
}
