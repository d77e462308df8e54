use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use uuid::Uuid;

/// Stable identity of one upload. Also stored on the placeholder element as
/// its `uploadId` attribute, which is how trackers find their placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UploadId(Uuid);

impl UploadId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for UploadId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for UploadId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl Display for UploadId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.0)
    }
}

impl FromStr for UploadId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Phase of an upload.
///
/// `Idle → Uploading → {Succeeded | Failed | Cancelled}`; `Idle` may also go
/// straight to `Cancelled`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UploadPhase {
    Idle,
    Uploading,
    Succeeded,
    Failed,
    Cancelled,
}

impl UploadPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            UploadPhase::Succeeded | UploadPhase::Failed | UploadPhase::Cancelled
        )
    }
}

impl Display for UploadPhase {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            UploadPhase::Idle => write!(f, "idle"),
            UploadPhase::Uploading => write!(f, "uploading"),
            UploadPhase::Succeeded => write!(f, "succeeded"),
            UploadPhase::Failed => write!(f, "failed"),
            UploadPhase::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl FromStr for UploadPhase {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "idle" => Ok(UploadPhase::Idle),
            "uploading" => Ok(UploadPhase::Uploading),
            "succeeded" => Ok(UploadPhase::Succeeded),
            "failed" => Ok(UploadPhase::Failed),
            "cancelled" => Ok(UploadPhase::Cancelled),
            _ => Err(anyhow::anyhow!("Invalid upload phase: {}", s)),
        }
    }
}

/// Terminal result reported by the uploader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadOutcome {
    /// Final resource locator, opaque to the pipeline
    Uploaded(String),
    /// Failure reason
    Failed(String),
}
