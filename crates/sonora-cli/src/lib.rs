use serde::Serialize;
use sonora_core::{UploadId, UploadPhase};
use sonora_upload::UploadEvent;
use std::path::Path;

/// MIME type for files whose type cannot be guessed
pub const UNKNOWN_MIME_TYPE: &str = "application/octet-stream";

/// Guess the declared MIME type of an audio file from its extension.
pub fn mime_for_path(path: &Path) -> String {
    path.extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty())
        .map(|ext| format!("audio/{}", ext.to_lowercase()))
        .unwrap_or_else(|| UNKNOWN_MIME_TYPE.to_string())
}

/// Final state of one upload, as printed by `sonora upload`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadSummary {
    pub id: UploadId,
    pub status: UploadPhase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locator: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadReport {
    pub requested: usize,
    pub accepted: usize,
    pub uploads: Vec<UploadSummary>,
}

impl UploadReport {
    pub fn new(requested: usize, ids: &[UploadId], events: &[UploadEvent]) -> Self {
        let uploads = ids
            .iter()
            .map(|id| {
                let mut summary = UploadSummary {
                    id: *id,
                    status: UploadPhase::Uploading,
                    locator: None,
                    error: None,
                };
                for event in events.iter().filter(|e| e.id() == *id) {
                    match event {
                        UploadEvent::Succeeded { locator, .. } => {
                            summary.status = UploadPhase::Succeeded;
                            summary.locator = Some(locator.clone());
                        }
                        UploadEvent::Failed { reason, .. } => {
                            summary.status = UploadPhase::Failed;
                            summary.error = Some(reason.clone());
                        }
                        UploadEvent::Cancelled { .. } => summary.status = UploadPhase::Cancelled,
                        _ => {}
                    }
                }
                summary
            })
            .collect();

        Self {
            requested,
            accepted: ids.len(),
            uploads,
        }
    }
}

/// Initialize tracing for CLI binaries.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}
