use async_trait::async_trait;
use sonora_core::{FileInfo, FilePayload, UploaderBackend};
use sonora_storage::{FileUploader, ProgressReporter, UploaderError, UploaderResult};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// Reports the scripted progress, then succeeds with `base_url + file name`.
pub struct ScriptedUploader {
    progress: Vec<f64>,
    base_url: String,
    received: Mutex<Vec<FileInfo>>,
}

impl ScriptedUploader {
    pub fn new(progress: &[f64], base_url: &str) -> Arc<Self> {
        Arc::new(Self {
            progress: progress.to_vec(),
            base_url: base_url.to_string(),
            received: Mutex::new(Vec::new()),
        })
    }

    pub fn received(&self) -> Vec<FileInfo> {
        self.received.lock().unwrap().clone()
    }
}

#[async_trait]
impl FileUploader for ScriptedUploader {
    async fn upload(&self, file: FilePayload, progress: ProgressReporter) -> UploaderResult<String> {
        self.received.lock().unwrap().push(file.info());
        for ratio in &self.progress {
            progress.report(*ratio);
        }
        Ok(format!("{}{}", self.base_url, file.name))
    }

    fn backend_type(&self) -> UploaderBackend {
        UploaderBackend::Http
    }
}

/// Reports 0.3, then waits for the gate before succeeding.
pub struct GatedUploader {
    gate: Arc<Notify>,
}

impl GatedUploader {
    pub fn new() -> (Arc<Self>, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        (
            Arc::new(Self {
                gate: Arc::clone(&gate),
            }),
            gate,
        )
    }
}

#[async_trait]
impl FileUploader for GatedUploader {
    async fn upload(&self, file: FilePayload, progress: ProgressReporter) -> UploaderResult<String> {
        progress.report(0.3);
        self.gate.notified().await;
        Ok(format!("https://cdn/{}", file.name))
    }

    fn backend_type(&self) -> UploaderBackend {
        UploaderBackend::Http
    }
}

/// Reports half the transfer, then fails with the given error.
pub struct FailingUploader {
    error: fn() -> UploaderError,
}

impl FailingUploader {
    pub fn server_error() -> Arc<Self> {
        Arc::new(Self {
            error: || UploaderError::UploadFailed("HTTP 500".to_string()),
        })
    }

    pub fn rejected() -> Arc<Self> {
        Arc::new(Self {
            error: || UploaderError::Rejected("File too large".to_string()),
        })
    }
}

#[async_trait]
impl FileUploader for FailingUploader {
    async fn upload(&self, _file: FilePayload, progress: ProgressReporter) -> UploaderResult<String> {
        progress.report(0.5);
        Err((self.error)())
    }

    fn backend_type(&self) -> UploaderBackend {
        UploaderBackend::Http
    }
}

/// Panics mid-transfer, as a buggy backend would.
pub struct PanickingUploader;

impl PanickingUploader {
    pub fn new() -> Arc<Self> {
        Arc::new(Self)
    }
}

#[async_trait]
impl FileUploader for PanickingUploader {
    async fn upload(&self, _file: FilePayload, progress: ProgressReporter) -> UploaderResult<String> {
        progress.report(0.2);
        panic!("backend bug");
    }

    fn backend_type(&self) -> UploaderBackend {
        UploaderBackend::Http
    }
}
