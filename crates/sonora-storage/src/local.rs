use crate::keys::{generate_storage_key, key_to_url_path};
use crate::traits::{FileUploader, ProgressReporter, UploaderError, UploaderResult};
use crate::UploaderBackend;
use async_trait::async_trait;
use sonora_core::FilePayload;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Bytes written between two progress reports
const CHUNK_SIZE: usize = 64 * 1024;

/// Removes a partially written file unless the upload reached its final name.
///
/// Dropping the upload future (cancellation) runs this too.
struct PartialFile {
    path: PathBuf,
    armed: bool,
}

impl PartialFile {
    fn new(path: PathBuf) -> Self {
        Self { path, armed: true }
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for PartialFile {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "Removed partial upload"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                path = %self.path.display(),
                error = %e,
                "Failed to remove partial upload"
            ),
        }
    }
}

fn partial_path(path: &Path) -> PathBuf {
    let mut partial = path.as_os_str().to_os_string();
    partial.push(".part");
    PathBuf::from(partial)
}

/// Local directory uploader implementation
#[derive(Clone, Debug)]
pub struct LocalUploader {
    base_path: PathBuf,
    base_url: String,
}

impl LocalUploader {
    /// Create a new LocalUploader instance
    ///
    /// # Arguments
    /// * `base_path` - Root directory for uploaded files (e.g., "/var/lib/sonora/media")
    /// * `base_url` - Base URL under which that directory is served (e.g., "http://localhost:3000/media")
    pub async fn new(base_path: impl Into<PathBuf>, base_url: String) -> UploaderResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            UploaderError::ConfigError(format!(
                "Failed to create upload directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalUploader {
            base_path,
            base_url,
        })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Convert storage key to filesystem path with security validation
    ///
    /// This function validates that the storage key doesn't contain path traversal
    /// sequences that could escape the base directory.
    fn key_to_path(&self, storage_key: &str) -> UploaderResult<PathBuf> {
        if storage_key.contains("..") || storage_key.starts_with('/') {
            return Err(UploaderError::InvalidKey(
                "Storage key contains invalid characters".to_string(),
            ));
        }

        let path = self.base_path.join(storage_key);
        if path.strip_prefix(&self.base_path).is_err() {
            return Err(UploaderError::InvalidKey(
                "Storage key resolves outside upload directory".to_string(),
            ));
        }

        Ok(path)
    }

    /// Generate public URL for file
    fn generate_url(&self, key: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            key_to_url_path(key)
        )
    }

    /// Ensure parent directory exists
    async fn ensure_parent_dir(&self, path: &Path) -> UploaderResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl FileUploader for LocalUploader {
    async fn upload(&self, file: FilePayload, progress: ProgressReporter) -> UploaderResult<String> {
        let key = generate_storage_key(&file.name);
        let path = self.key_to_path(&key)?;
        let size = file.size();

        self.ensure_parent_dir(&path).await?;

        let start = std::time::Instant::now();

        let partial = PartialFile::new(partial_path(&path));
        let mut out = fs::File::create(partial.path()).await.map_err(|e| {
            UploaderError::UploadFailed(format!("Failed to create file {}: {}", path.display(), e))
        })?;

        let mut written = 0usize;
        for chunk in file.data.chunks(CHUNK_SIZE) {
            out.write_all(chunk).await.map_err(|e| {
                UploaderError::UploadFailed(format!("Failed to write file {}: {}", path.display(), e))
            })?;
            written += chunk.len();
            progress.report_bytes(written as u64, size as u64);
        }

        out.sync_all().await.map_err(|e| {
            UploaderError::UploadFailed(format!("Failed to sync file {}: {}", path.display(), e))
        })?;
        drop(out);

        fs::rename(partial.path(), &path).await.map_err(|e| {
            UploaderError::UploadFailed(format!("Failed to move file into {}: {}", path.display(), e))
        })?;
        partial.disarm();

        if size == 0 {
            progress.report(1.0);
        }

        let url = self.generate_url(&key);

        tracing::info!(
            path = %path.display(),
            key = %key,
            size_bytes = size,
            mime_type = %file.mime_type,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local upload successful"
        );

        Ok(url)
    }

    fn backend_type(&self) -> UploaderBackend {
        UploaderBackend::Local
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    async fn uploader() -> (TempDir, LocalUploader) {
        let dir = TempDir::new().unwrap();
        let uploader = LocalUploader::new(dir.path().join("media"), "http://localhost:3000/media/".to_string())
            .await
            .unwrap();
        (dir, uploader)
    }

    fn recording_reporter() -> (Arc<Mutex<Vec<f64>>>, ProgressReporter) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        (seen, ProgressReporter::new(move |r| sink.lock().unwrap().push(r)))
    }

    #[tokio::test]
    async fn test_upload_writes_file_and_returns_url() {
        let (_dir, uploader) = uploader().await;
        let data = vec![7u8; CHUNK_SIZE * 2 + 10];
        let file = FilePayload::new("my song.wav", "audio/wav", data.clone());

        let url = uploader.upload(file, ProgressReporter::noop()).await.unwrap();

        assert!(url.starts_with("http://localhost:3000/media/audio/"));
        assert!(url.ends_with("-my%20song.wav"));

        let key = url.trim_start_matches("http://localhost:3000/media/");
        let key = urlencoding::decode(key).unwrap();
        let stored = tokio::fs::read(uploader.base_path().join(key.as_ref())).await.unwrap();
        assert_eq!(stored, data);
    }

    fn stored_files(dir: &Path) -> Vec<PathBuf> {
        let mut files = Vec::new();
        let Ok(entries) = std::fs::read_dir(dir) else {
            return files;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                files.extend(stored_files(&path));
            } else {
                files.push(path);
            }
        }
        files
    }

    #[tokio::test]
    async fn test_successful_upload_leaves_no_partial_file() {
        let (_dir, uploader) = uploader().await;
        let file = FilePayload::new("a.wav", "audio/wav", vec![3u8; CHUNK_SIZE + 1]);

        uploader.upload(file, ProgressReporter::noop()).await.unwrap();

        let files = stored_files(uploader.base_path());
        assert_eq!(files.len(), 1);
        assert!(files[0].to_string_lossy().ends_with("-a.wav"));
    }

    #[tokio::test]
    async fn test_cancelled_upload_removes_partial_file() {
        let (_dir, uploader) = uploader().await;
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let reporter = ProgressReporter::new(move |r| {
            let _ = tx.send(r);
        });
        let file = FilePayload::new("big.wav", "audio/wav", vec![5u8; CHUNK_SIZE * 64]);

        // The upload future is dropped as soon as the first chunk is reported
        tokio::select! {
            biased;
            result = uploader.upload(file, reporter) => panic!("upload finished: {:?}", result),
            first = rx.recv() => assert!(first.is_some()),
        }

        assert!(stored_files(uploader.base_path()).is_empty());
    }

    #[tokio::test]
    async fn test_upload_reports_monotonic_progress() {
        let (_dir, uploader) = uploader().await;
        let (seen, reporter) = recording_reporter();
        let file = FilePayload::new("a.mp3", "audio/mp3", vec![1u8; CHUNK_SIZE * 3]);

        uploader.upload(file, reporter).await.unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 3);
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(seen.last().copied(), Some(1.0));
    }

    #[tokio::test]
    async fn test_empty_file_reports_completion() {
        let (_dir, uploader) = uploader().await;
        let (seen, reporter) = recording_reporter();

        uploader
            .upload(FilePayload::new("empty.mp3", "audio/mp3", Vec::new()), reporter)
            .await
            .unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![1.0]);
    }

    #[tokio::test]
    async fn test_key_to_path_rejects_traversal() {
        let (_dir, uploader) = uploader().await;
        assert!(matches!(
            uploader.key_to_path("../outside.mp3"),
            Err(UploaderError::InvalidKey(_))
        ));
        assert!(matches!(
            uploader.key_to_path("/etc/passwd"),
            Err(UploaderError::InvalidKey(_))
        ));
        assert!(uploader.key_to_path("audio/a.mp3").is_ok());
    }

    #[tokio::test]
    async fn test_backend_type() {
        let (_dir, uploader) = uploader().await;
        assert_eq!(uploader.backend_type(), UploaderBackend::Local);
    }
}
