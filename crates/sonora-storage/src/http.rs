//! Simple-upload HTTP backend
//!
//! Sends each file as a multipart `POST` (field `upload`) to a configured
//! endpoint. The endpoint answers with JSON:
//!
//! - `{"url": "https://..."}` or `{"urls": {"default": "https://...", ...}}` on success
//! - `{"error": {"message": "..."}}` on failure

use crate::traits::{FileUploader, ProgressReporter, UploaderError, UploaderResult};
use crate::UploaderBackend;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use sonora_core::{FilePayload, SimpleUploadConfig};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Multipart field carrying the file
const UPLOAD_FIELD: &str = "upload";
/// Body chunk size; progress is reported as each chunk is handed to the client
const CHUNK_SIZE: usize = 64 * 1024;

#[derive(Debug, Deserialize)]
struct SimpleUploadResponse {
    url: Option<String>,
    urls: Option<HashMap<String, String>>,
    error: Option<SimpleUploadErrorBody>,
}

#[derive(Debug, Deserialize)]
struct SimpleUploadErrorBody {
    message: Option<String>,
}

/// HTTP simple-upload uploader implementation
#[derive(Clone, Debug)]
pub struct HttpUploader {
    client: Client,
    upload_url: String,
    headers: HeaderMap,
}

impl HttpUploader {
    pub fn new(config: &SimpleUploadConfig) -> UploaderResult<Self> {
        let mut headers = HeaderMap::new();
        for (name, value) in &config.headers {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                UploaderError::ConfigError(format!("Invalid header name {}: {}", name, e))
            })?;
            let value = HeaderValue::from_str(value).map_err(|e| {
                UploaderError::ConfigError(format!("Invalid value for header {}: {}", name, e))
            })?;
            headers.insert(name, value);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                UploaderError::ConfigError(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            upload_url: config.upload_url.clone(),
            headers,
        })
    }

    pub fn upload_url(&self) -> &str {
        &self.upload_url
    }

    fn progress_body(data: Bytes, progress: ProgressReporter) -> reqwest::Body {
        let total = data.len() as u64;
        let sent = Arc::new(AtomicU64::new(0));

        let chunks: Vec<Bytes> = (0..data.len())
            .step_by(CHUNK_SIZE)
            .map(|start| data.slice(start..(start + CHUNK_SIZE).min(data.len())))
            .collect();

        let stream = futures::stream::iter(chunks.into_iter().map(move |chunk| {
            let len = chunk.len() as u64;
            let now = sent.fetch_add(len, Ordering::Relaxed) + len;
            progress.report_bytes(now, total);
            Ok::<Bytes, std::io::Error>(chunk)
        }));

        reqwest::Body::wrap_stream(stream)
    }

    fn parse_response(status: reqwest::StatusCode, body: &str) -> UploaderResult<String> {
        let parsed: Option<SimpleUploadResponse> = serde_json::from_str(body).ok();

        if let Some(message) = parsed
            .as_ref()
            .and_then(|r| r.error.as_ref())
            .map(|e| e.message.clone().unwrap_or_else(|| "Cannot upload file".to_string()))
        {
            return Err(UploaderError::Rejected(message));
        }

        if !status.is_success() {
            return Err(UploaderError::UploadFailed(format!(
                "Upload request failed with status {}: {}",
                status, body
            )));
        }

        let response = parsed.ok_or_else(|| {
            UploaderError::BackendError(format!("Upload response is not valid JSON: {}", body))
        })?;

        response
            .url
            .or_else(|| response.urls.and_then(|mut urls| urls.remove("default")))
            .ok_or_else(|| {
                UploaderError::BackendError("Upload response contains no url".to_string())
            })
    }
}

#[async_trait]
impl FileUploader for HttpUploader {
    async fn upload(&self, file: FilePayload, progress: ProgressReporter) -> UploaderResult<String> {
        let size = file.size() as u64;
        let start = std::time::Instant::now();

        if size == 0 {
            progress.report(1.0);
        }

        let part = Part::stream_with_length(Self::progress_body(file.data, progress), size)
            .file_name(file.name.clone())
            .mime_str(&file.mime_type)
            .map_err(|e| {
                UploaderError::UploadFailed(format!("Invalid MIME type {}: {}", file.mime_type, e))
            })?;
        let form = Form::new().part(UPLOAD_FIELD, part);

        let response = self
            .client
            .post(&self.upload_url)
            .headers(self.headers.clone())
            .multipart(form)
            .send()
            .await
            .map_err(|e| UploaderError::UploadFailed(format!("Failed to send upload request: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| UploaderError::UploadFailed(format!("Failed to read upload response: {}", e)))?;

        let url = Self::parse_response(status, &body)?;

        tracing::info!(
            upload_url = %self.upload_url,
            file_name = %file.name,
            size_bytes = size,
            status = status.as_u16(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "HTTP upload successful"
        );

        Ok(url)
    }

    fn backend_type(&self) -> UploaderBackend {
        UploaderBackend::Http
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    fn config(url: String, headers: &[(&str, &str)]) -> SimpleUploadConfig {
        SimpleUploadConfig {
            upload_url: url,
            headers: headers
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<BTreeMap<_, _>>(),
            timeout_secs: 5,
        }
    }

    fn wav(size: usize) -> FilePayload {
        FilePayload::new("a1.wav", "audio/wav", vec![0u8; size])
    }

    #[tokio::test]
    async fn test_upload_returns_url() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/upload")
            .match_header("x-csrf-token", "secret")
            .with_status(201)
            .with_header("content-type", "application/json")
            .with_body(r#"{"url": "https://cdn/a1.wav"}"#)
            .create_async()
            .await;

        let uploader = HttpUploader::new(&config(
            format!("{}/upload", server.url()),
            &[("X-CSRF-Token", "secret")],
        ))
        .unwrap();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let reporter = ProgressReporter::new(move |r| sink.lock().unwrap().push(r));

        let url = uploader.upload(wav(CHUNK_SIZE * 2), reporter).await.unwrap();

        assert_eq!(url, "https://cdn/a1.wav");
        mock.assert_async().await;
        let seen = seen.lock().unwrap();
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(seen.last().copied(), Some(1.0));
    }

    #[tokio::test]
    async fn test_upload_accepts_urls_default() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/upload")
            .with_status(200)
            .with_body(r#"{"urls": {"default": "https://cdn/default.wav", "low": "https://cdn/low.wav"}}"#)
            .create_async()
            .await;

        let uploader = HttpUploader::new(&config(format!("{}/upload", server.url()), &[])).unwrap();
        let url = uploader.upload(wav(16), ProgressReporter::noop()).await.unwrap();
        assert_eq!(url, "https://cdn/default.wav");
    }

    #[tokio::test]
    async fn test_upload_error_message_is_rejection() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/upload")
            .with_status(200)
            .with_body(r#"{"error": {"message": "File too large"}}"#)
            .create_async()
            .await;

        let uploader = HttpUploader::new(&config(format!("{}/upload", server.url()), &[])).unwrap();
        let err = uploader.upload(wav(16), ProgressReporter::noop()).await.unwrap_err();
        assert!(matches!(err, UploaderError::Rejected(ref m) if m == "File too large"));
    }

    #[tokio::test]
    async fn test_upload_http_error_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/upload")
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        let uploader = HttpUploader::new(&config(format!("{}/upload", server.url()), &[])).unwrap();
        let err = uploader.upload(wav(16), ProgressReporter::noop()).await.unwrap_err();
        assert!(matches!(err, UploaderError::UploadFailed(_)));
    }

    #[test]
    fn test_parse_response_without_url() {
        let err = HttpUploader::parse_response(reqwest::StatusCode::OK, "{}").unwrap_err();
        assert!(matches!(err, UploaderError::BackendError(_)));
    }

    #[test]
    fn test_invalid_header_is_config_error() {
        let err = HttpUploader::new(&config(
            "http://localhost/upload".to_string(),
            &[("Bad Header", "x")],
        ))
        .unwrap_err();
        assert!(matches!(err, UploaderError::ConfigError(_)));
    }
}
