//! Local media resolution
//!
//! Pasted or dropped content may carry `audio` elements whose `src` is
//! embedded (`data:audio/...;base64,...`) or an object URL (`blob:...`). Those
//! are turned back into a [`FilePayload`] so they can be uploaded like any
//! picked file.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use regex::Regex;
use sonora_core::{FetchError, FilePayload};
use sonora_document::schema::AUDIO;
use sonora_document::{EditorModel, NodeId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};
use uuid::Uuid;

/// MIME type used when neither the fetch nor the reference tells us one.
pub const FALLBACK_MIME_TYPE: &str = "audio/mp3";

const BLOB_PREFIX: &str = "blob:";

fn local_reference_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^data:audio/\w+;base64,|^blob:").ok())
        .as_ref()
}

fn data_mime_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"data:(audio/\w+);base64").ok())
        .as_ref()
}

/// Whether `src` points at media that only exists on this machine.
pub fn is_local_reference(src: &str) -> bool {
    local_reference_pattern().is_some_and(|pattern| pattern.is_match(src))
}

/// MIME type declared by a `data:` reference, lowercased.
pub fn data_uri_mime_type(src: &str) -> Option<String> {
    data_mime_pattern()?
        .captures(src)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str().to_lowercase())
}

/// MIME type of resolved media: fetched type, then the `data:` prefix, then
/// the fallback.
pub fn resolve_mime_type(fetched: Option<&str>, src: &str) -> String {
    fetched
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .or_else(|| data_uri_mime_type(src))
        .unwrap_or_else(|| FALLBACK_MIME_TYPE.to_string())
}

/// `audio.<subtype>`, ignoring any MIME parameters
pub fn file_name_for(mime_type: &str) -> String {
    let essence = mime_type.split(';').next().unwrap_or(mime_type).trim();
    let subtype = essence
        .split_once('/')
        .map(|(_, subtype)| subtype)
        .unwrap_or(essence);
    format!("audio.{}", subtype)
}

/// Every `audio` element inside `item`, `item` included.
pub fn audios_in_subtree<M: EditorModel>(model: &M, item: NodeId) -> Vec<NodeId> {
    model
        .subtree(item)
        .into_iter()
        .filter(|node| model.is_named(*node, AUDIO))
        .collect()
}

/// Bytes obtained for a local reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedMedia {
    pub data: Bytes,
    pub content_type: Option<String>,
}

/// Non-blocking access to local media.
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    async fn fetch(&self, src: &str) -> Result<FetchedMedia, FetchError>;
}

/// Registry of object URLs (`blob:...`) and the media behind them.
#[derive(Debug, Clone, Default)]
pub struct BlobStore {
    entries: Arc<Mutex<HashMap<String, FetchedMedia>>>,
}

impl BlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register media and return the object URL that now points at it.
    pub fn register(&self, data: impl Into<Bytes>, content_type: Option<&str>) -> String {
        let url = format!("{}sonora/{}", BLOB_PREFIX, Uuid::new_v4());
        let media = FetchedMedia {
            data: data.into(),
            content_type: content_type.map(str::to_string),
        };
        self.lock().insert(url.clone(), media);
        url
    }

    /// Forget an object URL. Returns whether it was registered.
    pub fn revoke(&self, url: &str) -> bool {
        self.lock().remove(url).is_some()
    }

    pub fn get(&self, url: &str) -> Option<FetchedMedia> {
        self.lock().get(url).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, FetchedMedia>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Fetcher for `data:` URIs and registered object URLs.
#[derive(Debug, Clone, Default)]
pub struct LocalFetcher {
    blobs: BlobStore,
}

impl LocalFetcher {
    pub fn new(blobs: BlobStore) -> Self {
        Self { blobs }
    }

    pub fn blobs(&self) -> &BlobStore {
        &self.blobs
    }
}

#[async_trait]
impl MediaFetcher for LocalFetcher {
    async fn fetch(&self, src: &str) -> Result<FetchedMedia, FetchError> {
        if src.starts_with("data:") {
            return decode_data_uri(src);
        }
        if src.starts_with(BLOB_PREFIX) {
            return self
                .blobs
                .get(src)
                .ok_or_else(|| FetchError::Unreachable(src.to_string()));
        }
        Err(FetchError::NotLocal(src.to_string()))
    }
}

fn decode_data_uri(src: &str) -> Result<FetchedMedia, FetchError> {
    let malformed = || FetchError::MalformedDataUri(truncate(src));

    let (header, payload) = src.split_once(',').ok_or_else(malformed)?;
    let media_type = header
        .strip_prefix("data:")
        .and_then(|h| h.strip_suffix(";base64"))
        .ok_or_else(malformed)?;

    let data = STANDARD
        .decode(payload.trim())
        .map_err(|e| FetchError::Transfer(format!("Invalid base64 payload: {}", e)))?;

    Ok(FetchedMedia {
        data: Bytes::from(data),
        content_type: Some(media_type.to_lowercase()).filter(|t| !t.is_empty()),
    })
}

/// Keep multi-megabyte data URIs out of error messages
fn truncate(src: &str) -> String {
    const MAX: usize = 64;
    match src.char_indices().nth(MAX) {
        Some((index, _)) => format!("{}...", &src[..index]),
        None => src.to_string(),
    }
}

/// Turns local references back into uploadable files.
#[derive(Clone)]
pub struct LocalMediaResolver {
    fetcher: Arc<dyn MediaFetcher>,
}

impl LocalMediaResolver {
    pub fn new(fetcher: Arc<dyn MediaFetcher>) -> Self {
        Self { fetcher }
    }

    pub async fn resolve(&self, src: &str) -> Result<FilePayload, FetchError> {
        if !is_local_reference(src) {
            return Err(FetchError::NotLocal(truncate(src)));
        }

        let fetched = self.fetcher.fetch(src).await?;
        let mime_type = resolve_mime_type(fetched.content_type.as_deref(), src);
        let name = file_name_for(&mime_type);

        tracing::debug!(
            mime_type = %mime_type,
            file_name = %name,
            size_bytes = fetched.data.len(),
            "Resolved local audio"
        );

        Ok(FilePayload::new(name, mime_type, fetched.data))
    }
}

impl Default for LocalMediaResolver {
    fn default() -> Self {
        Self::new(Arc::new(LocalFetcher::default()))
    }
}

impl std::fmt::Debug for LocalMediaResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalMediaResolver").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TypedFetcher(&'static str);

    #[async_trait]
    impl MediaFetcher for TypedFetcher {
        async fn fetch(&self, _src: &str) -> Result<FetchedMedia, FetchError> {
            Ok(FetchedMedia {
                data: Bytes::from_static(b"abc"),
                content_type: Some(self.0.to_string()).filter(|t| !t.is_empty()),
            })
        }
    }

    struct FailingFetcher;

    #[async_trait]
    impl MediaFetcher for FailingFetcher {
        async fn fetch(&self, src: &str) -> Result<FetchedMedia, FetchError> {
            Err(FetchError::Unreachable(src.to_string()))
        }
    }

    #[test]
    fn test_is_local_reference() {
        assert!(is_local_reference("data:audio/mp3;base64,AAAA"));
        assert!(is_local_reference("blob:https://host/123"));
        assert!(!is_local_reference("data:image/png;base64,AAAA"));
        assert!(!is_local_reference("data:audio/mp3,AAAA"));
        assert!(!is_local_reference("https://cdn/a1.wav"));
        assert!(!is_local_reference(" blob:x"));
    }

    #[test]
    fn test_mime_type_priority() {
        let src = "data:audio/WAV;base64,AAAA";
        assert_eq!(resolve_mime_type(Some("audio/ogg"), src), "audio/ogg");
        assert_eq!(resolve_mime_type(None, src), "audio/wav");
        assert_eq!(resolve_mime_type(Some(""), src), "audio/wav");
        assert_eq!(resolve_mime_type(None, "blob:x"), FALLBACK_MIME_TYPE);
    }

    #[test]
    fn test_file_name_for() {
        assert_eq!(file_name_for("audio/mp3"), "audio.mp3");
        assert_eq!(file_name_for("audio/ogg; codecs=opus"), "audio.ogg");
    }

    #[tokio::test]
    async fn test_resolve_data_uri() {
        let resolver = LocalMediaResolver::default();
        let file = resolver.resolve("data:audio/mp3;base64,AAAA").await.unwrap();
        assert_eq!(file.mime_type, "audio/mp3");
        assert_eq!(file.name, "audio.mp3");
        assert_eq!(file.data.as_ref(), &[0u8, 0, 0]);
    }

    #[tokio::test]
    async fn test_resolve_data_uri_lowercases_subtype() {
        let resolver = LocalMediaResolver::default();
        let file = resolver.resolve("data:audio/WAV;base64,AAAA").await.unwrap();
        assert_eq!(file.mime_type, "audio/wav");
        assert_eq!(file.name, "audio.wav");

        let blobs = BlobStore::new();
        let url = blobs.register(vec![1u8], Some("Audio/Ogg"));
        let resolver = LocalMediaResolver::new(Arc::new(LocalFetcher::new(blobs)));
        assert_eq!(resolver.resolve(&url).await.unwrap().mime_type, "audio/ogg");
    }

    #[tokio::test]
    async fn test_resolve_prefers_fetched_type() {
        let resolver = LocalMediaResolver::new(Arc::new(TypedFetcher("audio/wav")));
        let file = resolver.resolve("data:audio/mp3;base64,AAAA").await.unwrap();
        assert_eq!(file.mime_type, "audio/wav");
        assert_eq!(file.name, "audio.wav");
    }

    #[tokio::test]
    async fn test_resolve_blob_without_type_falls_back() {
        let blobs = BlobStore::new();
        let url = blobs.register(vec![1u8, 2], None);
        let resolver = LocalMediaResolver::new(Arc::new(LocalFetcher::new(blobs.clone())));

        let file = resolver.resolve(&url).await.unwrap();
        assert_eq!(file.mime_type, "audio/mp3");
        assert_eq!(file.name, "audio.mp3");

        assert!(blobs.revoke(&url));
        assert!(matches!(
            resolver.resolve(&url).await,
            Err(FetchError::Unreachable(_))
        ));
    }

    #[tokio::test]
    async fn test_resolve_rejects_remote_and_propagates_failures() {
        let resolver = LocalMediaResolver::default();
        assert!(matches!(
            resolver.resolve("https://cdn/a1.wav").await,
            Err(FetchError::NotLocal(_))
        ));

        let resolver = LocalMediaResolver::new(Arc::new(FailingFetcher));
        assert!(matches!(
            resolver.resolve("blob:gone").await,
            Err(FetchError::Unreachable(_))
        ));
    }

    #[tokio::test]
    async fn test_invalid_base64_is_transfer_error() {
        let resolver = LocalMediaResolver::default();
        assert!(matches!(
            resolver.resolve("data:audio/mp3;base64,!!!").await,
            Err(FetchError::Transfer(_))
        ));
    }
}
