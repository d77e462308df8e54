//! Shared key generation for uploader backends.
//!
//! Key format: `audio/{uuid}-{filename}`, with path separators and control
//! characters in the filename replaced.

use uuid::Uuid;

pub const KEY_PREFIX: &str = "audio";

/// Generate a unique storage key for an uploaded file.
pub fn generate_storage_key(filename: &str) -> String {
    format!("{}/{}-{}", KEY_PREFIX, Uuid::new_v4(), sanitize_filename(filename))
}

/// Make a filename safe to use as the last key segment.
pub fn sanitize_filename(filename: &str) -> String {
    let cleaned: String = filename
        .chars()
        .map(|c| {
            if c == '/' || c == '\\' || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect();
    let cleaned = cleaned.trim().trim_start_matches('.').replace("..", "_");

    if cleaned.is_empty() {
        "audio".to_string()
    } else {
        cleaned
    }
}

/// Percent-encode each key segment for use in a URL path.
pub fn key_to_url_path(key: &str) -> String {
    key.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}
