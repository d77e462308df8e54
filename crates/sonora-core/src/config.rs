//! Configuration module
//!
//! Configuration comes from two places: the editor configuration object the
//! host hands over (`audio.upload.types`, `audio.upload.allowMultipleFiles`,
//! `simpleUpload`), and environment variables for standalone use.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;

use crate::uploader_types::UploaderBackend;

const DEFAULT_AUDIO_TYPES: &[&str] = &["mp3", "mpeg", "wav", "ogg"];
const SIMPLE_UPLOAD_TIMEOUT_SECS: u64 = 60;

fn default_audio_types() -> Vec<String> {
    DEFAULT_AUDIO_TYPES.iter().map(|s| s.to_string()).collect()
}

fn default_true() -> bool {
    true
}

fn default_timeout_secs() -> u64 {
    SIMPLE_UPLOAD_TIMEOUT_SECS
}

/// `audio.upload` section of the editor configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioUploadConfig {
    /// Accepted audio subtypes, in picker order
    #[serde(default = "default_audio_types")]
    pub types: Vec<String>,
    #[serde(default = "default_true")]
    pub allow_multiple_files: bool,
}

impl Default for AudioUploadConfig {
    fn default() -> Self {
        Self {
            types: default_audio_types(),
            allow_multiple_files: true,
        }
    }
}

/// `audio.upload` as written by the host; absent keys keep the current value
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioUploadOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub types: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_multiple_files: Option<bool>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioConfig {
    #[serde(default)]
    pub upload: AudioUploadOverrides,
}

/// `simpleUpload` section: where the HTTP uploader sends files
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimpleUploadConfig {
    pub upload_url: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Editor configuration object as handed over by the host.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorConfig {
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub simple_upload: Option<SimpleUploadConfig>,
}

impl EditorConfig {
    pub fn from_json(json: &str) -> Result<Self, anyhow::Error> {
        serde_json::from_str(json)
            .map_err(|e| anyhow::anyhow!("Invalid editor configuration: {}", e))
    }
}

/// Application configuration
#[derive(Clone, Debug)]
pub struct Config {
    pub environment: String,
    pub audio: AudioUploadConfig,
    pub uploader_backend: UploaderBackend,
    pub local_storage_path: Option<String>,
    pub local_storage_base_url: Option<String>,
    pub simple_upload: Option<SimpleUploadConfig>,
}

impl Config {
    /// Load configuration from the process environment (and `.env`, if any)
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = lookup("ENVIRONMENT")
            .or_else(|| lookup("APP_ENV"))
            .unwrap_or_else(|| "development".to_string());

        let types = lookup("AUDIO_UPLOAD_TYPES")
            .map(|s| parse_list(&s))
            .unwrap_or_else(default_audio_types);

        let allow_multiple_files = match lookup("AUDIO_UPLOAD_ALLOW_MULTIPLE_FILES") {
            Some(value) => parse_bool(&value).ok_or_else(|| {
                anyhow::anyhow!("AUDIO_UPLOAD_ALLOW_MULTIPLE_FILES must be a boolean, got {}", value)
            })?,
            None => true,
        };

        let uploader_backend = lookup("UPLOAD_BACKEND")
            .map(|s| s.parse::<UploaderBackend>())
            .transpose()?
            .unwrap_or(UploaderBackend::Local);

        let simple_upload = match lookup("SIMPLE_UPLOAD_URL") {
            Some(upload_url) => {
                let headers = lookup("SIMPLE_UPLOAD_HEADERS")
                    .map(|s| parse_headers(&s))
                    .transpose()?
                    .unwrap_or_default();
                let timeout_secs = match lookup("SIMPLE_UPLOAD_TIMEOUT_SECS") {
                    Some(value) => value.trim().parse::<u64>().map_err(|_| {
                        anyhow::anyhow!(
                            "SIMPLE_UPLOAD_TIMEOUT_SECS must be a number of seconds, got {}",
                            value
                        )
                    })?,
                    None => SIMPLE_UPLOAD_TIMEOUT_SECS,
                };
                Some(SimpleUploadConfig {
                    upload_url,
                    headers,
                    timeout_secs,
                })
            }
            None => None,
        };

        Ok(Self {
            environment,
            audio: AudioUploadConfig {
                types,
                allow_multiple_files,
            },
            uploader_backend,
            local_storage_path: lookup("LOCAL_STORAGE_PATH"),
            local_storage_base_url: lookup("LOCAL_STORAGE_BASE_URL"),
            simple_upload,
        })
    }

    /// Overlay the sections present in a host editor configuration.
    pub fn with_editor_config(mut self, editor: EditorConfig) -> Self {
        let upload = editor.audio.upload;
        if let Some(types) = upload.types {
            self.audio.types = types;
        }
        if let Some(allow_multiple_files) = upload.allow_multiple_files {
            self.audio.allow_multiple_files = allow_multiple_files;
        }
        if let Some(simple_upload) = editor.simple_upload {
            self.simple_upload = Some(simple_upload);
        }
        self
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.audio.types.iter().all(|t| t.trim().is_empty()) {
            tracing::warn!("audio.upload.types is empty; every audio file will be rejected");
        }

        match self.uploader_backend {
            UploaderBackend::Local => {
                if self.local_storage_path.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_PATH is required for the local uploader"
                    ));
                }
                if self.local_storage_base_url.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_BASE_URL is required for the local uploader"
                    ));
                }
            }
            UploaderBackend::Http => {
                let simple_upload = self.simple_upload.as_ref().ok_or_else(|| {
                    anyhow::anyhow!("SIMPLE_UPLOAD_URL is required for the http uploader")
                })?;
                if !simple_upload.upload_url.starts_with("http://")
                    && !simple_upload.upload_url.starts_with("https://")
                {
                    return Err(anyhow::anyhow!(
                        "SIMPLE_UPLOAD_URL must be an http(s) URL, got {}",
                        simple_upload.upload_url
                    ));
                }
            }
        }

        Ok(())
    }

    pub fn is_production(&self) -> bool {
        let environment = self.environment.to_lowercase();
        environment == "production" || environment == "prod"
    }

    pub fn audio_types(&self) -> &[String] {
        &self.audio.types
    }

    pub fn allow_multiple_files(&self) -> bool {
        self.audio.allow_multiple_files
    }

    pub fn local_storage_path(&self) -> Option<&str> {
        self.local_storage_path.as_deref()
    }

    pub fn local_storage_base_url(&self) -> Option<&str> {
        self.local_storage_base_url.as_deref()
    }
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse `Name=Value;Other=Value` header lists
fn parse_headers(value: &str) -> Result<BTreeMap<String, String>, anyhow::Error> {
    value
        .split(';')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (name, value) = pair
                .split_once('=')
                .ok_or_else(|| anyhow::anyhow!("Invalid header entry (expected Name=Value): {}", pair))?;
            Ok((name.trim().to_string(), value.trim().to_string()))
        })
        .collect()
}
