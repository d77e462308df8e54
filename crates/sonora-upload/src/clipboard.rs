//! Clipboard and drag-and-drop payloads.

use sonora_core::FilePayload;
use std::collections::BTreeMap;

pub const HTML_TYPE: &str = "text/html";
pub const PLAIN_TEXT_TYPE: &str = "text/plain";

/// What a paste or drop carries: string data by type, plus files.
#[derive(Debug, Clone, Default)]
pub struct DataTransfer {
    data: BTreeMap<String, String>,
    files: Vec<FilePayload>,
}

impl DataTransfer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_data(mut self, data_type: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.insert(data_type.into(), value.into());
        self
    }

    pub fn with_file(mut self, file: FilePayload) -> Self {
        self.files.push(file);
        self
    }

    pub fn get_data(&self, data_type: &str) -> Option<&str> {
        self.data.get(data_type).map(String::as_str)
    }

    pub fn types(&self) -> impl Iterator<Item = &str> {
        self.data.keys().map(String::as_str)
    }

    pub fn files(&self) -> &[FilePayload] {
        &self.files
    }

    pub fn into_files(self) -> Vec<FilePayload> {
        self.files
    }

    /// Whether the transfer carries markup. The host pastes markup itself;
    /// files are only uploaded when there is none.
    pub fn is_html_included(&self) -> bool {
        self.get_data(HTML_TYPE).is_some_and(|html| !html.is_empty())
    }
}
