use crate::config::AudioUploadConfig;
use crate::error::{log_error, UploadError};
use crate::media_type::{MediaTypeError, MediaTypeMatcher};
use crate::models::FilePayload;

/// Which files may be uploaded, derived once from configuration.
///
/// Immutable after construction; shared read-only by the upload command and
/// the file picker.
#[derive(Debug, Clone)]
pub struct AcceptancePolicy {
    matcher: MediaTypeMatcher,
    allow_multiple_files: bool,
}

impl AcceptancePolicy {
    pub fn new<I, S>(types: I, allow_multiple_files: bool) -> Result<Self, MediaTypeError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Ok(Self {
            matcher: MediaTypeMatcher::build(types)?,
            allow_multiple_files,
        })
    }

    pub fn from_config(config: &AudioUploadConfig) -> Result<Self, MediaTypeError> {
        Self::new(&config.types, config.allow_multiple_files)
    }

    pub fn accepts(&self, mime_type: &str) -> bool {
        self.matcher.matches(mime_type)
    }

    pub fn types(&self) -> &[String] {
        self.matcher.subtypes()
    }

    pub fn allow_multiple_files(&self) -> bool {
        self.allow_multiple_files
    }

    pub fn matcher(&self) -> &MediaTypeMatcher {
        &self.matcher
    }

    /// `accept` attribute for the file picker
    pub fn accept_attribute(&self) -> String {
        self.matcher.accept_attribute()
    }

    /// Check a single file, returning `UnsupportedType` when it is rejected.
    pub fn check(&self, file: &FilePayload) -> Result<(), UploadError> {
        if self.accepts(&file.mime_type) {
            Ok(())
        } else {
            Err(UploadError::UnsupportedType {
                mime_type: file.mime_type.clone(),
                accepted: self.types().to_vec(),
            })
        }
    }

    /// Files of a batch that will actually be processed.
    ///
    /// Rejected files are excluded (and logged); when multiple files are not
    /// allowed only the first accepted file is kept.
    pub fn select(&self, files: Vec<FilePayload>) -> Vec<FilePayload> {
        let mut accepted = Vec::with_capacity(files.len());

        for file in files {
            if let Err(e) = self.check(&file) {
                log_error(&e, "Excluding file from upload batch");
                continue;
            }
            accepted.push(file);
            if !self.allow_multiple_files {
                break;
            }
        }

        accepted
    }
}
