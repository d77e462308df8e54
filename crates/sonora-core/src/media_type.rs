//! Audio media type matching
//!
//! Builds the acceptance predicate used by the upload command and the file
//! picker from the configured list of audio subtypes (`mp3`, `wav`, ...).

use regex::Regex;

/// Prefix every accepted MIME type must carry.
pub const AUDIO_TYPE_PREFIX: &str = "audio/";

#[derive(Debug, thiserror::Error)]
pub enum MediaTypeError {
    #[error("Invalid media type pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

/// Predicate over MIME types of the exact form `audio/<subtype>`.
///
/// Subtypes are literal tokens. They are escaped before being embedded in the
/// pattern, so `x-matroska+opus` only matches itself.
#[derive(Debug, Clone)]
pub struct MediaTypeMatcher {
    subtypes: Vec<String>,
    pattern: Option<Regex>,
}

impl MediaTypeMatcher {
    /// Build a matcher from the accepted subtypes.
    ///
    /// Tokens are taken literally, whitespace included. Blank tokens are
    /// skipped. An empty list yields a matcher that rejects everything.
    pub fn build<I, S>(accepted_subtypes: I) -> Result<Self, MediaTypeError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let subtypes: Vec<String> = accepted_subtypes
            .into_iter()
            .map(|s| s.as_ref().to_string())
            .filter(|s| !s.trim().is_empty())
            .collect();

        if subtypes.is_empty() {
            return Ok(Self {
                subtypes,
                pattern: None,
            });
        }

        let alternatives = subtypes
            .iter()
            .map(|s| regex::escape(s))
            .collect::<Vec<_>>()
            .join("|");
        let pattern = Regex::new(&format!("^audio/({})$", alternatives))?;

        Ok(Self {
            subtypes,
            pattern: Some(pattern),
        })
    }

    /// Whether `mime_type` is one of the accepted audio types.
    pub fn matches(&self, mime_type: &str) -> bool {
        self.pattern
            .as_ref()
            .is_some_and(|pattern| pattern.is_match(mime_type))
    }

    pub fn subtypes(&self) -> &[String] {
        &self.subtypes
    }

    /// Source of the compiled pattern, if any subtype is accepted.
    pub fn pattern(&self) -> Option<&str> {
        self.pattern.as_ref().map(Regex::as_str)
    }

    /// Value for a file input `accept` attribute, e.g. `audio/mp3,audio/wav`.
    pub fn accept_attribute(&self) -> String {
        self.subtypes
            .iter()
            .map(|s| format!("{}{}", AUDIO_TYPE_PREFIX, s))
            .collect::<Vec<_>>()
            .join(",")
    }
}
