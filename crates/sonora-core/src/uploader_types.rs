use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Uploader backend types
///
/// Defined in core because configuration selects the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploaderBackend {
    /// Files are written into a local directory served under a base URL
    Local,
    /// Files are POSTed to a simple-upload HTTP endpoint
    Http,
}

impl FromStr for UploaderBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" => Ok(UploaderBackend::Local),
            "http" | "simple" => Ok(UploaderBackend::Http),
            _ => Err(anyhow::anyhow!("Invalid uploader backend: {}", s)),
        }
    }
}

impl Display for UploaderBackend {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            UploaderBackend::Local => write!(f, "local"),
            UploaderBackend::Http => write!(f, "http"),
        }
    }
}
