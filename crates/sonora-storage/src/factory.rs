#[cfg(feature = "uploader-http")]
use crate::HttpUploader;
#[cfg(feature = "uploader-local")]
use crate::LocalUploader;
use crate::{FileUploader, UploaderBackend, UploaderError, UploaderResult};
use sonora_core::Config;
use std::sync::Arc;

/// Create an uploader backend based on configuration
pub async fn create_uploader(config: &Config) -> UploaderResult<Arc<dyn FileUploader>> {
    match config.uploader_backend {
        #[cfg(feature = "uploader-local")]
        UploaderBackend::Local => {
            let base_path = config
                .local_storage_path()
                .map(String::from)
                .ok_or_else(|| {
                    UploaderError::ConfigError("LOCAL_STORAGE_PATH not configured".to_string())
                })?;
            let base_url = config
                .local_storage_base_url()
                .map(String::from)
                .ok_or_else(|| {
                    UploaderError::ConfigError("LOCAL_STORAGE_BASE_URL not configured".to_string())
                })?;

            let uploader = LocalUploader::new(base_path, base_url).await?;
            Ok(Arc::new(uploader))
        }

        #[cfg(not(feature = "uploader-local"))]
        UploaderBackend::Local => Err(UploaderError::ConfigError(
            "Local uploader backend not available (uploader-local feature not enabled)".to_string(),
        )),

        #[cfg(feature = "uploader-http")]
        UploaderBackend::Http => {
            let simple_upload = config.simple_upload.as_ref().ok_or_else(|| {
                UploaderError::ConfigError("SIMPLE_UPLOAD_URL not configured".to_string())
            })?;

            let uploader = HttpUploader::new(simple_upload)?;
            Ok(Arc::new(uploader))
        }

        #[cfg(not(feature = "uploader-http"))]
        UploaderBackend::Http => Err(UploaderError::ConfigError(
            "HTTP uploader backend not available (uploader-http feature not enabled)".to_string(),
        )),
    }
}
