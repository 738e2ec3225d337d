//! HTTP-side configuration.

use std::path::PathBuf;
use url::Url;

use driverelay_common::{Error, Result};

/// Default request-body limit for uploads (100MB).
pub const DEFAULT_MAX_UPLOAD_SIZE: usize = 100 * 1024 * 1024;

/// Default directory for spooling uploads.
pub const DEFAULT_UPLOAD_DIR: &str = "uploads";

/// Server configuration, built once at startup.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Frontend URL the callback redirects to, with tokens appended.
    pub front_end_uri: Url,
    /// Directory where uploads are spooled before being sent upstream.
    pub upload_dir: PathBuf,
    /// Maximum accepted upload request body, in bytes.
    pub max_upload_size: usize,
    /// Allowed CORS origins; empty allows any origin.
    pub cors_origins: Vec<String>,
}

impl ServerConfig {
    /// Create a configuration with defaults for everything but the frontend URL.
    ///
    /// # Errors
    /// - `front_end_uri` is not an absolute URL
    pub fn new(front_end_uri: &str) -> Result<Self> {
        let front_end_uri = Url::parse(front_end_uri)
            .map_err(|e| Error::InvalidInput(format!("Invalid frontend URI: {}", e)))?;

        Ok(Self {
            front_end_uri,
            upload_dir: PathBuf::from(DEFAULT_UPLOAD_DIR),
            max_upload_size: DEFAULT_MAX_UPLOAD_SIZE,
            cors_origins: Vec::new(),
        })
    }

    /// Set the upload spool directory.
    pub fn with_upload_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.upload_dir = dir.into();
        self
    }

    /// Set the upload size limit.
    pub fn with_max_upload_size(mut self, bytes: usize) -> Self {
        self.max_upload_size = bytes;
        self
    }

    /// Restrict CORS to the given origins.
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = origins;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::new("http://localhost:5173/auth").unwrap();
        assert_eq!(config.front_end_uri.as_str(), "http://localhost:5173/auth");
        assert_eq!(config.upload_dir, PathBuf::from("uploads"));
        assert_eq!(config.max_upload_size, DEFAULT_MAX_UPLOAD_SIZE);
        assert!(config.cors_origins.is_empty());
    }

    #[test]
    fn test_relative_frontend_uri_rejected() {
        assert!(ServerConfig::new("/dashboard").is_err());
    }
}
