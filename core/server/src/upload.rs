//! Spooling of multipart uploads to local disk.

use axum::extract::multipart::Field;
use futures::StreamExt;
use std::path::Path;
use tempfile::TempPath;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use tracing::{debug, warn};

use driverelay_common::Error;
use driverelay_storage::ByteStream;

use crate::error::ApiError;

/// MIME type used when the part does not declare one.
const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// An uploaded file held in a temporary file until it is sent upstream.
///
/// The temporary file is removed when this value is dropped, whichever way
/// the handler exits.
#[derive(Debug)]
pub struct SpooledUpload {
    /// Original file name from the multipart part.
    pub name: String,
    /// Content type from the multipart part.
    pub mime_type: String,
    path: TempPath,
}

impl SpooledUpload {
    /// Stream a multipart field into a new temporary file inside `dir`.
    ///
    /// # Errors
    /// - The field carries no file name (not a file attachment)
    /// - The multipart body is malformed, or too large (413)
    /// - The spool file cannot be written
    pub async fn from_field(dir: &Path, mut field: Field<'_>) -> Result<Self, ApiError> {
        let name = field
            .file_name()
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .ok_or_else(|| ApiError::BadRequest("No file uploaded".to_string()))?;
        let mime_type = field
            .content_type()
            .map(str::to_string)
            .unwrap_or_else(|| DEFAULT_MIME_TYPE.to_string());

        let (file, path) = tempfile::Builder::new()
            .prefix("upload-")
            .tempfile_in(dir)
            .map_err(ApiError::internal)?
            .into_parts();
        let mut file = tokio::fs::File::from_std(file);

        let mut size = 0u64;
        while let Some(chunk) = field.chunk().await? {
            file.write_all(&chunk).await.map_err(ApiError::internal)?;
            size += chunk.len() as u64;
        }
        file.flush().await.map_err(ApiError::internal)?;

        debug!(name = %name, size, "Upload spooled");

        Ok(Self {
            name,
            mime_type,
            path,
        })
    }

    /// Open the spooled content as a byte stream.
    pub async fn open(&self) -> Result<ByteStream, ApiError> {
        let file = tokio::fs::File::open(&self.path)
            .await
            .map_err(ApiError::internal)?;
        let stream = ReaderStream::new(file).map(|chunk| chunk.map_err(Error::Io));
        Ok(Box::pin(stream))
    }

    /// Remove the temporary file now, logging if that fails.
    pub fn cleanup(self) {
        if let Err(e) = self.path.close() {
            warn!(error = %e, "Failed to remove spooled upload");
        }
    }
}
