//! File operations on the caller's drive.
//!
//! Each handler builds a drive client from the token the middleware
//! validated, makes one upstream call and drops the client.

use axum::{
    extract::{
        multipart::MultipartRejection,
        rejection::PathRejection,
        Multipart, Path, State,
    },
    http::{header, StatusCode},
    response::Response,
    Extension, Json,
};
use serde::Serialize;
use tracing::{debug, info};

use driverelay_common::FileDescriptor;
use driverelay_storage::FileUpload;

use crate::download::stream_body;
use crate::error::ApiError;
use crate::middleware::Authenticated;
use crate::server::AppState;
use crate::upload::SpooledUpload;

/// Multipart field carrying the uploaded file.
const UPLOAD_FIELD: &str = "file";

/// Body of a successful upload.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub file_id: String,
}

/// Body of a successful delete.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// `GET /files`
pub async fn list_files(
    State(state): State<AppState>,
    Extension(caller): Extension<Authenticated>,
) -> Result<Json<Vec<FileDescriptor>>, ApiError> {
    let drive = state.clients.new_client_from_token(caller.token);

    let files = drive
        .list_files()
        .await
        .map_err(|e| ApiError::upstream(e, "Failed to fetch files"))?;

    debug!(count = files.len(), "Files listed");
    Ok(Json(files))
}

/// `POST /upload`
pub async fn upload_file(
    State(state): State<AppState>,
    Extension(caller): Extension<Authenticated>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut multipart = multipart?;
    let spooled = loop {
        let field = multipart
            .next_field()
            .await?
            .ok_or_else(|| ApiError::BadRequest("No file uploaded".to_string()))?;

        if field.name() == Some(UPLOAD_FIELD) {
            break SpooledUpload::from_field(&state.config.upload_dir, field).await?;
        }
    };

    let drive = state.clients.new_client_from_token(caller.token);
    let upload = FileUpload {
        name: spooled.name.clone(),
        mime_type: spooled.mime_type.clone(),
        body: spooled.open().await?,
    };

    let result = drive.create_file(upload).await;
    spooled.cleanup();

    let file_id = result.map_err(|e| ApiError::upstream(e, "Failed to upload file"))?;

    info!(file_id = %file_id, "File uploaded");
    Ok(Json(UploadResponse { file_id }))
}

/// `GET /download/{file_id}`
pub async fn download_file(
    State(state): State<AppState>,
    Extension(caller): Extension<Authenticated>,
    file_id: Result<Path<String>, PathRejection>,
) -> Result<Response, ApiError> {
    let Path(file_id) = file_id?;
    let drive = state.clients.new_client_from_token(caller.token);

    let download = drive
        .get_file_stream(&file_id)
        .await
        .map_err(|e| ApiError::upstream(e, "Failed to download file"))?;

    let content_type = download
        .content_type
        .unwrap_or_else(|| "application/octet-stream".to_string());

    let mut response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type);
    if let Some(length) = download.content_length {
        response = response.header(header::CONTENT_LENGTH, length);
    }

    response
        .body(stream_body(download.body, &file_id))
        .map_err(ApiError::internal)
}

/// `DELETE /delete/{file_id}`
pub async fn delete_file(
    State(state): State<AppState>,
    Extension(caller): Extension<Authenticated>,
    file_id: Result<Path<String>, PathRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Path(file_id) = file_id?;
    let drive = state.clients.new_client_from_token(caller.token);

    drive
        .delete_file(&file_id)
        .await
        .map_err(|e| ApiError::upstream(e, "Failed to delete file"))?;

    info!(file_id = %file_id, "File deleted");
    Ok(Json(MessageResponse {
        message: "File deleted successfully.".to_string(),
    }))
}
