//! Google Drive API client.

use async_trait::async_trait;
use bytes::Bytes;
use futures::{stream, StreamExt};
use reqwest::{header, Client, Response};
use serde::Deserialize;
use std::sync::Arc;
use url::Url;

use driverelay_common::{AccessToken, Error, FileDescriptor, Result};

use super::GoogleEndpoints;
use crate::provider::{DriveApi, FileDownload, FileUpload};

/// Fields requested when listing files.
const LIST_FIELDS: &str = "nextPageToken, files(id, name, mimeType, modifiedTime)";
/// Page size for list requests (Drive's maximum).
const LIST_PAGE_SIZE: &str = "1000";

/// Response from listing files.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileListResponse {
    #[serde(default)]
    files: Vec<FileDescriptor>,
    #[serde(default)]
    next_page_token: Option<String>,
}

/// Response from creating a file.
#[derive(Debug, Deserialize)]
struct CreatedFile {
    id: String,
}

/// Google's JSON error envelope: `{"error": {"code": 404, "message": "..."}}`.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    message: Option<String>,
}

/// Drive client acting for one caller.
///
/// Holds the caller's access token and nothing else; the HTTP connection pool
/// is shared.
pub struct DriveClient {
    http: Client,
    token: AccessToken,
    endpoints: Arc<GoogleEndpoints>,
}

impl DriveClient {
    /// Create a new Drive client. Performs no I/O.
    pub fn new(http: Client, token: AccessToken, endpoints: Arc<GoogleEndpoints>) -> Self {
        Self {
            http,
            token,
            endpoints,
        }
    }

    /// Get authorization header.
    fn auth_header(&self) -> String {
        format!("Bearer {}", self.token.secret())
    }

    /// URL of a single file resource, with the ID escaped as one path segment.
    fn file_url(&self, file_id: &str) -> Result<Url> {
        let mut url = Url::parse(&self.endpoints.drive_api_base)
            .map_err(|e| Error::InvalidInput(format!("Invalid Drive API URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| Error::InvalidInput("Drive API URL cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(["files", file_id]);
        Ok(url)
    }

    /// Fetch one page of the file listing.
    async fn list_page(&self, page_token: Option<&str>) -> Result<FileListResponse> {
        let url = format!("{}/files", self.endpoints.drive_api_base);

        let mut request = self
            .http
            .get(&url)
            .header(header::AUTHORIZATION, self.auth_header())
            .query(&[("fields", LIST_FIELDS), ("pageSize", LIST_PAGE_SIZE)]);

        if let Some(token) = page_token {
            request = request.query(&[("pageToken", token)]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::Network(format!("Failed to list files: {}", e)))?;

        handle_response(response).await
    }
}

#[async_trait]
impl DriveApi for DriveClient {
    async fn list_files(&self) -> Result<Vec<FileDescriptor>> {
        let mut all_files = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let page = self.list_page(page_token.as_deref()).await?;
            all_files.extend(page.files);

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(all_files)
    }

    async fn create_file(&self, upload: FileUpload) -> Result<String> {
        let url = format!("{}/files", self.endpoints.drive_upload_base);
        let boundary = format!("driverelay-{}", uuid::Uuid::new_v4().simple());

        let metadata = serde_json::json!({ "name": upload.name });
        let metadata_json = serde_json::to_string(&metadata)
            .map_err(|e| Error::Serialization(format!("Failed to serialize metadata: {}", e)))?;

        // Metadata part, then the media part header; the media bytes stream after it.
        let head = format!(
            "--{b}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{meta}\r\n\
             --{b}\r\nContent-Type: {mime}\r\n\r\n",
            b = boundary,
            meta = metadata_json,
            mime = upload.mime_type,
        );
        let tail = format!("\r\n--{}--\r\n", boundary);

        let body = stream::once(async move { Ok::<_, Error>(Bytes::from(head)) })
            .chain(upload.body)
            .chain(stream::once(async move { Ok(Bytes::from(tail)) }));

        let response = self
            .http
            .post(&url)
            .header(header::AUTHORIZATION, self.auth_header())
            .header(
                header::CONTENT_TYPE,
                format!("multipart/related; boundary={}", boundary),
            )
            .query(&[("uploadType", "multipart"), ("fields", "id")])
            .body(reqwest::Body::wrap_stream(body))
            .send()
            .await
            .map_err(|e| Error::Network(format!("Failed to upload file: {}", e)))?;

        let created: CreatedFile = handle_response(response).await?;
        Ok(created.id)
    }

    async fn get_file_stream(&self, file_id: &str) -> Result<FileDownload> {
        let url = self.file_url(file_id)?;

        let response = self
            .http
            .get(url)
            .header(header::AUTHORIZATION, self.auth_header())
            .query(&[("alt", "media")])
            .send()
            .await
            .map_err(|e| Error::Network(format!("Failed to start download: {}", e)))?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let content_length = response.content_length();

        let body = response
            .bytes_stream()
            .map(|result| result.map_err(|e| Error::Network(format!("Stream read error: {}", e))));

        Ok(FileDownload {
            content_type,
            content_length,
            body: Box::pin(body),
        })
    }

    async fn delete_file(&self, file_id: &str) -> Result<()> {
        let url = self.file_url(file_id)?;

        let response = self
            .http
            .delete(url)
            .header(header::AUTHORIZATION, self.auth_header())
            .send()
            .await
            .map_err(|e| Error::Network(format!("Failed to delete file: {}", e)))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(error_from_response(response).await)
        }
    }
}

/// Handle API response with error checking.
async fn handle_response<T: serde::de::DeserializeOwned>(response: Response) -> Result<T> {
    if response.status().is_success() {
        response
            .json()
            .await
            .map_err(|e| Error::Serialization(format!("Failed to parse response: {}", e)))
    } else {
        Err(error_from_response(response).await)
    }
}

/// Turn a non-success response into an [`Error::Api`], keeping the provider's
/// message when the body is Google's error envelope.
async fn error_from_response(response: Response) -> Error {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let message = parse_error_message(&body);

    tracing::debug!(status, "Drive API returned an error");

    Error::Api { status, message }
}

fn parse_error_message(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .and_then(|envelope| envelope.error.message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, header as header_eq, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> DriveClient {
        DriveClient::new(
            Client::new(),
            AccessToken::new("mock-access-token").unwrap(),
            Arc::new(GoogleEndpoints::with_base(&server.uri())),
        )
    }

    #[test]
    fn test_parse_error_message() {
        let body = r#"{"error":{"code":404,"message":"File not found: 123.","errors":[]}}"#;
        assert_eq!(parse_error_message(body).as_deref(), Some("File not found: 123."));
        assert_eq!(parse_error_message("Service Unavailable"), None);
        assert_eq!(parse_error_message(r#"{"error":"invalid_token"}"#), None);
    }

    #[tokio::test]
    async fn test_file_url_escapes_id() {
        let server = MockServer::start().await;
        let client = client_for(&server);

        let url = client.file_url("../about").unwrap();
        assert!(url.path().ends_with("/drive/v3/files/..%2Fabout"));
    }

    #[tokio::test]
    async fn test_list_files_follows_pages() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/drive/v3/files"))
            .and(query_param("pageToken", "page-2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "files": [{"id": "2", "name": "File 2", "mimeType": "image/png"}]
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/drive/v3/files"))
            .and(header_eq("authorization", "Bearer mock-access-token"))
            .and(query_param("fields", LIST_FIELDS))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "nextPageToken": "page-2",
                "files": [{
                    "id": "1",
                    "name": "File 1",
                    "mimeType": "text/plain",
                    "modifiedTime": "2024-05-01T10:00:00.000Z"
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let files = client_for(&server).list_files().await.unwrap();

        assert_eq!(files.len(), 2);
        assert_eq!(files[0].id, "1");
        assert_eq!(files[0].modified_time.as_deref(), Some("2024-05-01T10:00:00.000Z"));
        assert_eq!(files[1].name, "File 2");
    }

    #[tokio::test]
    async fn test_list_files_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/drive/v3/files"))
            .respond_with(ResponseTemplate::new(403).set_body_json(serde_json::json!({
                "error": {"code": 403, "message": "Insufficient Permission"}
            })))
            .mount(&server)
            .await;

        let err = client_for(&server).list_files().await.unwrap_err();

        assert_eq!(err.provider_message(), Some("Insufficient Permission"));
    }

    #[tokio::test]
    async fn test_create_file_multipart_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/upload/drive/v3/files"))
            .and(query_param("uploadType", "multipart"))
            .and(body_string_contains(r#"{"name":"mock-file.txt"}"#))
            .and(body_string_contains("Content-Type: text/plain"))
            .and(body_string_contains("mock content"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "new-id"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let upload = FileUpload {
            name: "mock-file.txt".to_string(),
            mime_type: "text/plain".to_string(),
            body: Box::pin(stream::iter(vec![
                Ok::<_, Error>(Bytes::from_static(b"mock ")),
                Ok(Bytes::from_static(b"content")),
            ])),
        };

        let id = client_for(&server).create_file(upload).await.unwrap();
        assert_eq!(id, "new-id");
    }

    #[tokio::test]
    async fn test_get_file_stream() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/drive/v3/files/abc"))
            .and(query_param("alt", "media"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/plain")
                    .set_body_bytes(b"hello drive".to_vec()),
            )
            .mount(&server)
            .await;

        let download = client_for(&server).get_file_stream("abc").await.unwrap();
        assert_eq!(download.content_type.as_deref(), Some("text/plain"));

        let chunks: Vec<Bytes> = download
            .body
            .map(|chunk| chunk.unwrap())
            .collect()
            .await;
        assert_eq!(chunks.concat(), b"hello drive");
    }

    #[tokio::test]
    async fn test_get_file_stream_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/drive/v3/files/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "error": {"code": 404, "message": "File not found: missing."}
            })))
            .mount(&server)
            .await;

        let result = client_for(&server).get_file_stream("missing").await;
        match result {
            Err(Error::Api { status, message }) => {
                assert_eq!(status, 404);
                assert_eq!(message.as_deref(), Some("File not found: missing."));
            }
            Err(other) => panic!("unexpected error: {:?}", other),
            Ok(_) => panic!("expected an error"),
        }
    }

    #[tokio::test]
    async fn test_delete_file() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/drive/v3/files/1"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server).delete_file("1").await.unwrap();
    }
}
