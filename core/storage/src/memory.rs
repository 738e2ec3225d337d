//! In-memory provider for testing.
//!
//! Implements every provider capability against an in-process file table and
//! records each call so tests can assert on exactly what reached the
//! "upstream". Clones share state.

use async_trait::async_trait;
use bytes::Bytes;
use futures::{stream, StreamExt};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use url::form_urlencoded;

use driverelay_common::{AccessToken, Error, FileDescriptor, Result, TokenInfo, Tokens};

use crate::gdrive::DRIVE_SCOPE;
use crate::provider::{
    AuthorizationClient, ClientFactory, DriveApi, FileDownload, FileUpload, TokenIntrospector,
};

/// Base of the consent URL produced by the fake authorization client.
const MEMORY_AUTH_URL: &str = "https://auth.memory.invalid/authorize";

/// Provider operations, used to prime failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ExchangeCode,
    IntrospectToken,
    ListFiles,
    CreateFile,
    GetFileStream,
    DeleteFile,
}

/// A call that reached the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    BuildAuthUrl,
    ExchangeCode { code: String },
    IntrospectToken,
    ListFiles,
    CreateFile {
        name: String,
        mime_type: String,
        content: Vec<u8>,
    },
    GetFileStream { file_id: String },
    DeleteFile { file_id: String },
}

/// How a primed failure surfaces.
#[derive(Debug, Clone)]
enum Failure {
    Network(String),
    Api { status: u16, message: Option<String> },
}

impl Failure {
    fn to_error(&self) -> Error {
        match self {
            Failure::Network(message) => Error::Network(message.clone()),
            Failure::Api { status, message } => Error::Api {
                status: *status,
                message: message.clone(),
            },
        }
    }
}

#[derive(Default)]
struct State {
    files: Vec<(FileDescriptor, Vec<u8>)>,
    valid_tokens: HashSet<String>,
    grants: HashMap<String, Tokens>,
    failures: HashMap<Operation, Failure>,
    calls: Vec<Call>,
    created: usize,
}

/// In-memory provider.
#[derive(Clone, Default)]
pub struct MemoryProvider {
    state: Arc<Mutex<State>>,
}

impl MemoryProvider {
    /// Create an empty provider that accepts no tokens.
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept `token` during introspection.
    pub fn with_valid_token(self, token: &str) -> Self {
        self.state.lock().unwrap().valid_tokens.insert(token.to_string());
        self
    }

    /// Answer a code exchange for `code` with `tokens`.
    pub fn with_grant(self, code: &str, tokens: Tokens) -> Self {
        self.state
            .lock()
            .unwrap()
            .grants
            .insert(code.to_string(), tokens);
        self
    }

    /// Seed a file.
    pub fn with_file(self, file: FileDescriptor, content: impl Into<Vec<u8>>) -> Self {
        self.state.lock().unwrap().files.push((file, content.into()));
        self
    }

    /// Make `operation` fail with a transport error.
    pub fn fail_with_network_error(self, operation: Operation, message: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .failures
            .insert(operation, Failure::Network(message.to_string()));
        self
    }

    /// Make `operation` fail with a provider error response.
    pub fn fail_with_api_error(
        self,
        operation: Operation,
        status: u16,
        message: Option<&str>,
    ) -> Self {
        self.state.lock().unwrap().failures.insert(
            operation,
            Failure::Api {
                status,
                message: message.map(str::to_string),
            },
        );
        self
    }

    /// Calls recorded so far, oldest first.
    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Files currently stored.
    pub fn files(&self) -> Vec<FileDescriptor> {
        self.state
            .lock()
            .unwrap()
            .files
            .iter()
            .map(|(file, _)| file.clone())
            .collect()
    }

    /// Record `call` and return the primed failure for `operation`, if any.
    fn record(&self, call: Call, operation: Option<Operation>) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);
        match operation.and_then(|op| state.failures.get(&op)) {
            Some(failure) => Err(failure.to_error()),
            None => Ok(()),
        }
    }
}

impl ClientFactory for MemoryProvider {
    fn new_authorization_client(&self) -> Result<Box<dyn AuthorizationClient>> {
        Ok(Box::new(self.clone()))
    }

    fn new_client_from_token(&self, _token: AccessToken) -> Box<dyn DriveApi> {
        Box::new(self.clone())
    }
}

#[async_trait]
impl AuthorizationClient for MemoryProvider {
    fn build_auth_url(&self) -> String {
        // Recording cannot fail without a primed operation.
        let _ = self.record(Call::BuildAuthUrl, None);

        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("client_id", "memory")
            .append_pair("response_type", "code")
            .append_pair("scope", DRIVE_SCOPE)
            .append_pair("access_type", "offline")
            .append_pair("prompt", "consent")
            .finish();
        format!("{}?{}", MEMORY_AUTH_URL, query)
    }

    async fn exchange_code(&self, code: &str) -> Result<Tokens> {
        self.record(
            Call::ExchangeCode {
                code: code.to_string(),
            },
            Some(Operation::ExchangeCode),
        )?;

        self.state
            .lock()
            .unwrap()
            .grants
            .get(code)
            .cloned()
            .ok_or_else(|| Error::Authentication("invalid_grant".to_string()))
    }
}

#[async_trait]
impl TokenIntrospector for MemoryProvider {
    async fn introspect_token(&self, token: &AccessToken) -> Result<TokenInfo> {
        self.record(Call::IntrospectToken, Some(Operation::IntrospectToken))?;

        if !self.state.lock().unwrap().valid_tokens.contains(token.secret()) {
            return Err(Error::Authentication("invalid_token".to_string()));
        }

        Ok(TokenInfo {
            audience: Some("memory".to_string()),
            scope: Some(DRIVE_SCOPE.to_string()),
            expires_in: Some("3599".to_string()),
            subject: None,
            email: None,
        })
    }
}

#[async_trait]
impl DriveApi for MemoryProvider {
    async fn list_files(&self) -> Result<Vec<FileDescriptor>> {
        self.record(Call::ListFiles, Some(Operation::ListFiles))?;
        Ok(self.files())
    }

    async fn create_file(&self, upload: FileUpload) -> Result<String> {
        let mut content = Vec::new();
        let mut body = upload.body;
        while let Some(chunk) = body.next().await {
            content.extend_from_slice(&chunk?);
        }

        self.record(
            Call::CreateFile {
                name: upload.name.clone(),
                mime_type: upload.mime_type.clone(),
                content: content.clone(),
            },
            Some(Operation::CreateFile),
        )?;

        let mut state = self.state.lock().unwrap();
        state.created += 1;
        let id = format!("memory-file-{}", state.created);
        state.files.push((
            FileDescriptor {
                id: id.clone(),
                name: upload.name,
                mime_type: upload.mime_type,
                modified_time: None,
            },
            content,
        ));

        Ok(id)
    }

    async fn get_file_stream(&self, file_id: &str) -> Result<FileDownload> {
        self.record(
            Call::GetFileStream {
                file_id: file_id.to_string(),
            },
            Some(Operation::GetFileStream),
        )?;

        let state = self.state.lock().unwrap();
        let (file, content) = state
            .files
            .iter()
            .find(|(file, _)| file.id == file_id)
            .ok_or_else(|| Error::Api {
                status: 404,
                message: Some(format!("File not found: {}.", file_id)),
            })?;

        let chunks: Vec<Result<Bytes>> = content
            .chunks(4)
            .map(|chunk| Ok(Bytes::copy_from_slice(chunk)))
            .collect();

        Ok(FileDownload {
            content_type: Some(file.mime_type.clone()),
            content_length: Some(content.len() as u64),
            body: Box::pin(stream::iter(chunks)),
        })
    }

    async fn delete_file(&self, file_id: &str) -> Result<()> {
        self.record(
            Call::DeleteFile {
                file_id: file_id.to_string(),
            },
            Some(Operation::DeleteFile),
        )?;

        let mut state = self.state.lock().unwrap();
        let before = state.files.len();
        state.files.retain(|(file, _)| file.id != file_id);
        if state.files.len() == before {
            return Err(Error::Api {
                status: 404,
                message: Some(format!("File not found: {}.", file_id)),
            });
        }
        Ok(())
    }
}
