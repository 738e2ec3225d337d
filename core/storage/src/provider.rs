//! Provider capability traits.
//!
//! The HTTP layer only ever talks to the identity provider and the storage API
//! through these traits, so it can run against the Google adapters in
//! production and against [`crate::MemoryProvider`] in tests.

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;

use driverelay_common::{AccessToken, FileDescriptor, Result, TokenInfo, Tokens};

/// Byte stream type for upload/download bodies.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// A file to be created in the caller's drive.
pub struct FileUpload {
    /// Original file name, stored as the file's metadata name.
    pub name: String,
    /// MIME type of the content.
    pub mime_type: String,
    /// File content.
    pub body: ByteStream,
}

/// Raw file content streamed back from the provider.
pub struct FileDownload {
    /// Content type reported by the provider.
    pub content_type: Option<String>,
    /// Content length reported by the provider.
    pub content_length: Option<u64>,
    /// File content.
    pub body: ByteStream,
}

/// Client for the authorization-code flow, configured with the server's
/// OAuth credentials.
#[async_trait]
pub trait AuthorizationClient: Send + Sync {
    /// Build the consent URL the user is redirected to.
    ///
    /// The URL requests offline access, forces the consent screen and asks for
    /// the full drive scope.
    fn build_auth_url(&self) -> String;

    /// Exchange an authorization code for tokens.
    ///
    /// # Errors
    /// - Invalid or expired code
    /// - Network errors
    async fn exchange_code(&self, code: &str) -> Result<Tokens>;
}

/// Verifies bearer tokens against the identity provider.
#[async_trait]
pub trait TokenIntrospector: Send + Sync {
    /// Validate `token` and return what the provider knows about it.
    ///
    /// # Errors
    /// - Revoked, expired or malformed token
    /// - Network errors
    async fn introspect_token(&self, token: &AccessToken) -> Result<TokenInfo>;
}

/// File operations against the storage API, on behalf of one caller.
///
/// A `DriveApi` handle is built per request from the caller's access token
/// and dropped when the request completes.
#[async_trait]
pub trait DriveApi: Send + Sync {
    /// List id, name, MIME type and modification time of every accessible file.
    async fn list_files(&self) -> Result<Vec<FileDescriptor>>;

    /// Create a file and return its ID.
    async fn create_file(&self, upload: FileUpload) -> Result<String>;

    /// Open a stream over the raw content of a file.
    async fn get_file_stream(&self, file_id: &str) -> Result<FileDownload>;

    /// Delete a file.
    async fn delete_file(&self, file_id: &str) -> Result<()>;
}

/// Builds provider clients.
pub trait ClientFactory: Send + Sync {
    /// Build a client configured with the server's client id, secret and
    /// redirect URI. Used only by the login flow.
    ///
    /// # Errors
    /// - Invalid OAuth endpoint or redirect configuration
    fn new_authorization_client(&self) -> Result<Box<dyn AuthorizationClient>>;

    /// Build a client carrying only the caller's access token.
    ///
    /// Performs no network I/O.
    fn new_client_from_token(&self, token: AccessToken) -> Box<dyn DriveApi>;
}
