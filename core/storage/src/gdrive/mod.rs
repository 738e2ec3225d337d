//! Google identity and Google Drive adapters.
//!
//! - OAuth2 authorization-code flow (`auth`)
//! - Access-token introspection through `tokeninfo` (`introspect`)
//! - Drive v3 file list/create/get/delete (`client`)
//! - A client factory tying them to one shared HTTP connection pool (`provider`)

pub mod auth;
pub mod client;
pub mod introspect;
pub mod provider;

pub use auth::{GoogleAuthClient, OAuthConfig};
pub use client::DriveClient;
pub use introspect::GoogleTokenInfo;
pub use provider::GoogleProvider;

/// The only scope requested: full drive access.
pub const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive";

/// Base URLs of the Google services the adapters talk to.
///
/// Overridable so the adapters can be pointed at a local mock server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoogleEndpoints {
    /// OAuth2 authorization endpoint.
    pub auth_url: String,
    /// OAuth2 token endpoint.
    pub token_url: String,
    /// Access-token introspection endpoint.
    pub tokeninfo_url: String,
    /// Drive API base URL.
    pub drive_api_base: String,
    /// Drive upload API base URL.
    pub drive_upload_base: String,
}

impl Default for GoogleEndpoints {
    fn default() -> Self {
        Self {
            auth_url: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
            token_url: "https://oauth2.googleapis.com/token".to_string(),
            tokeninfo_url: "https://oauth2.googleapis.com/tokeninfo".to_string(),
            drive_api_base: "https://www.googleapis.com/drive/v3".to_string(),
            drive_upload_base: "https://www.googleapis.com/upload/drive/v3".to_string(),
        }
    }
}

impl GoogleEndpoints {
    /// Point every endpoint at `base`, using the same paths as Google.
    pub fn with_base(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            auth_url: format!("{}/o/oauth2/v2/auth", base),
            token_url: format!("{}/token", base),
            tokeninfo_url: format!("{}/tokeninfo", base),
            drive_api_base: format!("{}/drive/v3", base),
            drive_upload_base: format!("{}/upload/drive/v3", base),
        }
    }
}
