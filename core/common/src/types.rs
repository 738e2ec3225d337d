//! Request-scoped credential and file types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Authorization scheme accepted on protected routes.
const BEARER_PREFIX: &str = "Bearer ";

/// A caller-supplied OAuth2 access token.
///
/// The token is wiped from memory on drop and never printed by `Debug`.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct AccessToken(String);

impl AccessToken {
    /// Create a new access token.
    ///
    /// # Errors
    /// - Returns error if the token is empty
    pub fn new(token: impl Into<String>) -> crate::Result<Self> {
        let token = token.into();
        if token.is_empty() {
            return Err(crate::Error::InvalidInput(
                "Access token cannot be empty".to_string(),
            ));
        }
        Ok(Self(token))
    }

    /// Extract the token from an `Authorization: Bearer <token>` header value.
    ///
    /// Returns `None` when the value does not use the bearer scheme or the
    /// token part is empty. A second space after `Bearer` counts as an empty
    /// token, so such headers are treated as carrying no token at all.
    pub fn from_authorization_header(value: &str) -> Option<Self> {
        let rest = value.strip_prefix(BEARER_PREFIX)?;
        let token = rest.split(' ').next().unwrap_or_default();
        Self::new(token).ok()
    }

    /// Get the raw token for use in an upstream request.
    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

/// Tokens issued by the identity provider after a code exchange.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Tokens {
    /// Access token for API requests.
    pub access_token: String,
    /// Refresh token, present when offline access was granted.
    pub refresh_token: Option<String>,
    /// When the access token expires, if the provider said so.
    #[zeroize(skip)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl fmt::Debug for Tokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tokens")
            .field("access_token", &"***")
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Result of token introspection.
///
/// Mirrors the fields of Google's `tokeninfo` response that matter to callers;
/// everything is optional because the provider omits fields per token type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    /// Client the token was issued to.
    #[serde(default, rename = "aud")]
    pub audience: Option<String>,
    /// Space-separated scopes granted to the token.
    #[serde(default)]
    pub scope: Option<String>,
    /// Seconds until expiry, as reported by the provider.
    #[serde(default)]
    pub expires_in: Option<String>,
    /// Subject (user id).
    #[serde(default, rename = "sub")]
    pub subject: Option<String>,
    /// Account email, when the `email` scope was granted.
    #[serde(default)]
    pub email: Option<String>,
}

/// Read-only projection of a provider file's metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDescriptor {
    /// File ID.
    pub id: String,
    /// File name.
    pub name: String,
    /// MIME type.
    pub mime_type: String,
    /// Modification timestamp, passed through as the provider formats it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_time: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_access_token_from_header() {
        let token = AccessToken::from_authorization_header("Bearer abc.def").unwrap();
        assert_eq!(token.secret(), "abc.def");
    }

    #[test]
    fn test_access_token_rejects_other_schemes() {
        assert!(AccessToken::from_authorization_header("Basic dXNlcjpwYXNz").is_none());
        assert!(AccessToken::from_authorization_header("bearer abc").is_none());
        assert!(AccessToken::from_authorization_header("Bearer").is_none());
        assert!(AccessToken::from_authorization_header("Bearer ").is_none());
    }

    #[test]
    fn test_access_token_double_space_is_no_token() {
        // Empty first segment; the middleware answers "No token provided".
        assert!(AccessToken::from_authorization_header("Bearer  tok").is_none());
    }

    #[test]
    fn test_access_token_takes_first_segment() {
        let token = AccessToken::from_authorization_header("Bearer abc extra").unwrap();
        assert_eq!(token.secret(), "abc");
    }

    #[test]
    fn test_access_token_debug_is_redacted() {
        let token = AccessToken::new("super-secret").unwrap();
        assert_eq!(format!("{:?}", token), "AccessToken(***)");
    }

    #[test]
    fn test_tokens_debug_is_redacted() {
        let tokens = Tokens {
            access_token: "access".to_string(),
            refresh_token: Some("refresh".to_string()),
            expires_at: None,
        };
        let printed = format!("{:?}", tokens);
        assert!(!printed.contains("access\""));
        assert!(!printed.contains("refresh\""));
        assert!(printed.contains("has_refresh_token: true"));
    }

    #[test]
    fn test_token_info_from_tokeninfo_payload() {
        let json = r#"{
            "azp": "client.apps.googleusercontent.com",
            "aud": "client.apps.googleusercontent.com",
            "scope": "https://www.googleapis.com/auth/drive openid",
            "exp": "1700000000",
            "expires_in": "3599",
            "access_type": "offline"
        }"#;
        let info: TokenInfo = serde_json::from_str(json).unwrap();

        assert_eq!(info.audience.as_deref(), Some("client.apps.googleusercontent.com"));
        assert_eq!(info.expires_in.as_deref(), Some("3599"));
        assert_eq!(
            info.scope.as_deref(),
            Some("https://www.googleapis.com/auth/drive openid")
        );
        assert!(info.subject.is_none());
    }

    #[test]
    fn test_file_descriptor_omits_missing_modified_time() {
        let file = FileDescriptor {
            id: "1".to_string(),
            name: "File 1".to_string(),
            mime_type: "text/plain".to_string(),
            modified_time: None,
        };
        let json = serde_json::to_value(&file).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"id": "1", "name": "File 1", "mimeType": "text/plain"})
        );
    }

    #[test]
    fn test_file_descriptor_keeps_provider_timestamp() {
        let json = r#"{"id":"1","name":"a.txt","mimeType":"text/plain","modifiedTime":"2024-05-01T10:00:00.000Z"}"#;
        let file: FileDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(file.modified_time.as_deref(), Some("2024-05-01T10:00:00.000Z"));
        assert_eq!(serde_json::to_string(&file).unwrap(), json);
    }

    proptest! {
        #[test]
        fn prop_non_bearer_headers_are_rejected(value in "[^B].*") {
            prop_assert!(AccessToken::from_authorization_header(&value).is_none());
        }

        #[test]
        fn prop_bearer_tokens_round_trip(token in "[A-Za-z0-9._/-]{1,64}") {
            let header = format!("Bearer {}", token);
            let parsed = AccessToken::from_authorization_header(&header).unwrap();
            prop_assert_eq!(parsed.secret(), token.as_str());
        }
    }
}
