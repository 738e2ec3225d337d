//! Access-token verification through Google's `tokeninfo` endpoint.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use driverelay_common::{AccessToken, Error, Result, TokenInfo};

use crate::provider::TokenIntrospector;

/// Error body returned by `tokeninfo` for rejected tokens.
#[derive(Debug, Deserialize)]
struct TokenInfoError {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

/// Token introspection against Google's `tokeninfo` endpoint.
#[derive(Clone)]
pub struct GoogleTokenInfo {
    http: Client,
    tokeninfo_url: String,
}

impl GoogleTokenInfo {
    /// Create a new introspector using a shared HTTP client.
    pub fn new(http: Client, tokeninfo_url: impl Into<String>) -> Self {
        Self {
            http,
            tokeninfo_url: tokeninfo_url.into(),
        }
    }
}

#[async_trait]
impl TokenIntrospector for GoogleTokenInfo {
    async fn introspect_token(&self, token: &AccessToken) -> Result<TokenInfo> {
        let response = self
            .http
            .get(&self.tokeninfo_url)
            .query(&[("access_token", token.secret())])
            .send()
            .await
            // The URL carries the token; keep it out of the error.
            .map_err(|e| {
                Error::Network(format!("Token introspection failed: {}", e.without_url()))
            })?;

        let status = response.status();
        if status.is_success() {
            return response
                .json()
                .await
                .map_err(|e| {
                    Error::Serialization(format!("Invalid tokeninfo response: {}", e.without_url()))
                });
        }

        let body: Option<TokenInfoError> = response.json().await.ok();
        let reason = body
            .and_then(|b| b.error_description.or(b.error))
            .unwrap_or_else(|| status.to_string());

        Err(Error::Authentication(format!("Token rejected: {}", reason)))
    }
}
