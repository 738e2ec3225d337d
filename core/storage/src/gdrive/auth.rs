//! OAuth2 authorization-code flow for Google.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use oauth2::{
    basic::BasicClient, AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken,
    EndpointNotSet, EndpointSet, RedirectUrl, Scope, TokenResponse, TokenUrl,
};
use serde::{Deserialize, Serialize};
use std::fmt;

use driverelay_common::{Error, Result, Tokens};

use super::{GoogleEndpoints, DRIVE_SCOPE};
use crate::provider::AuthorizationClient;

/// Basic client with authorization and token endpoints set.
type ConfiguredClient =
    BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// Server-side OAuth2 client configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct OAuthConfig {
    /// OAuth2 client ID.
    pub client_id: String,
    /// OAuth2 client secret.
    pub client_secret: String,
    /// Redirect URL registered for the callback route.
    pub redirect_url: String,
}

impl fmt::Debug for OAuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .field("redirect_url", &self.redirect_url)
            .finish()
    }
}

/// Authorization-code flow client for Google.
pub struct GoogleAuthClient {
    client: ConfiguredClient,
    http: oauth2::reqwest::Client,
}

impl GoogleAuthClient {
    /// Create a new authorization client.
    ///
    /// # Errors
    /// - Invalid authorization, token or redirect URL
    pub fn new(
        config: &OAuthConfig,
        endpoints: &GoogleEndpoints,
        http: oauth2::reqwest::Client,
    ) -> Result<Self> {
        let client = BasicClient::new(ClientId::new(config.client_id.clone()))
            .set_client_secret(ClientSecret::new(config.client_secret.clone()))
            .set_auth_uri(
                AuthUrl::new(endpoints.auth_url.clone())
                    .map_err(|e| Error::InvalidInput(format!("Invalid auth URL: {}", e)))?,
            )
            .set_token_uri(
                TokenUrl::new(endpoints.token_url.clone())
                    .map_err(|e| Error::InvalidInput(format!("Invalid token URL: {}", e)))?,
            )
            .set_redirect_uri(
                RedirectUrl::new(config.redirect_url.clone())
                    .map_err(|e| Error::InvalidInput(format!("Invalid redirect URL: {}", e)))?,
            );

        Ok(Self { client, http })
    }
}

#[async_trait]
impl AuthorizationClient for GoogleAuthClient {
    fn build_auth_url(&self) -> String {
        // The CSRF state is not kept: the server holds no session to check it against.
        let (auth_url, _state) = self
            .client
            .authorize_url(CsrfToken::new_random)
            .add_scope(Scope::new(DRIVE_SCOPE.to_string()))
            .add_extra_param("access_type", "offline")
            .add_extra_param("prompt", "consent")
            .add_extra_param("include_granted_scopes", "true")
            .url();

        auth_url.to_string()
    }

    async fn exchange_code(&self, code: &str) -> Result<Tokens> {
        let token_result = self
            .client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .request_async(&self.http)
            .await
            .map_err(|e| Error::Authentication(format!("Token exchange failed: {}", e)))?;

        let access_token = token_result.access_token().secret().clone();
        let refresh_token = token_result.refresh_token().map(|t| t.secret().clone());
        if refresh_token.is_none() {
            tracing::warn!("Code exchange returned no refresh token");
        }

        let expires_at = token_result.expires_in().map(|expires_in| {
            Utc::now() + Duration::from_std(expires_in).unwrap_or_else(|_| Duration::hours(1))
        });

        Ok(Tokens {
            access_token,
            refresh_token,
            expires_at,
        })
    }
}
