//! Google client factory.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use driverelay_common::{AccessToken, Error, Result, TokenInfo};

use super::auth::{GoogleAuthClient, OAuthConfig};
use super::client::DriveClient;
use super::introspect::GoogleTokenInfo;
use super::GoogleEndpoints;
use crate::provider::{AuthorizationClient, ClientFactory, DriveApi, TokenIntrospector};

/// User agent sent on every upstream request.
const USER_AGENT: &str = concat!("driverelay/", env!("CARGO_PKG_VERSION"));

/// Builds Google clients from server configuration or caller tokens.
///
/// Holds configuration and connection pools only; no credential of any caller
/// is retained.
#[derive(Clone)]
pub struct GoogleProvider {
    config: OAuthConfig,
    endpoints: Arc<GoogleEndpoints>,
    http: reqwest::Client,
    oauth_http: oauth2::reqwest::Client,
    introspector: GoogleTokenInfo,
}

impl GoogleProvider {
    /// Create a provider talking to Google's production endpoints.
    ///
    /// `timeout` bounds connecting and each read from the provider; `None`
    /// leaves upstream calls unbounded.
    ///
    /// # Errors
    /// - Invalid OAuth configuration
    /// - HTTP client construction failed
    pub fn new(config: OAuthConfig, timeout: Option<Duration>) -> Result<Self> {
        Self::with_endpoints(config, GoogleEndpoints::default(), timeout)
    }

    /// Create a provider talking to custom endpoints.
    pub fn with_endpoints(
        config: OAuthConfig,
        endpoints: GoogleEndpoints,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = timeout {
            builder = builder.connect_timeout(timeout).read_timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| Error::InvalidInput(format!("Failed to create HTTP client: {}", e)))?;

        // Token endpoints must not be followed through redirects.
        let mut oauth_builder = oauth2::reqwest::ClientBuilder::new()
            .user_agent(USER_AGENT)
            .redirect(oauth2::reqwest::redirect::Policy::none());
        if let Some(timeout) = timeout {
            oauth_builder = oauth_builder.timeout(timeout);
        }
        let oauth_http = oauth_builder
            .build()
            .map_err(|e| Error::InvalidInput(format!("Failed to create OAuth client: {}", e)))?;

        // Fail at startup rather than on the first login.
        GoogleAuthClient::new(&config, &endpoints, oauth_http.clone())?;

        let introspector = GoogleTokenInfo::new(http.clone(), endpoints.tokeninfo_url.clone());

        Ok(Self {
            config,
            endpoints: Arc::new(endpoints),
            http,
            oauth_http,
            introspector,
        })
    }
}

impl ClientFactory for GoogleProvider {
    fn new_authorization_client(&self) -> Result<Box<dyn AuthorizationClient>> {
        let client = GoogleAuthClient::new(&self.config, &self.endpoints, self.oauth_http.clone())?;
        Ok(Box::new(client))
    }

    fn new_client_from_token(&self, token: AccessToken) -> Box<dyn DriveApi> {
        Box::new(DriveClient::new(
            self.http.clone(),
            token,
            self.endpoints.clone(),
        ))
    }
}

#[async_trait]
impl TokenIntrospector for GoogleProvider {
    async fn introspect_token(&self, token: &AccessToken) -> Result<TokenInfo> {
        self.introspector.introspect_token(token).await
    }
}
