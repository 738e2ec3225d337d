//! Authorization-code flow: consent redirect and code exchange.
//!
//! Nothing is kept between the two steps; the flow's only state is what
//! travels through the browser redirects.

use axum::{
    extract::{Query, State},
    response::Response,
};
use serde::Deserialize;
use tracing::{info, warn};
use url::Url;

use driverelay_common::Tokens;

use super::found;
use crate::error::ApiError;
use crate::server::AppState;

/// Query parameters Google sends to the redirect URI.
#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    /// Authorization code.
    pub code: Option<String>,
    /// Set instead of `code` when the user denied consent.
    pub error: Option<String>,
}

/// `GET /auth`: redirect to the provider's consent screen.
pub async fn authorize(State(state): State<AppState>) -> Result<Response, ApiError> {
    let client = state
        .clients
        .new_authorization_client()
        .map_err(ApiError::internal)?;

    Ok(found(&client.build_auth_url()))
}

/// `GET /callback`: exchange the code and hand the tokens to the frontend.
pub async fn callback(
    State(state): State<AppState>,
    Query(params): Query<CallbackParams>,
) -> Result<Response, ApiError> {
    if let Some(error) = &params.error {
        warn!(error = %error, "Provider returned an authorization error");
    }
    let code = params
        .code
        .filter(|code| !code.is_empty())
        .ok_or(ApiError::AuthenticationFailed)?;

    let client = state
        .clients
        .new_authorization_client()
        .map_err(ApiError::internal)?;

    let tokens = client.exchange_code(&code).await.map_err(|e| {
        warn!(error = %e, "Authorization code exchange failed");
        ApiError::AuthenticationFailed
    })?;

    info!("Authorization completed, redirecting to frontend");
    Ok(found(frontend_redirect(&state.config.front_end_uri, &tokens).as_str()))
}

/// The frontend URL with the tokens appended as query parameters.
///
/// Tokens in a URL end up in browser history and referrer headers; the
/// frontend is expected to lift them out immediately.
fn frontend_redirect(front_end_uri: &Url, tokens: &Tokens) -> Url {
    let mut url = front_end_uri.clone();
    {
        let mut query = url.query_pairs_mut();
        query.append_pair("access_token", &tokens.access_token);
        if let Some(refresh_token) = &tokens.refresh_token {
            query.append_pair("refresh_token", refresh_token);
        }
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(refresh: Option<&str>) -> Tokens {
        Tokens {
            access_token: "A".to_string(),
            refresh_token: refresh.map(str::to_string),
            expires_at: None,
        }
    }

    #[test]
    fn test_frontend_redirect() {
        let base = Url::parse("http://localhost:5173/home").unwrap();
        let url = frontend_redirect(&base, &tokens(Some("B")));
        assert_eq!(
            url.as_str(),
            "http://localhost:5173/home?access_token=A&refresh_token=B"
        );
    }

    #[test]
    fn test_frontend_redirect_keeps_existing_query() {
        let base = Url::parse("https://app.example.com/?tab=files").unwrap();
        let url = frontend_redirect(&base, &tokens(None));
        assert_eq!(url.as_str(), "https://app.example.com/?tab=files&access_token=A");
    }

    #[test]
    fn test_frontend_redirect_encodes_tokens() {
        let base = Url::parse("http://localhost:5173/").unwrap();
        let url = frontend_redirect(&base, &tokens(Some("1//0g&x=y")));
        assert!(url.as_str().ends_with("refresh_token=1%2F%2F0g%26x%3Dy"));
    }
}
