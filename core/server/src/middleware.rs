//! Bearer-token validation middleware.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use tracing::{debug, warn};

use driverelay_common::{AccessToken, TokenInfo};

use crate::error::ApiError;
use crate::server::AppState;

/// A caller whose bearer token passed introspection.
///
/// Inserted into request extensions for downstream handlers; dropped with the
/// request.
#[derive(Debug, Clone)]
pub struct Authenticated {
    /// The caller's access token.
    pub token: AccessToken,
    /// What the identity provider reported about the token.
    pub info: TokenInfo,
}

/// Validate the `Authorization: Bearer <token>` header against the identity
/// provider before letting the request through.
///
/// Makes exactly one introspection call per request when a token is present
/// and none when it is missing.
pub async fn validate_token(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(AccessToken::from_authorization_header)
        .ok_or(ApiError::Unauthorized("No token provided"))?;

    let info = match state.introspector.introspect_token(&token).await {
        Ok(info) => info,
        Err(e) => {
            warn!(error = %e, "Token validation failed");
            return Err(ApiError::Unauthorized("Invalid or expired token"));
        }
    };

    debug!(audience = ?info.audience, "Token validated");
    request.extensions_mut().insert(Authenticated { token, info });

    Ok(next.run(request).await)
}
