//! Axum HTTP server setup and routing.
//!
//! `/auth` and `/callback` are public; every file route sits behind
//! [`validate_token`].

use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

use driverelay_storage::{ClientFactory, TokenIntrospector};

use crate::config::ServerConfig;
use crate::handlers;
use crate::middleware::validate_token;

/// Shared application state for all handlers.
///
/// Holds configuration and provider factories only; nothing request-specific
/// is ever stored here.
#[derive(Clone)]
pub struct AppState {
    /// Builds authorization and per-caller drive clients.
    pub clients: Arc<dyn ClientFactory>,
    /// Verifies bearer tokens.
    pub introspector: Arc<dyn TokenIntrospector>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
}

impl AppState {
    /// Create state from a provider implementing both capabilities.
    pub fn new<P>(provider: Arc<P>, config: ServerConfig) -> Self
    where
        P: ClientFactory + TokenIntrospector + 'static,
    {
        Self {
            clients: provider.clone(),
            introspector: provider,
            config: Arc::new(config),
        }
    }
}

/// Creates the router with all routes and layers.
///
/// The token check is a `route_layer` on the file routes only, so a path no
/// route matches is answered 404 without asking for a token.
pub fn create_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/files", get(handlers::files::list_files))
        .route(
            "/upload",
            post(handlers::files::upload_file)
                .layer(DefaultBodyLimit::max(state.config.max_upload_size)),
        )
        .route("/download/{file_id}", get(handlers::files::download_file))
        .route("/delete/{file_id}", delete(handlers::files::delete_file))
        .route_layer(middleware::from_fn_with_state(state.clone(), validate_token));

    Router::new()
        .route("/auth", get(handlers::auth::authorize))
        .route("/callback", get(handlers::auth::callback))
        .merge(protected)
        .layer(cors_layer(&state.config.cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// CORS for all routes; any origin unless an allow-list is configured.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if origins.is_empty() {
        return layer.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    layer.allow_origin(AllowOrigin::list(allowed))
}
