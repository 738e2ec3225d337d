//! Route handlers.

pub mod auth;
pub mod files;

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

/// A `302 Found` redirect.
///
/// `axum::response::Redirect` only offers 303/307/308.
pub(crate) fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}
