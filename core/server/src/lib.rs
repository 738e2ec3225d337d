//! HTTP relay between a browser frontend and Google Drive.
//!
//! Provides:
//! - OAuth2 authorization-code login (`/auth`, `/callback`)
//! - Bearer-token validation for file routes
//! - File listing, upload, download and deletion against the caller's drive

pub mod config;
pub mod download;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod server;
pub mod upload;

pub use config::ServerConfig;
pub use error::ApiError;
pub use middleware::Authenticated;
pub use server::{create_router, AppState};
