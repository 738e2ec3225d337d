//! Provider abstraction for the drive relay.
//!
//! This module provides trait-based interfaces to the identity provider and
//! the storage API, a Google implementation of them, and an in-memory
//! implementation for tests.
//!
//! # Design Principles
//! - Provider isolation: no Google-specific logic outside `gdrive`
//! - Request scope: file clients are built per request from the caller's token
//! - Streaming support: uploads and downloads are handled via streams

pub mod gdrive;
pub mod memory;
pub mod provider;

pub use gdrive::{GoogleEndpoints, GoogleProvider, OAuthConfig, DRIVE_SCOPE};
pub use memory::MemoryProvider;
pub use provider::{
    AuthorizationClient, ByteStream, ClientFactory, DriveApi, FileDownload, FileUpload,
    TokenIntrospector,
};
