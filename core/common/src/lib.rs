//! Common types shared across the drive relay crates.
//!
//! Everything here is request-scoped: credentials, token metadata and file
//! descriptors are created while handling one request and dropped with it.

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{AccessToken, FileDescriptor, TokenInfo, Tokens};
