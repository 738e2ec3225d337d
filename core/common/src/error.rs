//! Common error types for the drive relay.

use thiserror::Error;

/// Top-level error type for provider operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Credential verification or code exchange failed.
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// Invalid input provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Transport-level failure talking to the provider.
    #[error("Network error: {0}")]
    Network(String),

    /// The provider answered with a non-success status.
    ///
    /// `message` holds the provider's structured error message when the
    /// response body carried one.
    #[error("API error ({status}): {}", message.as_deref().unwrap_or("no details"))]
    Api {
        status: u16,
        message: Option<String>,
    },

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// The provider's own error message, if the failure carried one.
    pub fn provider_message(&self) -> Option<&str> {
        match self {
            Error::Api {
                message: Some(message),
                ..
            } if !message.is_empty() => Some(message),
            _ => None,
        }
    }
}

/// Result type alias using the common Error.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_message_from_api_error() {
        let err = Error::Api {
            status: 404,
            message: Some("File not found: abc.".to_string()),
        };
        assert_eq!(err.provider_message(), Some("File not found: abc."));
    }

    #[test]
    fn test_provider_message_absent() {
        let err = Error::Network("connection reset".to_string());
        assert_eq!(err.provider_message(), None);

        let err = Error::Api {
            status: 500,
            message: Some(String::new()),
        };
        assert_eq!(err.provider_message(), None);
    }

    #[test]
    fn test_api_error_display() {
        let err = Error::Api {
            status: 403,
            message: None,
        };
        assert_eq!(err.to_string(), "API error (403): no details");
    }
}
