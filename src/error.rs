//! Error types for Roomlet
//!
//! This module defines the error enum shared by the API client, local
//! storage and the event stream, plus the classifier that turns any crate
//! error into a user-facing kind and message.

use thiserror::Error;

/// Main error type for Roomlet operations
#[derive(Error, Debug)]
pub enum RoomletError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Local storage errors (file backend, corrupt state)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Keyring/credential storage errors
    #[error("Keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    /// The backend rejected the session credential (HTTP 401)
    #[error("Authentication rejected: {path}")]
    Unauthorized {
        /// Request path that produced the 401
        path: String,
    },

    /// The backend answered with a non-2xx status other than 401
    #[error("Server rejected request: status={status}, {}", message.as_deref().unwrap_or("no message"))]
    ServerRejected {
        /// HTTP status code
        status: u16,
        /// The body's `message` field, when present
        message: Option<String>,
        /// Raw response body
        body: String,
    },

    /// An identifier that cannot be used as a single path segment
    #[error("Invalid identifier: {0:?}")]
    InvalidIdentifier(String),

    /// Event stream errors (connect, handshake, framing)
    #[error("Stream error: {0}")]
    Stream(String),

    /// HTTP request errors (no response, timeout, connection failure)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// URL parsing/joining errors
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
}

/// Result type alias for Roomlet operations
///
/// Typed [`RoomletError`] values travel inside `anyhow::Error`; recover them
/// with `downcast_ref::<RoomletError>()` or [`classify`].
pub type Result<T> = anyhow::Result<T>;

/// User-facing error kinds shared by every screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// HTTP 401 from any backend call
    AuthenticationRejected,
    /// No response at all (offline, DNS failure, server down)
    NetworkUnreachable,
    /// Request sent but the client-side timeout fired
    Timeout,
    /// Any other non-2xx status
    ServerRejected,
    /// Anything that is not a backend interaction
    Other,
}

/// A classified error ready for presentation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedError {
    /// Error kind
    pub kind: ErrorKind,
    /// Message to show the user
    pub message: String,
}

/// Message shown when no response was received
pub const NETWORK_UNREACHABLE_MESSAGE: &str =
    "Network error. Please check your internet connection.";

/// Message shown when the request timed out
pub const TIMEOUT_MESSAGE: &str = "The server is not responding. Please try again later.";

/// Fallback message for server rejections without a body message
pub const GENERIC_FAILURE_MESSAGE: &str = "Something went wrong. Please try again.";

/// Message shown when the session was rejected
pub const SESSION_EXPIRED_MESSAGE: &str = "Session Expired. Please log in again.";

/// Classify an error into a kind and a user-facing message
///
/// Every call site uses this instead of matching on error strings, so one
/// screen's copy cannot drift from another's.
///
/// # Examples
///
/// ```
/// use roomlet::error::{classify, ErrorKind, RoomletError};
///
/// let err = anyhow::Error::new(RoomletError::ServerRejected {
///     status: 409,
///     message: Some("Room already booked".to_string()),
///     body: String::new(),
/// });
/// let classified = classify(&err);
/// assert_eq!(classified.kind, ErrorKind::ServerRejected);
/// assert_eq!(classified.message, "Room already booked");
/// ```
pub fn classify(error: &anyhow::Error) -> ClassifiedError {
    match error.downcast_ref::<RoomletError>() {
        Some(RoomletError::Unauthorized { .. }) => ClassifiedError {
            kind: ErrorKind::AuthenticationRejected,
            message: SESSION_EXPIRED_MESSAGE.to_string(),
        },
        Some(RoomletError::ServerRejected { message, .. }) => ClassifiedError {
            kind: ErrorKind::ServerRejected,
            message: message
                .clone()
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| GENERIC_FAILURE_MESSAGE.to_string()),
        },
        Some(RoomletError::Http(e)) => classify_http(e),
        Some(other) => ClassifiedError {
            kind: ErrorKind::Other,
            message: other.to_string(),
        },
        None => match error.downcast_ref::<reqwest::Error>() {
            Some(e) => classify_http(e),
            None => ClassifiedError {
                kind: ErrorKind::Other,
                message: GENERIC_FAILURE_MESSAGE.to_string(),
            },
        },
    }
}

fn classify_http(error: &reqwest::Error) -> ClassifiedError {
    if error.is_timeout() {
        return ClassifiedError {
            kind: ErrorKind::Timeout,
            message: TIMEOUT_MESSAGE.to_string(),
        };
    }
    if let Some(status) = error.status() {
        return ClassifiedError {
            kind: ErrorKind::ServerRejected,
            message: format!("{} ({})", GENERIC_FAILURE_MESSAGE, status.as_u16()),
        };
    }
    ClassifiedError {
        kind: ErrorKind::NetworkUnreachable,
        message: NETWORK_UNREACHABLE_MESSAGE.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let error = RoomletError::Config("invalid base url".to_string());
        assert_eq!(error.to_string(), "Configuration error: invalid base url");
    }

    #[test]
    fn test_unauthorized_display_names_path() {
        let error = RoomletError::Unauthorized {
            path: "/api/my-properties".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Authentication rejected: /api/my-properties"
        );
    }

    #[test]
    fn test_server_rejected_display() {
        let error = RoomletError::ServerRejected {
            status: 422,
            message: Some("Phone number is invalid".to_string()),
            body: String::new(),
        };
        let s = error.to_string();
        assert!(s.contains("status=422"));
        assert!(s.contains("Phone number is invalid"));
    }

    #[test]
    fn test_classify_unauthorized() {
        let err = anyhow::Error::new(RoomletError::Unauthorized {
            path: "/api/payments".to_string(),
        });
        let c = classify(&err);
        assert_eq!(c.kind, ErrorKind::AuthenticationRejected);
        assert_eq!(c.message, SESSION_EXPIRED_MESSAGE);
    }

    #[test]
    fn test_classify_server_rejected_without_message_uses_fallback() {
        let err = anyhow::Error::new(RoomletError::ServerRejected {
            status: 500,
            message: None,
            body: "<html>".to_string(),
        });
        let c = classify(&err);
        assert_eq!(c.kind, ErrorKind::ServerRejected);
        assert_eq!(c.message, GENERIC_FAILURE_MESSAGE);
    }

    #[test]
    fn test_classify_server_rejected_blank_message_uses_fallback() {
        let err = anyhow::Error::new(RoomletError::ServerRejected {
            status: 400,
            message: Some("   ".to_string()),
            body: String::new(),
        });
        assert_eq!(classify(&err).message, GENERIC_FAILURE_MESSAGE);
    }

    #[test]
    fn test_classify_storage_error_is_other() {
        let err = anyhow::Error::new(RoomletError::Storage("disk full".to_string()));
        let c = classify(&err);
        assert_eq!(c.kind, ErrorKind::Other);
        assert!(c.message.contains("disk full"));
    }

    #[test]
    fn test_classify_untyped_error_is_generic() {
        let err = anyhow::anyhow!("something odd");
        let c = classify(&err);
        assert_eq!(c.kind, ErrorKind::Other);
        assert_eq!(c.message, GENERIC_FAILURE_MESSAGE);
    }

    #[tokio::test]
    async fn test_classify_connection_refused_is_network_unreachable() {
        // Port 9 (discard) is not expected to accept HTTP on loopback.
        let e = reqwest::Client::new()
            .get("http://127.0.0.1:9/")
            .send()
            .await
            .expect_err("connection should fail");
        let err = anyhow::Error::new(RoomletError::Http(e));
        assert_eq!(classify(&err).kind, ErrorKind::NetworkUnreachable);
    }

    #[test]
    fn test_json_error_conversion() {
        let json_error = serde_json::from_str::<serde_json::Value>("{bad").unwrap_err();
        let error: RoomletError = json_error.into();
        assert!(matches!(error, RoomletError::Serialization(_)));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<RoomletError>();
    }
}
