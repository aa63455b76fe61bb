//! Error types shared by the transport-facing parts of the client.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Categories of client errors for consistent handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientErrorKind {
    /// Network failure before or during streaming (connection reset, aborted body)
    Transport,
    /// HTTP status error (4xx, 5xx)
    HttpStatus,
    /// Connection timeout or request timeout
    Timeout,
    /// Response body could not be decoded (non-streaming endpoints)
    Parse,
}

impl fmt::Display for ClientErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientErrorKind::Transport => write!(f, "transport"),
            ClientErrorKind::HttpStatus => write!(f, "http_status"),
            ClientErrorKind::Timeout => write!(f, "timeout"),
            ClientErrorKind::Parse => write!(f, "parse"),
        }
    }
}

/// Structured error from the backend or the transport with kind and details.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientError {
    /// Error category
    pub kind: ClientErrorKind,
    /// One-line summary suitable for display
    pub message: String,
    /// Optional additional details (e.g., raw error body)
    pub details: Option<String>,
}

impl ClientError {
    pub fn new(kind: ClientErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: None,
        }
    }

    /// Creates a transport error (stream aborted, connection dropped).
    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ClientErrorKind::Transport, message)
    }

    /// Creates a timeout error.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ClientErrorKind::Timeout, message)
    }

    /// Creates a parse error.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(ClientErrorKind::Parse, message)
    }

    /// Creates an HTTP status error.
    ///
    /// The backend answers failures with `{"error": "..."}`; when the body has
    /// that shape the message is folded into the summary.
    pub fn http_status(status: u16, body: &str) -> Self {
        if body.is_empty() {
            return Self::new(ClientErrorKind::HttpStatus, format!("HTTP {status}"));
        }

        if let Ok(json) = serde_json::from_str::<Value>(body)
            && let Some(msg) = json.get("error").and_then(Value::as_str)
        {
            return Self {
                kind: ClientErrorKind::HttpStatus,
                message: format!("HTTP {status}: {msg}"),
                details: Some(body.to_string()),
            };
        }

        Self {
            kind: ClientErrorKind::HttpStatus,
            message: format!("HTTP {status}"),
            details: Some(body.to_string()),
        }
    }

    /// Returns true for failures that happened on the wire rather than in the backend.
    pub fn is_transport(&self) -> bool {
        matches!(
            self.kind,
            ClientErrorKind::Transport | ClientErrorKind::Timeout
        )
    }
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ClientError {}

/// Result type for client operations.
pub type ClientResult<T> = std::result::Result<T, ClientError>;

/// Maps a [`reqwest::Error`] to a [`ClientError`].
pub(crate) fn classify_reqwest_error(e: &reqwest::Error) -> ClientError {
    if e.is_timeout() {
        ClientError::timeout(format!("Request timed out: {e}"))
    } else if e.is_connect() {
        ClientError::transport(format!("Connection failed: {e}"))
    } else if e.is_decode() {
        ClientError::parse(format!("Invalid response body: {e}"))
    } else {
        ClientError::transport(format!("Network error: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_status_extracts_backend_error_message() {
        let err = ClientError::http_status(401, r#"{"error": "Unauthorized"}"#);
        assert_eq!(err.kind, ClientErrorKind::HttpStatus);
        assert_eq!(err.message, "HTTP 401: Unauthorized");
        assert_eq!(err.details.as_deref(), Some(r#"{"error": "Unauthorized"}"#));
    }

    #[test]
    fn test_http_status_keeps_plain_body_as_details() {
        let err = ClientError::http_status(502, "bad gateway");
        assert_eq!(err.message, "HTTP 502");
        assert_eq!(err.details.as_deref(), Some("bad gateway"));
    }

    #[test]
    fn test_http_status_empty_body() {
        let err = ClientError::http_status(500, "");
        assert_eq!(err.message, "HTTP 500");
        assert!(err.details.is_none());
    }

    #[test]
    fn test_transport_classification() {
        assert!(ClientError::transport("reset").is_transport());
        assert!(ClientError::timeout("slow").is_transport());
        assert!(!ClientError::http_status(404, "").is_transport());
        assert!(!ClientError::parse("bad json").is_transport());
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(ClientErrorKind::Transport.to_string(), "transport");
        assert_eq!(ClientErrorKind::HttpStatus.to_string(), "http_status");
    }
}
