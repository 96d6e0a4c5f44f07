//! Error types for the SwipeTune client core

use thiserror::Error;

/// Common result type for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Every failure the client core can surface.
///
/// The type is `Clone` so a single in-flight result can be handed to every
/// caller waiting on the same operation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClientError {
    /// Connection, DNS or TLS failure before a response arrived
    #[error("Network error: {0}")]
    Network(String),

    /// Client-side timeout aborted the request
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Non-2xx response with the server's structured body
    #[error("HTTP {status}: {error}")]
    Http {
        status: u16,
        error: String,
        detail: Option<String>,
    },

    /// Response body did not have the expected JSON shape
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Device storage read/write failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Persisted blob could not be parsed or had the wrong schema version
    #[error("Corrupt stored data under '{key}': {reason}")]
    StorageCorrupt { key: String, reason: String },

    /// Input rejected before it reached the cache or the network
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Media load/decode/output failure
    #[error("Playback error: {0}")]
    Playback(String),

    /// Expired or invalid credentials
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ClientError {
    /// Short text suitable for a dismissable banner or an inline form error
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Network(_) => {
                "Could not reach the server. Check your connection and try again.".to_string()
            }
            ClientError::Timeout(_) => "The server took too long to respond. Try again.".to_string(),
            ClientError::Http { error, detail, .. } => match detail {
                Some(detail) if !detail.is_empty() => format!("{}: {}", error, detail),
                _ => error.clone(),
            },
            ClientError::MalformedResponse(_) => {
                "The server sent an unexpected response.".to_string()
            }
            ClientError::Validation(msg) | ClientError::Auth(msg) | ClientError::Playback(msg) => {
                msg.clone()
            }
            other => other.to_string(),
        }
    }

    /// True for 401/403 responses and explicit auth failures
    pub fn is_auth_failure(&self) -> bool {
        match self {
            ClientError::Auth(_) => true,
            ClientError::Http { status, .. } => *status == 401 || *status == 403,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ClientError::Timeout(e.to_string())
        } else if e.is_decode() {
            ClientError::MalformedResponse(e.to_string())
        } else if let Some(status) = e.status() {
            ClientError::Http {
                status: status.as_u16(),
                error: status
                    .canonical_reason()
                    .unwrap_or("Request failed")
                    .to_string(),
                detail: None,
            }
        } else {
            ClientError::Network(e.to_string())
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(e: serde_json::Error) -> Self {
        ClientError::MalformedResponse(e.to_string())
    }
}

impl From<rusqlite::Error> for ClientError {
    fn from(e: rusqlite::Error) -> Self {
        ClientError::Storage(e.to_string())
    }
}

impl From<std::io::Error> for ClientError {
    fn from(e: std::io::Error) -> Self {
        ClientError::Storage(e.to_string())
    }
}
