use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;

use crate::peers::PeerId;

/// Main error type for a Platformer node
#[derive(Debug)]
pub enum PlatformerError {
    /// The candidate URL points back at this node. A signal, not a failure:
    /// callers skip the URL and create no record.
    PeerIsMe(String),

    /// Self-identification could not complete, so identity is undecided
    PeerUnreachable(String),

    /// Malformed peer URL supplied by a caller
    InvalidPeerUrl(String),

    /// No peer record with this id
    PeerNotFound(PeerId),

    /// A health score outside of [0.0, 1.0]
    InvalidHealth(f64),

    /// Persistence layer failures
    Storage(String),

    /// Configuration or CLI argument errors
    Config(String),

    /// API/HTTP related errors
    Api(String),

    /// System I/O errors
    Io(std::io::Error),

    /// JSON serialization/deserialization errors
    Serialization(serde_json::Error),
}

impl fmt::Display for PlatformerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlatformerError::PeerIsMe(url) => write!(f, "Peer is this node: {}", url),
            PlatformerError::PeerUnreachable(url) => write!(f, "Peer unreachable: {}", url),
            PlatformerError::InvalidPeerUrl(msg) => write!(f, "Invalid peer URL: {}", msg),
            PlatformerError::PeerNotFound(id) => write!(f, "Peer not found: {}", id),
            PlatformerError::InvalidHealth(value) => {
                write!(f, "Health must lie within [0.0, 1.0], got {}", value)
            }
            PlatformerError::Storage(msg) => write!(f, "Storage error: {}", msg),
            PlatformerError::Config(msg) => write!(f, "Configuration error: {}", msg),
            PlatformerError::Api(msg) => write!(f, "API error: {}", msg),
            PlatformerError::Io(err) => write!(f, "I/O error: {}", err),
            PlatformerError::Serialization(err) => write!(f, "Serialization error: {}", err),
        }
    }
}

impl std::error::Error for PlatformerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PlatformerError::Io(err) => Some(err),
            PlatformerError::Serialization(err) => Some(err),
            _ => None,
        }
    }
}

// Convenient type alias for Results using our error type
pub type Result<T> = std::result::Result<T, PlatformerError>;

impl IntoResponse for PlatformerError {
    fn into_response(self) -> Response {
        let status_code = self.status_code();
        let error_response = json!({
            "error": {
                "code": status_code.as_u16(),
                "message": self.to_string(),
                "type": self.error_type(),
            }
        });

        (status_code, Json(error_response)).into_response()
    }
}

impl PlatformerError {
    /// Get the appropriate HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            PlatformerError::PeerIsMe(_) => StatusCode::CONFLICT,
            PlatformerError::PeerUnreachable(_) => StatusCode::BAD_GATEWAY,
            PlatformerError::InvalidPeerUrl(_) => StatusCode::BAD_REQUEST,
            PlatformerError::PeerNotFound(_) => StatusCode::NOT_FOUND,
            PlatformerError::InvalidHealth(_) => StatusCode::INTERNAL_SERVER_ERROR,
            PlatformerError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            PlatformerError::Config(_) => StatusCode::BAD_REQUEST,
            PlatformerError::Api(_) => StatusCode::BAD_REQUEST,
            PlatformerError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            PlatformerError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error type identifier
    pub fn error_type(&self) -> &'static str {
        match self {
            PlatformerError::PeerIsMe(_) => "peer_is_me",
            PlatformerError::PeerUnreachable(_) => "peer_unreachable",
            PlatformerError::InvalidPeerUrl(_) => "invalid_peer_url",
            PlatformerError::PeerNotFound(_) => "peer_not_found",
            PlatformerError::InvalidHealth(_) => "invalid_health",
            PlatformerError::Storage(_) => "storage_error",
            PlatformerError::Config(_) => "configuration_error",
            PlatformerError::Api(_) => "api_error",
            PlatformerError::Io(_) => "io_error",
            PlatformerError::Serialization(_) => "serialization_error",
        }
    }
}

impl From<std::io::Error> for PlatformerError {
    fn from(err: std::io::Error) -> Self {
        PlatformerError::Io(err)
    }
}

impl From<serde_json::Error> for PlatformerError {
    fn from(err: serde_json::Error) -> Self {
        PlatformerError::Serialization(err)
    }
}

impl From<url::ParseError> for PlatformerError {
    fn from(err: url::ParseError) -> Self {
        PlatformerError::InvalidPeerUrl(err.to_string())
    }
}

#[macro_export]
macro_rules! config_error {
    ($msg:expr) => {
        $crate::error::PlatformerError::Config($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::error::PlatformerError::Config(format!($fmt, $($arg)*))
    };
}

#[macro_export]
macro_rules! storage_error {
    ($msg:expr) => {
        $crate::error::PlatformerError::Storage($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::error::PlatformerError::Storage(format!($fmt, $($arg)*))
    };
}

#[macro_export]
macro_rules! api_error {
    ($msg:expr) => {
        $crate::error::PlatformerError::Api($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::error::PlatformerError::Api(format!($fmt, $($arg)*))
    };
}
