//! Error taxonomy for gateway calls.

use std::fmt;
use std::time::Duration;

use http::StatusCode;
use serde_json::Value;

/// Errors surfaced to callers of the gateway.
///
/// Cloneable so that every caller coalesced onto one in-flight read observes
/// the same failure value.
#[derive(Debug, Clone)]
pub enum GatewayError {
    /// The request never produced a response (DNS, connect, reset, ...).
    Network(String),

    /// No response arrived within the request timeout.
    Timeout(Duration),

    /// The in-flight request was superseded. The gateway converts this to an
    /// empty success before it reaches callers.
    Cancelled,

    /// The backend rejected the session (HTTP 401).
    Unauthorized { body: Value },

    /// Any other non-success status, passed through unmodified.
    Status { status: StatusCode, body: Value },

    /// The request could not be built (bad path, header value, ...).
    InvalidRequest(String),

    /// The response did not have the expected shape.
    InvalidResponse(String),

    /// Session state could not be persisted.
    Session(String),
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network(msg) => write!(f, "Network error: {}", msg),
            Self::Timeout(after) => write!(f, "Request timed out after {} ms", after.as_millis()),
            Self::Cancelled => write!(f, "Duplicate request cancelled"),
            Self::Unauthorized { .. } => write!(f, "Session is no longer authorized"),
            Self::Status { status, .. } => write!(f, "Request failed with status {}", status),
            Self::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
            Self::InvalidResponse(msg) => write!(f, "Invalid response from server: {}", msg),
            Self::Session(msg) => write!(f, "Session error: {}", msg),
        }
    }
}

impl std::error::Error for GatewayError {}

impl GatewayError {
    /// HTTP status carried by the error, if the backend answered at all.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Unauthorized { .. } => Some(StatusCode::UNAUTHORIZED),
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Backend payload attached to the error.
    pub fn body(&self) -> Option<&Value> {
        match self {
            Self::Unauthorized { body } | Self::Status { body, .. } => Some(body),
            _ => None,
        }
    }

    /// User-facing message: the backend's `message`, then its `error`, then
    /// this error's own description.
    pub fn message(&self) -> String {
        self.body()
            .and_then(|body| {
                body.get("message")
                    .or_else(|| body.get("error"))
                    .and_then(Value::as_str)
                    .filter(|m| !m.is_empty())
            })
            .map(str::to_string)
            .unwrap_or_else(|| self.to_string())
    }
}

impl From<crate::session::StorageError> for GatewayError {
    fn from(err: crate::session::StorageError) -> Self {
        Self::Session(err.to_string())
    }
}
