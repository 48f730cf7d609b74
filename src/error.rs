// SPDX-License-Identifier: MIT

//! Core error taxonomy shared by the request pipeline and its consumers.
//!
//! Errors are a closed tagged union constructed at the pipeline boundary, so
//! downstream code pattern-matches on a variant rather than probing optional
//! fields of a raw backend payload.

use serde_json::Value;

/// Errors surfaced by the session & notification core.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// No response was received (DNS, connection, timeout). Never triggers a
    /// credential refresh.
    #[error("Network error: {0}")]
    Transport(String),

    /// Authentication failed and could not be recovered by a refresh.
    #[error("Authentication required")]
    Auth,

    /// Login or registration was rejected by the backend.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// The backend demands payment before serving this request (HTTP 402).
    #[error("Payment required")]
    PaymentRequired,

    /// Structured 4xx carrying a human-readable message.
    #[error("Invalid request: {message}")]
    Validation { status: u16, message: String },

    /// 5xx, or a 4xx without a structured message field.
    #[error("Server error (HTTP {status}): {message}")]
    UnknownServer { status: u16, message: String },

    /// Persistence failure from the key-value store. Rare; surfaced as-is.
    #[error("Storage error: {0}")]
    Storage(#[from] anyhow::Error),

    /// Platform scheduler/notification failure.
    #[error("Platform error: {0}")]
    Platform(String),
}

impl CoreError {
    /// Classify a non-success HTTP response.
    ///
    /// 401/403 map to [`CoreError::Auth`]; the pipeline resolves 401 with a
    /// refresh before this is ever shown to a caller. Structured 4xx bodies
    /// have their message rewritten from the backend's `detail`/`message`
    /// field so all call sites observe one error shape.
    pub fn from_response(status: u16, body: &Value) -> Self {
        match status {
            402 => CoreError::PaymentRequired,
            401 | 403 => CoreError::Auth,
            400..=499 => match structured_message(body) {
                Some(message) => CoreError::Validation { status, message },
                None => CoreError::UnknownServer {
                    status,
                    message: "Request failed".to_string(),
                },
            },
            _ => CoreError::UnknownServer {
                status,
                message: structured_message(body).unwrap_or_else(|| "Server error".to_string()),
            },
        }
    }

    /// HTTP status carried by this error, if it originated from a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            CoreError::PaymentRequired => Some(402),
            CoreError::Validation { status, .. } | CoreError::UnknownServer { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }

    /// Single human-readable string for the UI layer. Raw backend payloads
    /// are never surfaced.
    pub fn user_message(&self) -> String {
        self.to_string()
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, CoreError::Transport(_))
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, CoreError::Auth | CoreError::InvalidCredentials)
    }
}

/// Extract the backend's structured message field, if any.
///
/// The backend emits `{"detail": "..."}` for most errors and `{"message":
/// "..."}` from a few older endpoints; both are normalized here.
fn structured_message(body: &Value) -> Option<String> {
    body.get("detail")
        .or_else(|| body.get("message"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
