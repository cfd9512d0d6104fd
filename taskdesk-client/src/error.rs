//! Error handling for the TaskDesk client
//!
//! Every operation returns [`ClientResult`]. The variants follow the way the
//! API fails:
//!
//! - [`ClientError::Transport`]: the server could not be reached
//! - [`ClientError::AuthExpired`]: a 401 survived the silent refresh (the
//!   session is cleared when the refresh itself was rejected)
//! - [`ClientError::InvalidCredentials`]: the token endpoint rejected a login
//! - [`ClientError::Validation`]: any other 4xx, with the server's field errors
//! - [`ClientError::Server`]: 5xx
//!
//! The HTTP core only handles the 401 case itself; everything else is passed
//! through untouched for the caller to present.
//!
//! # Example
//!
//! ```no_run
//! use taskdesk_client::error::ClientError;
//! use taskdesk_client::TaskDeskClient;
//!
//! # async fn example(client: TaskDeskClient) {
//! match client.tasks().get(42).await {
//!     Ok(task) => println!("{}", task.title),
//!     Err(err) if err.is_not_found() => println!("no such task"),
//!     Err(err) => eprintln!("{}", err.user_message()),
//! }
//! # }
//! ```

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::fmt;
use taskdesk_shared::models::{field_errors, FieldError};

use crate::storage::StorageError;
use crate::transport::TransportError;

/// Client result type alias
pub type ClientResult<T> = Result<T, ClientError>;

/// Unified client error type
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Network unreachable, connection reset or timeout
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// 401 after a failed or already-attempted refresh
    #[error("Authentication expired: {0}")]
    AuthExpired(String),

    /// Login rejected by the token endpoint
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    /// 4xx response (other than 401) with the server's error body
    #[error("Request rejected ({status}): {body}")]
    Validation { status: StatusCode, body: ErrorBody },

    /// 5xx response
    #[error("Server error ({status}): {message}")]
    Server { status: StatusCode, message: String },

    /// Payload failed client-side validation; nothing was sent
    #[error("Invalid input: {} errors", .0.len())]
    InvalidInput(Vec<FieldError>),

    /// Response body did not match the expected shape
    #[error("Failed to decode response: {0}")]
    Decode(String),

    /// Token storage failed
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Invalid client configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ClientError {
    /// Builds the error for a non-success response
    pub fn from_response(status: StatusCode, body: &[u8]) -> Self {
        let body = ErrorBody::from_bytes(body);

        if status == StatusCode::UNAUTHORIZED {
            return ClientError::AuthExpired(
                body.detail
                    .clone()
                    .unwrap_or_else(|| "Authentication credentials were not accepted".to_string()),
            );
        }

        if status.is_server_error() {
            let message = body
                .detail
                .clone()
                .or_else(|| status.canonical_reason().map(str::to_string))
                .unwrap_or_else(|| "Server error".to_string());
            return ClientError::Server { status, message };
        }

        ClientError::Validation { status, body }
    }

    /// HTTP status behind the error, if the server answered
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Validation { status, .. } | ClientError::Server { status, .. } => {
                Some(*status)
            }
            ClientError::AuthExpired(_) | ClientError::InvalidCredentials(_) => {
                Some(StatusCode::UNAUTHORIZED)
            }
            _ => None,
        }
    }

    /// Checks for a 404
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(StatusCode::NOT_FOUND)
    }

    /// Checks if the user has to log in (again)
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            ClientError::AuthExpired(_) | ClientError::InvalidCredentials(_)
        )
    }

    /// Message suitable for showing to an end user
    ///
    /// Server-side details of 5xx errors are not exposed.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Transport(e) if e.is_timeout() => {
                "The server took too long to respond".to_string()
            }
            ClientError::Transport(_) => "Unable to reach the server".to_string(),
            ClientError::AuthExpired(_) => {
                "Your session has expired. Please log in again.".to_string()
            }
            ClientError::InvalidCredentials(detail) => detail.clone(),
            ClientError::Validation { body, .. } => body.to_string(),
            ClientError::Server { .. } => "An internal error occurred".to_string(),
            ClientError::InvalidInput(errors) => errors
                .iter()
                .map(|e| format!("{}: {}", e.field, e.message))
                .collect::<Vec<_>>()
                .join("; "),
            ClientError::Decode(_) | ClientError::Storage(_) | ClientError::Config(_) => {
                self.to_string()
            }
        }
    }
}

impl From<validator::ValidationErrors> for ClientError {
    fn from(err: validator::ValidationErrors) -> Self {
        ClientError::InvalidInput(field_errors(&err))
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Decode(err.to_string())
    }
}

/// Error body returned by the API
///
/// The API answers errors either with `{"detail": "..."}` or with a map of
/// field names to message lists (`{"email": ["Enter a valid email address."]}`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// General error message
    pub detail: Option<String>,

    /// Machine-readable error code, when the server sends one
    pub code: Option<String>,

    /// Field-level messages
    pub fields: BTreeMap<String, Vec<String>>,
}

/// Longest raw (non-JSON) body kept as an error detail
const MAX_RAW_DETAIL: usize = 200;

impl ErrorBody {
    /// Parses an error body, tolerating non-JSON responses
    pub fn from_bytes(bytes: &[u8]) -> Self {
        match serde_json::from_slice::<JsonValue>(bytes) {
            Ok(value) => Self::from_json(&value),
            Err(_) => {
                let text = String::from_utf8_lossy(bytes);
                let text = text.trim();
                ErrorBody {
                    detail: (!text.is_empty())
                        .then(|| text.chars().take(MAX_RAW_DETAIL).collect()),
                    ..Default::default()
                }
            }
        }
    }

    fn from_json(value: &JsonValue) -> Self {
        let mut body = ErrorBody::default();

        match value {
            JsonValue::Object(map) => {
                for (key, value) in map {
                    match key.as_str() {
                        "detail" => body.detail = flatten_messages(value).into_iter().next(),
                        "code" => body.code = value.as_str().map(str::to_string),
                        field => {
                            let messages = flatten_messages(value);
                            if !messages.is_empty() {
                                body.fields.insert(field.to_string(), messages);
                            }
                        }
                    }
                }
            }
            JsonValue::Array(_) => {
                body.fields
                    .insert("non_field_errors".to_string(), flatten_messages(value));
            }
            JsonValue::String(text) => body.detail = Some(text.clone()),
            _ => {}
        }

        body
    }

    /// Messages for one field
    pub fn field(&self, name: &str) -> Option<&[String]> {
        self.fields.get(name).map(Vec::as_slice)
    }
}

fn flatten_messages(value: &JsonValue) -> Vec<String> {
    match value {
        JsonValue::String(text) => vec![text.clone()],
        JsonValue::Array(items) => items.iter().flat_map(flatten_messages).collect(),
        JsonValue::Null => Vec::new(),
        other => vec![other.to_string()],
    }
}

impl fmt::Display for ErrorBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(detail) = &self.detail {
            parts.push(detail.clone());
        }
        for (field, messages) in &self.fields {
            parts.push(format!("{}: {}", field, messages.join(" ")));
        }

        if parts.is_empty() {
            f.write_str("no details")
        } else {
            f.write_str(&parts.join("; "))
        }
    }
}
