//! Transport layer
//!
//! The HTTP core talks to the network through the [`HttpTransport`] trait so
//! the refresh-and-retry logic can be exercised without a server.
//!
//! # Transports
//!
//! - [`ReqwestTransport`]: real HTTP via `reqwest`
//! - [`MockTransport`]: scripted responses that record every request
//!
//! # Requests Are Values
//!
//! An [`ApiRequest`] is an immutable description of a call (method, path,
//! query, body, auth mode). Replaying a request after a token refresh sends
//! the same value again with a different bearer; multipart bodies keep their
//! file contents as [`Bytes`] so a replay does not re-read anything.

pub mod http_client;
pub mod mock;

pub use http_client::ReqwestTransport;
pub use mock::{MockReply, MockTransport, RecordedRequest};

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use std::fmt;

use crate::error::{ClientError, ClientResult};

/// Whether a request carries the session's bearer token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    /// Attach the access token when one exists; 401s trigger a refresh
    Bearer,

    /// Never attach a token and never refresh (token endpoints, sign-up)
    Anonymous,
}

/// Request body
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    Json(JsonValue),
    Multipart(MultipartPayload),
}

/// Multipart form contents
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MultipartPayload {
    /// Plain text fields
    pub fields: Vec<(String, String)>,

    /// File fields
    pub files: Vec<FilePart>,
}

impl MultipartPayload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    pub fn file(mut self, part: FilePart) -> Self {
        self.files.push(part);
        self
    }

    /// Value of a text field
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// File in a multipart form
#[derive(Clone, PartialEq)]
pub struct FilePart {
    /// Form field name
    pub field: String,

    pub file_name: String,

    /// MIME type; the transport default applies when unset
    pub content_type: Option<String>,

    pub data: Bytes,
}

impl fmt::Debug for FilePart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilePart")
            .field("field", &self.field)
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.data.len())
            .finish()
    }
}

/// Outbound API call
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,

    /// Path relative to the API base URL, e.g. `/api/tasks/`
    pub path: String,

    pub query: Vec<(String, String)>,

    pub body: RequestBody,

    pub auth: AuthMode,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: RequestBody::Empty,
            auth: AuthMode::Bearer,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn query<K, V>(mut self, pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.query
            .extend(pairs.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn json(mut self, body: JsonValue) -> Self {
        self.body = RequestBody::Json(body);
        self
    }

    pub fn multipart(mut self, payload: MultipartPayload) -> Self {
        self.body = RequestBody::Multipart(payload);
        self
    }

    /// Marks the request as unauthenticated
    pub fn anonymous(mut self) -> Self {
        self.auth = AuthMode::Anonymous;
        self
    }
}

/// Response status and raw body
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    status: StatusCode,
    body: Bytes,
}

impl ApiResponse {
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Converts non-success statuses into the matching [`ClientError`]
    pub fn into_result(self) -> ClientResult<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(ClientError::from_response(self.status, &self.body))
        }
    }

    /// Decodes the body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> ClientResult<T> {
        serde_json::from_slice(&self.body).map_err(|e| {
            ClientError::Decode(format!("{} (status {})", e, self.status.as_u16()))
        })
    }
}

/// Kind of transport failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// Could not connect
    Connect,

    /// Request or response timed out
    Timeout,

    /// Anything else below HTTP (TLS, malformed response, body read)
    Other,
}

/// Network-level failure; no HTTP status was received
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn is_timeout(&self) -> bool {
        self.kind == TransportErrorKind::Timeout
    }
}

/// Sends a single request
///
/// Implementations perform exactly one network exchange per call. Retrying,
/// refreshing and status classification are the HTTP core's job.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Sends `request`, attaching `bearer` as `Authorization: Bearer <token>`
    /// when given
    async fn send(
        &self,
        request: &ApiRequest,
        bearer: Option<&str>,
    ) -> Result<ApiResponse, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_builder() {
        let request = ApiRequest::get("/api/tasks/")
            .query([("status", "todo"), ("search", "docs")])
            .anonymous();

        assert_eq!(request.method, Method::GET);
        assert_eq!(request.query.len(), 2);
        assert_eq!(request.query[0], ("status".to_string(), "todo".to_string()));
        assert_eq!(request.auth, AuthMode::Anonymous);
        assert_eq!(request.body, RequestBody::Empty);
    }

    #[test]
    fn test_multipart_payload() {
        let payload = MultipartPayload::new()
            .text("description", "Requirements")
            .file(FilePart {
                field: "file".to_string(),
                file_name: "spec.pdf".to_string(),
                content_type: None,
                data: Bytes::from_static(b"%PDF"),
            });

        assert_eq!(payload.field("description"), Some("Requirements"));
        assert_eq!(payload.field("missing"), None);
        assert!(format!("{:?}", payload.files[0]).contains("len: 4"));
    }

    #[test]
    fn test_response_into_result() {
        let ok = ApiResponse::new(StatusCode::OK, json!({"id": 1}).to_string());
        let value: JsonValue = ok.clone().into_result().unwrap().json().unwrap();
        assert_eq!(value["id"], 1);

        let missing = ApiResponse::new(StatusCode::NOT_FOUND, r#"{"detail": "Not found."}"#);
        assert!(missing.into_result().unwrap_err().is_not_found());
    }

    #[test]
    fn test_response_decode_error_mentions_status() {
        let response = ApiResponse::new(StatusCode::OK, "not json");
        let err = response.json::<JsonValue>().unwrap_err();
        assert!(err.to_string().contains("status 200"));
    }
}
