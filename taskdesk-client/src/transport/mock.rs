//! Scripted transport for tests and demos
//!
//! Replies are queued per `(method, path)` route and consumed in order. When
//! a route's queue is empty its fallback reply (set with
//! [`MockTransport::always`]) is used; unscripted routes answer 404. Every
//! request is recorded together with the bearer token it carried.
//!
//! # Example
//!
//! ```
//! use reqwest::Method;
//! use serde_json::json;
//! use taskdesk_client::transport::{ApiRequest, HttpTransport, MockReply, MockTransport};
//!
//! # async fn example() {
//! let mock = MockTransport::new();
//! mock.enqueue(Method::GET, "/api/users/me/", MockReply::unauthorized());
//! mock.enqueue(Method::GET, "/api/users/me/", MockReply::ok(json!({"id": 1})));
//!
//! let first = mock.send(&ApiRequest::get("/api/users/me/"), Some("A1")).await.unwrap();
//! assert_eq!(first.status().as_u16(), 401);
//! assert_eq!(mock.requests()[0].bearer.as_deref(), Some("A1"));
//! # }
//! ```

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde_json::{json, Value as JsonValue};
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};

use super::{ApiRequest, ApiResponse, HttpTransport, TransportError, TransportErrorKind};

/// Scripted reply
#[derive(Debug, Clone)]
pub enum MockReply {
    /// HTTP response
    Response { status: StatusCode, body: String },

    /// Network failure
    Failure(TransportError),
}

impl MockReply {
    /// Response with a JSON body
    pub fn json(status: u16, body: JsonValue) -> Self {
        MockReply::Response {
            status: StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            body: body.to_string(),
        }
    }

    /// 200 with a JSON body
    pub fn ok(body: JsonValue) -> Self {
        Self::json(200, body)
    }

    /// 201 with a JSON body
    pub fn created(body: JsonValue) -> Self {
        Self::json(201, body)
    }

    /// 204 without a body
    pub fn no_content() -> Self {
        MockReply::Response {
            status: StatusCode::NO_CONTENT,
            body: String::new(),
        }
    }

    /// 401 in the shape the token authentication layer produces
    pub fn unauthorized() -> Self {
        Self::json(
            401,
            json!({
                "detail": "Given token not valid for any token type",
                "code": "token_not_valid"
            }),
        )
    }

    /// Connection failure
    pub fn transport_failure(message: impl Into<String>) -> Self {
        MockReply::Failure(TransportError::new(TransportErrorKind::Connect, message))
    }

    fn to_result(&self) -> Result<ApiResponse, TransportError> {
        match self {
            MockReply::Response { status, body } => Ok(ApiResponse::new(*status, body.clone())),
            MockReply::Failure(err) => Err(err.clone()),
        }
    }
}

/// Request as seen by the mock
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub request: ApiRequest,

    /// Bearer token attached to the request, if any
    pub bearer: Option<String>,
}

impl RecordedRequest {
    pub fn method(&self) -> &Method {
        &self.request.method
    }

    pub fn path(&self) -> &str {
        &self.request.path
    }
}

type RouteKey = (Method, String);

#[derive(Debug, Default)]
struct Script {
    queued: HashMap<RouteKey, VecDeque<MockReply>>,
    fallback: HashMap<RouteKey, MockReply>,
    recorded: Vec<RecordedRequest>,
}

/// Transport that answers from a script
#[derive(Debug, Default)]
pub struct MockTransport {
    script: Mutex<Script>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn script(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queues a one-shot reply for a route
    pub fn enqueue(&self, method: Method, path: impl Into<String>, reply: MockReply) -> &Self {
        self.script()
            .queued
            .entry((method, path.into()))
            .or_default()
            .push_back(reply);
        self
    }

    /// Sets the reply used once a route's queue is exhausted
    pub fn always(&self, method: Method, path: impl Into<String>, reply: MockReply) -> &Self {
        self.script().fallback.insert((method, path.into()), reply);
        self
    }

    /// All requests received so far, in order
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.script().recorded.clone()
    }

    /// Requests received for one route
    pub fn requests_to(&self, method: &Method, path: &str) -> Vec<RecordedRequest> {
        self.script()
            .recorded
            .iter()
            .filter(|r| r.method() == method && r.path() == path)
            .cloned()
            .collect()
    }

    /// Number of requests received for one route
    pub fn count(&self, method: &Method, path: &str) -> usize {
        self.requests_to(method, path).len()
    }

    /// Forgets recorded requests; scripted replies are kept
    pub fn reset_requests(&self) {
        self.script().recorded.clear();
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(
        &self,
        request: &ApiRequest,
        bearer: Option<&str>,
    ) -> Result<ApiResponse, TransportError> {
        let mut script = self.script();

        script.recorded.push(RecordedRequest {
            request: request.clone(),
            bearer: bearer.map(str::to_string),
        });

        let key = (request.method.clone(), request.path.clone());
        let queued = script.queued.get_mut(&key).and_then(VecDeque::pop_front);
        let reply = match queued {
            Some(reply) => Some(reply),
            None => script.fallback.get(&key).cloned(),
        };

        match reply {
            Some(reply) => reply.to_result(),
            None => {
                tracing::debug!(method = %request.method, path = %request.path, "Unscripted mock route");
                Ok(ApiResponse::new(
                    StatusCode::NOT_FOUND,
                    json!({"detail": "Not found."}).to_string(),
                ))
            }
        }
    }
}
