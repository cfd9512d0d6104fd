//! Common test utilities for integration tests
//!
//! - Scripted client context over [`MockTransport`]
//! - JSON fixtures for users and tasks
//! - Login scripting helpers

#![allow(dead_code)]

use reqwest::Method;
use serde_json::{json, Value as JsonValue};
use std::sync::Arc;
use taskdesk_client::auth::token::{TOKEN_PATH, TOKEN_REFRESH_PATH};
use taskdesk_client::session::SessionStore;
use taskdesk_client::storage::{MemoryStorage, TokenStorage};
use taskdesk_client::transport::{MockReply, MockTransport};
use taskdesk_client::TaskDeskClient;
use taskdesk_shared::models::task::StatusVocabulary;

pub const ME_PATH: &str = "/api/users/me/";
pub const TASKS_PATH: &str = "/api/tasks/";

/// Client wired to a scripted transport and inspectable storage
pub struct TestContext {
    pub mock: Arc<MockTransport>,
    pub storage: Arc<MemoryStorage>,
    pub client: TaskDeskClient,
}

impl TestContext {
    /// Context without a session
    pub fn new() -> Self {
        Self::with_storage(MemoryStorage::new(), StatusVocabulary::Canonical)
    }

    /// Context with a persisted token pair
    pub fn with_session(access: &str, refresh: &str) -> Self {
        Self::with_storage(
            MemoryStorage::with_values([("token", access), ("refresh_token", refresh)]),
            StatusVocabulary::Canonical,
        )
    }

    pub fn with_storage(storage: MemoryStorage, vocabulary: StatusVocabulary) -> Self {
        init_tracing();

        let mock = Arc::new(MockTransport::new());
        let storage = Arc::new(storage);
        let session = Arc::new(SessionStore::load(storage.clone()).unwrap());
        let client = TaskDeskClient::with_transport(mock.clone(), session, vocabulary);

        Self {
            mock,
            storage,
            client,
        }
    }

    /// Value persisted under `key`
    pub fn stored(&self, key: &str) -> Option<String> {
        self.storage.get(key).unwrap()
    }

    /// Bearer tokens of all recorded requests, in order
    pub fn bearers(&self) -> Vec<Option<String>> {
        self.mock.requests().into_iter().map(|r| r.bearer).collect()
    }

    pub fn refresh_calls(&self) -> usize {
        self.mock.count(&Method::POST, TOKEN_REFRESH_PATH)
    }

    /// Scripts a successful token issue followed by the current user
    pub fn script_login(&self, access: &str, refresh: &str, user: JsonValue) {
        self.mock.enqueue(
            Method::POST,
            TOKEN_PATH,
            MockReply::ok(json!({"access": access, "refresh": refresh})),
        );
        self.mock.enqueue(Method::GET, ME_PATH, MockReply::ok(user));
    }
}

/// Routes library logs to the test harness
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("taskdesk_client=debug")
        .with_test_writer()
        .try_init();
}

pub fn user_json(id: i64, username: &str, role: &str) -> JsonValue {
    json!({
        "id": id,
        "username": username,
        "email": format!("{}@example.com", username),
        "first_name": "",
        "last_name": "",
        "role": role
    })
}

pub fn alice() -> JsonValue {
    user_json(1, "alice", "user")
}

pub fn task_json(id: i64, title: &str, status: &str) -> JsonValue {
    json!({
        "id": id,
        "title": title,
        "description": "",
        "status": status,
        "priority": "medium",
        "due_date": null,
        "created_at": "2024-02-01T09:00:00Z",
        "updated_at": "2024-02-01T09:00:00Z",
        "assigned_to": null,
        "created_by": 1,
        "comments": [],
        "attachments": []
    })
}
