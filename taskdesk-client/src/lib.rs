//! # TaskDesk Client
//!
//! Authenticated client for the TaskDesk multi-tenant task management API.
//!
//! ## Module Organization
//!
//! - `config`: configuration from defaults, file and environment
//! - `error`: client error taxonomy
//! - `storage`: token persistence backends
//! - `session`: session store, auth state and lifecycle events
//! - `transport`: HTTP transport port, `reqwest` adapter and scripted mock
//! - `http`: request pipeline with silent token refresh
//! - `auth`: token endpoints and the login/logout controller
//! - `api`: typed users, tasks and tenants operations
//! - `jwt`: unverified claim inspection for display
//!
//! ## Example
//!
//! ```no_run
//! use taskdesk_client::TaskDeskClient;
//! use taskdesk_shared::models::auth::Credentials;
//! use taskdesk_shared::models::task::TaskFilter;
//!
//! # async fn example() -> Result<(), taskdesk_client::ClientError> {
//! let client = TaskDeskClient::new("http://localhost:8000")?;
//! client.auth().login(&Credentials::new("alice", "secret")).await?;
//!
//! for task in client.tasks().list(&TaskFilter::default()).await? {
//!     println!("{} [{}]", task.title, task.status);
//! }
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod jwt;
pub mod session;
pub mod storage;
pub mod transport;

pub use client::TaskDeskClient;
pub use error::{ClientError, ClientResult};
pub use session::{AuthState, Route, SessionEvent, SessionStore};

/// Current version of the TaskDesk client library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
