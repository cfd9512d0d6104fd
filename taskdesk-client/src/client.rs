//! Client entry point
//!
//! [`TaskDeskClient`] wires the transport, session store, HTTP core and the
//! per-resource handles together. Handles are cheap to clone and share the
//! same session.

use std::sync::Arc;
use taskdesk_shared::models::task::StatusVocabulary;

use crate::api::{TasksApi, TenantsApi, UsersApi};
use crate::auth::{AuthController, TokenEndpoint};
use crate::config::ClientConfig;
use crate::error::ClientResult;
use crate::http::ApiClient;
use crate::session::SessionStore;
use crate::storage::{FileStorage, MemoryStorage, TokenStorage};
use crate::transport::{HttpTransport, ReqwestTransport};

/// TaskDesk API client
#[derive(Clone)]
pub struct TaskDeskClient {
    api: Arc<ApiClient>,
    auth: AuthController,
    users: UsersApi,
    tasks: TasksApi,
    tenants: TenantsApi,
}

impl TaskDeskClient {
    /// Client for `base_url` with default settings and an in-memory session
    pub fn new(base_url: &str) -> ClientResult<Self> {
        let mut config = ClientConfig::default();
        config.api.base_url = base_url.to_string();
        Self::from_config(&config)
    }

    /// Builds a client from configuration
    ///
    /// A persisted session is loaded from the configured file but not
    /// verified; call [`AuthController::bootstrap`] for that.
    pub fn from_config(config: &ClientConfig) -> ClientResult<Self> {
        config.validate()?;

        let transport = Arc::new(ReqwestTransport::new(&config.api.base_url, config.timeout())?);

        let storage: Arc<dyn TokenStorage> = match &config.session.file {
            Some(path) => {
                tracing::debug!(path = %path.display(), "Using file session storage");
                Arc::new(FileStorage::new(path))
            }
            None => Arc::new(MemoryStorage::new()),
        };
        let session = Arc::new(SessionStore::load(storage)?);

        Ok(Self::with_transport(
            transport,
            session,
            config.api.status_vocabulary,
        ))
    }

    /// Builds a client over any transport
    pub fn with_transport(
        transport: Arc<dyn HttpTransport>,
        session: Arc<SessionStore>,
        vocabulary: StatusVocabulary,
    ) -> Self {
        let tokens = TokenEndpoint::new(transport.clone());
        let api = Arc::new(ApiClient::new(
            transport,
            session,
            Arc::new(tokens.clone()),
            vocabulary,
        ));

        Self {
            auth: AuthController::new(api.clone(), tokens),
            users: UsersApi::new(api.clone()),
            tasks: TasksApi::new(api.clone()),
            tenants: TenantsApi::new(api.clone()),
            api,
        }
    }

    pub fn auth(&self) -> &AuthController {
        &self.auth
    }

    pub fn users(&self) -> &UsersApi {
        &self.users
    }

    pub fn tasks(&self) -> &TasksApi {
        &self.tasks
    }

    pub fn tenants(&self) -> &TenantsApi {
        &self.tenants
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        self.api.session()
    }

    /// HTTP core, for requests without a typed wrapper
    pub fn api(&self) -> &Arc<ApiClient> {
        &self.api
    }
}
