//! Auth session controller
//!
//! Drives the [`AuthState`] machine on top of the session store:
//!
//! ```text
//! Unauthenticated --login/register/bootstrap--> Authenticating
//! Authenticating  --token + current user------> Authenticated
//! Authenticating  --failure-------------------> Unauthenticated
//! Authenticated   --logout/expiry-------------> Unauthenticated
//! ```
//!
//! Front ends react to [`SessionEvent`]s, whose [`SessionEvent::redirect`]
//! says where to navigate.

use std::sync::Arc;
use taskdesk_shared::models::auth::Credentials;
use taskdesk_shared::models::user::{CreateUser, User};
use tokio::sync::{broadcast, watch};
use tokio_stream::wrappers::WatchStream;
use validator::Validate;

use crate::api::users::{UsersApi, USERS_PATH};
use crate::auth::token::TokenEndpoint;
use crate::error::ClientResult;
use crate::http::ApiClient;
use crate::session::{AuthState, SessionEvent, SessionStore};
use crate::transport::ApiRequest;

/// Login, registration, logout and bootstrap
#[derive(Clone)]
pub struct AuthController {
    api: Arc<ApiClient>,
    tokens: TokenEndpoint,
    users: UsersApi,
}

impl AuthController {
    pub fn new(api: Arc<ApiClient>, tokens: TokenEndpoint) -> Self {
        let users = UsersApi::new(api.clone());
        Self { api, tokens, users }
    }

    fn session(&self) -> &Arc<SessionStore> {
        self.api.session()
    }

    /// Logs in with username and password
    ///
    /// On success the tokens are stored, the current user is cached and
    /// [`SessionEvent::LoggedIn`] is emitted. On failure the session is
    /// cleared and the state returns to `Unauthenticated`.
    pub async fn login(&self, credentials: &Credentials) -> ClientResult<User> {
        credentials.validate()?;

        self.session().transition(AuthState::Authenticating);
        let result = self.establish(credentials).await;
        self.finish_login(result)
    }

    /// Creates an account, then logs in with it
    pub async fn register(&self, data: &CreateUser) -> ClientResult<User> {
        data.validate()?;

        self.session().transition(AuthState::Authenticating);

        let created = self
            .api
            .send_json::<_, User>(ApiRequest::post(USERS_PATH).anonymous(), data)
            .await;

        let result = match created {
            Ok(user) => {
                tracing::info!(user_id = user.id, username = %user.username, "Registered user");
                self.establish(&Credentials::new(&data.username, &data.password))
                    .await
            }
            Err(e) => Err(e),
        };

        self.finish_login(result)
    }

    async fn establish(&self, credentials: &Credentials) -> ClientResult<User> {
        let pair = self.tokens.obtain(credentials).await?;
        self.session().set_tokens(&pair.access, &pair.refresh)?;

        let user = self.users.me().await?;
        self.session().set_current_user(user.clone());
        Ok(user)
    }

    fn finish_login(&self, result: ClientResult<User>) -> ClientResult<User> {
        match result {
            Ok(user) => {
                self.session().transition(AuthState::Authenticated);
                tracing::info!(user_id = user.id, username = %user.username, "Logged in");
                self.session().emit(SessionEvent::LoggedIn(user.clone()));
                Ok(user)
            }
            Err(e) => {
                if let Err(storage_err) = self.session().clear() {
                    tracing::error!(error = %storage_err, "Failed to clear session after login failure");
                }
                self.session().transition(AuthState::Unauthenticated);
                Err(e)
            }
        }
    }

    /// Ends the session locally
    ///
    /// No request is made. The in-memory session, state change and
    /// [`SessionEvent::LoggedOut`] always happen; only a storage failure is
    /// reported.
    pub async fn logout(&self) -> ClientResult<()> {
        let result = self.session().clear();
        self.session().transition(AuthState::Unauthenticated);

        tracing::info!("Logged out");
        self.session().emit(SessionEvent::LoggedOut);

        Ok(result?)
    }

    /// Verifies a persisted session at startup
    ///
    /// Returns the restored user, or `None` when there is nothing to restore
    /// or the server rejected the session (which is then cleared). Transport
    /// and server errors keep the tokens and are returned so the caller can
    /// retry later.
    pub async fn bootstrap(&self) -> ClientResult<Option<User>> {
        if !self.session().has_session() {
            tracing::debug!("No persisted session");
            return Ok(None);
        }

        self.session().transition(AuthState::Authenticating);

        match self.users.me().await {
            Ok(user) => {
                self.session().set_current_user(user.clone());
                self.session().transition(AuthState::Authenticated);
                tracing::info!(user_id = user.id, username = %user.username, "Session restored");
                self.session().emit(SessionEvent::Restored(user.clone()));
                Ok(Some(user))
            }
            Err(e) if e.is_auth_failure() => {
                tracing::info!("Persisted session rejected");
                self.session().expire()?;
                Ok(None)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Could not verify persisted session");
                self.session().transition(AuthState::Unauthenticated);
                Err(e)
            }
        }
    }

    /// Cached current user
    pub fn current_user(&self) -> Option<User> {
        self.session().current_user()
    }

    /// Fetches the current user and updates the cache
    pub async fn reload_current_user(&self) -> ClientResult<User> {
        let user = self.users.me().await?;
        self.session().set_current_user(user.clone());
        Ok(user)
    }

    pub fn state(&self) -> AuthState {
        self.session().state()
    }

    /// Receiver of auth state changes
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.session().subscribe()
    }

    /// Receiver of session events
    pub fn events(&self) -> broadcast::Receiver<SessionEvent> {
        self.session().events()
    }

    /// Auth state as a stream, starting with the current value
    pub fn state_stream(&self) -> WatchStream<AuthState> {
        WatchStream::new(self.subscribe())
    }
}
