//! Session store
//!
//! Owns the access/refresh token pair, the cached current user and the
//! derived [`AuthState`]. It is the only shared mutable state in the client;
//! the HTTP core, the auth controller and the API facade all hold the same
//! `Arc<SessionStore>`.
//!
//! # Invariants
//!
//! - The access and refresh tokens are both present or both absent, in
//!   memory and in storage. A half-session found at load time is discarded.
//! - Tokens are written to storage before the in-memory copy changes, under
//!   the same write lock.
//!
//! # Observers
//!
//! State changes are published on a `watch` channel and lifecycle events on
//! a `broadcast` channel. Front ends subscribe instead of polling:
//!
//! ```
//! use taskdesk_client::session::{AuthState, SessionStore};
//!
//! let store = SessionStore::in_memory();
//! let state = store.subscribe();
//! assert_eq!(*state.borrow(), AuthState::Unauthenticated);
//! ```

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use taskdesk_shared::models::user::User;
use tokio::sync::{broadcast, watch};

use crate::storage::{MemoryStorage, StorageResult, TokenStorage};

/// Storage key of the access token
pub const ACCESS_TOKEN_KEY: &str = "token";

/// Storage key of the refresh token
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";

/// Capacity of the event channel; slow receivers lag rather than block
const EVENT_CAPACITY: usize = 32;

/// Authentication state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum AuthState {
    /// No verified session
    #[default]
    Unauthenticated,

    /// Login, registration or bootstrap in flight
    Authenticating,

    /// Tokens stored and current user resolved
    Authenticated,
}

impl AuthState {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthState::Unauthenticated => "unauthenticated",
            AuthState::Authenticating => "authenticating",
            AuthState::Authenticated => "authenticated",
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthState::Authenticated)
    }

    /// Checks if a state transition is valid
    pub fn can_transition_to(&self, target: AuthState) -> bool {
        match (self, target) {
            // Unauthenticated can only start authenticating
            (AuthState::Unauthenticated, AuthState::Authenticating) => true,

            // Authenticating resolves either way
            (AuthState::Authenticating, AuthState::Authenticated) => true,
            (AuthState::Authenticating, AuthState::Unauthenticated) => true,

            // Authenticated can log out, expire or log in again
            (AuthState::Authenticated, AuthState::Unauthenticated) => true,
            (AuthState::Authenticated, AuthState::Authenticating) => true,

            _ => false,
        }
    }
}

impl fmt::Display for AuthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the front end should navigate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Login,
    Dashboard,
}

impl Route {
    pub fn path(&self) -> &'static str {
        match self {
            Route::Login => "/login",
            Route::Dashboard => "/dashboard",
        }
    }
}

/// Session lifecycle event
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Login or registration succeeded
    LoggedIn(User),

    /// A persisted session was verified at startup
    Restored(User),

    /// The access token was silently replaced
    TokenRefreshed,

    /// The user logged out
    LoggedOut,

    /// The session was dropped because it could not be refreshed
    Expired,
}

impl SessionEvent {
    /// Navigation the front end should perform in response
    pub fn redirect(&self) -> Option<Route> {
        match self {
            SessionEvent::LoggedIn(_) | SessionEvent::Restored(_) => Some(Route::Dashboard),
            SessionEvent::LoggedOut | SessionEvent::Expired => Some(Route::Login),
            SessionEvent::TokenRefreshed => None,
        }
    }
}

#[derive(Default)]
struct SessionData {
    access: Option<String>,
    refresh: Option<String>,
    user: Option<User>,
}

impl SessionData {
    fn has_tokens(&self) -> bool {
        self.access.is_some() && self.refresh.is_some()
    }
}

/// Holder of the token pair and current user
pub struct SessionStore {
    storage: Arc<dyn TokenStorage>,
    data: RwLock<SessionData>,
    state: watch::Sender<AuthState>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionStore {
    /// Loads a persisted session from `storage`
    ///
    /// If only one of the two tokens is stored, both keys are removed and the
    /// store starts empty.
    pub fn load(storage: Arc<dyn TokenStorage>) -> StorageResult<Self> {
        let access = storage.get(ACCESS_TOKEN_KEY)?;
        let refresh = storage.get(REFRESH_TOKEN_KEY)?;

        let data = match (access, refresh) {
            (Some(access), Some(refresh)) => {
                tracing::debug!("Loaded persisted session");
                SessionData {
                    access: Some(access),
                    refresh: Some(refresh),
                    user: None,
                }
            }
            (None, None) => SessionData::default(),
            (access, refresh) => {
                tracing::warn!(
                    has_access = access.is_some(),
                    has_refresh = refresh.is_some(),
                    "Discarding incomplete persisted session"
                );
                storage.delete(ACCESS_TOKEN_KEY)?;
                storage.delete(REFRESH_TOKEN_KEY)?;
                SessionData::default()
            }
        };

        let (state, _) = watch::channel(AuthState::Unauthenticated);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Ok(Self {
            storage,
            data: RwLock::new(data),
            state,
            events,
        })
    }

    /// Creates an empty store backed by memory
    pub fn in_memory() -> Self {
        let storage: Arc<dyn TokenStorage> = Arc::new(MemoryStorage::new());
        let (state, _) = watch::channel(AuthState::Unauthenticated);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Self {
            storage,
            data: RwLock::new(SessionData::default()),
            state,
            events,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, SessionData> {
        self.data.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, SessionData> {
        self.data.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stores a new token pair
    ///
    /// Token contents are not inspected. If the second write fails the first
    /// one is rolled back and the previous session stays in effect.
    pub fn set_tokens(&self, access: &str, refresh: &str) -> StorageResult<()> {
        let mut data = self.write();

        self.storage.set(ACCESS_TOKEN_KEY, access)?;
        if let Err(err) = self.storage.set(REFRESH_TOKEN_KEY, refresh) {
            let rollback = match &data.access {
                Some(previous) => self.storage.set(ACCESS_TOKEN_KEY, previous),
                None => self.storage.delete(ACCESS_TOKEN_KEY).map(|_| ()),
            };
            if let Err(rollback_err) = rollback {
                tracing::error!(error = %rollback_err, "Failed to roll back access token");
            }
            return Err(err);
        }

        data.access = Some(access.to_string());
        data.refresh = Some(refresh.to_string());
        Ok(())
    }

    pub fn access_token(&self) -> Option<String> {
        self.read().access.clone()
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.read().refresh.clone()
    }

    /// Checks if a token pair is held
    pub fn has_session(&self) -> bool {
        self.read().has_tokens()
    }

    /// Swaps in a refreshed access token (and a rotated refresh token)
    ///
    /// Returns `false` without touching anything when no session is held,
    /// e.g. because a logout won the race against the refresh.
    pub fn replace_access_token(&self, access: &str, rotated_refresh: Option<&str>) -> StorageResult<bool> {
        {
            let mut data = self.write();
            if !data.has_tokens() {
                return Ok(false);
            }

            self.storage.set(ACCESS_TOKEN_KEY, access)?;
            data.access = Some(access.to_string());

            if let Some(refresh) = rotated_refresh {
                self.storage.set(REFRESH_TOKEN_KEY, refresh)?;
                data.refresh = Some(refresh.to_string());
            }
        }

        tracing::debug!(rotated = rotated_refresh.is_some(), "Access token replaced");
        self.emit(SessionEvent::TokenRefreshed);
        Ok(true)
    }

    /// Cached current user
    pub fn current_user(&self) -> Option<User> {
        self.read().user.clone()
    }

    pub fn set_current_user(&self, user: User) {
        self.write().user = Some(user);
    }

    /// Removes both tokens and the cached user
    ///
    /// Memory is always cleared. Storage deletion is attempted for both keys
    /// and the first failure is reported.
    pub fn clear(&self) -> StorageResult<()> {
        let mut data = self.write();
        *data = SessionData::default();

        let access = self.storage.delete(ACCESS_TOKEN_KEY);
        let refresh = self.storage.delete(REFRESH_TOKEN_KEY);
        access.and(refresh).map(|_| ())
    }

    /// Drops a session that can no longer be refreshed
    ///
    /// Emits [`SessionEvent::Expired`] when a session was actually held, so
    /// concurrent failures produce a single event.
    pub fn expire(&self) -> StorageResult<()> {
        let had_session = self.has_session();
        let result = self.clear();
        self.transition(AuthState::Unauthenticated);

        if had_session {
            tracing::warn!("Session expired");
            self.emit(SessionEvent::Expired);
        }

        result
    }

    /// Moves to `target` if the transition is valid
    ///
    /// Staying in the same state is a no-op and counts as success.
    pub fn transition(&self, target: AuthState) -> bool {
        let mut accepted = true;

        self.state.send_if_modified(|current| {
            if *current == target {
                return false;
            }
            if !current.can_transition_to(target) {
                accepted = false;
                return false;
            }
            tracing::info!(from = %current, to = %target, "Auth state changed");
            *current = target;
            true
        });

        if !accepted {
            tracing::warn!(to = %target, state = %self.state(), "Rejected auth state transition");
        }
        accepted
    }

    pub fn state(&self) -> AuthState {
        *self.state.borrow()
    }

    /// Receiver of state changes
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    /// Receiver of lifecycle events
    pub fn events(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Publishes an event; having no receivers is fine
    pub fn emit(&self, event: SessionEvent) {
        let _ = self.events.send(event);
    }
}

impl fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.read();
        f.debug_struct("SessionStore")
            .field("has_session", &data.has_tokens())
            .field("user", &data.user.as_ref().map(|u| u.username.as_str()))
            .field("state", &self.state())
            .finish()
    }
}
