//! HTTP client core
//!
//! Single outbound pipeline for every authenticated call:
//!
//! 1. Attach `Authorization: Bearer <access>` when the session holds a token
//! 2. Send the request (attempt 0)
//! 3. On 401, refresh once and replay the identical request (attempt 1)
//! 4. If the refresh fails, expire the session and report
//!    [`ClientError::AuthExpired`] with the original 401 detail
//!
//! A 401 on the replay is returned as-is without a second refresh. Other
//! statuses are never retried. Concurrent 401s refresh independently.

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use taskdesk_shared::models::task::StatusVocabulary;

use crate::auth::TokenRefresher;
use crate::error::{ClientError, ClientResult};
use crate::session::SessionStore;
use crate::transport::{ApiRequest, ApiResponse, AuthMode, HttpTransport};

/// Replays allowed after the first attempt
pub const MAX_REPLAYS: u32 = 1;

/// Authenticated request pipeline
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn HttpTransport>,
    session: Arc<SessionStore>,
    refresher: Arc<dyn TokenRefresher>,
    vocabulary: StatusVocabulary,
}

impl ApiClient {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        session: Arc<SessionStore>,
        refresher: Arc<dyn TokenRefresher>,
        vocabulary: StatusVocabulary,
    ) -> Self {
        Self {
            transport,
            session,
            refresher,
            vocabulary,
        }
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    /// Status vocabulary used for outbound payloads and filters
    pub fn vocabulary(&self) -> StatusVocabulary {
        self.vocabulary
    }

    /// Sends a request, refreshing the session once on 401
    ///
    /// Returns the successful response, or the error matching the final
    /// status.
    pub async fn execute(&self, request: &ApiRequest) -> ClientResult<ApiResponse> {
        let mut attempt = 0;

        loop {
            let response = self.send(request, attempt).await?;

            if response.status() != StatusCode::UNAUTHORIZED || request.auth == AuthMode::Anonymous {
                return response.into_result();
            }

            let unauthorized = ClientError::from_response(response.status(), response.body());

            if attempt >= MAX_REPLAYS {
                tracing::warn!(
                    method = %request.method,
                    path = %request.path,
                    attempt = attempt,
                    "Request still unauthorized after refresh"
                );
                return Err(unauthorized);
            }

            if !self.refresh_session().await {
                if let Err(e) = self.session.expire() {
                    tracing::error!(error = %e, "Failed to clear expired session");
                }
                return Err(unauthorized);
            }

            attempt += 1;
        }
    }

    /// Performs one attempt with the current access token
    async fn send(&self, request: &ApiRequest, attempt: u32) -> ClientResult<ApiResponse> {
        let bearer = match request.auth {
            AuthMode::Bearer => self.session.access_token(),
            AuthMode::Anonymous => None,
        };

        tracing::debug!(
            method = %request.method,
            path = %request.path,
            attempt = attempt,
            authenticated = bearer.is_some(),
            "Sending request"
        );

        let response = self
            .transport
            .send(request, bearer.as_deref())
            .await
            .map_err(|e| {
                tracing::debug!(method = %request.method, path = %request.path, error = %e, "Transport failure");
                e
            })?;

        tracing::debug!(
            method = %request.method,
            path = %request.path,
            attempt = attempt,
            status = response.status().as_u16(),
            "Received response"
        );

        Ok(response)
    }

    /// Exchanges the stored refresh token for a new access token
    ///
    /// Returns `false` on any failure: no refresh token, rejected refresh,
    /// network error, or a session cleared while the refresh was in flight.
    async fn refresh_session(&self) -> bool {
        let Some(refresh_token) = self.session.refresh_token() else {
            tracing::debug!("No refresh token; cannot refresh session");
            return false;
        };

        let refreshed = match self.refresher.refresh(&refresh_token).await {
            Ok(refreshed) => refreshed,
            Err(e) => {
                tracing::warn!(error = %e, "Token refresh failed");
                return false;
            }
        };

        match self
            .session
            .replace_access_token(&refreshed.access, refreshed.refresh.as_deref())
        {
            Ok(true) => {
                tracing::info!("Session refreshed");
                true
            }
            Ok(false) => {
                tracing::info!("Session ended during refresh");
                false
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to store refreshed token");
                false
            }
        }
    }

    /// Sends a request and decodes the JSON response
    pub async fn get_json<T: DeserializeOwned>(&self, request: ApiRequest) -> ClientResult<T> {
        self.execute(&request).await?.json()
    }

    /// Sends a request with a JSON body and decodes the JSON response
    ///
    /// The body's `status` field is written in the configured vocabulary.
    pub async fn send_json<B, T>(&self, request: ApiRequest, body: &B) -> ClientResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let mut value = serde_json::to_value(body)?;
        self.vocabulary.translate_outbound(&mut value);
        self.execute(&request.json(value)).await?.json()
    }

    /// Sends a request whose response body is ignored
    pub async fn send_empty(&self, request: ApiRequest) -> ClientResult<()> {
        self.execute(&request).await.map(|_| ())
    }

    /// Sends a request with a JSON body whose response body is ignored
    pub async fn send_json_empty<B>(&self, request: ApiRequest, body: &B) -> ClientResult<()>
    where
        B: Serialize + ?Sized,
    {
        let mut value = serde_json::to_value(body)?;
        self.vocabulary.translate_outbound(&mut value);
        self.execute(&request.json(value)).await.map(|_| ())
    }
}
