//! Token endpoint
//!
//! `POST /api/token/` exchanges credentials for an access/refresh pair and
//! `POST /api/token/refresh/` exchanges a refresh token for a new access
//! token (plus a new refresh token when the server rotates them). Both calls
//! are anonymous and go straight to the transport: a 401 here means the
//! credentials are wrong, not that a session needs refreshing.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::json;
use std::sync::Arc;
use taskdesk_shared::models::auth::{Credentials, RefreshRequest, RefreshedToken, TokenPair};

use crate::error::{ClientError, ClientResult, ErrorBody};
use crate::transport::{ApiRequest, ApiResponse, HttpTransport};

/// Token issue path
pub const TOKEN_PATH: &str = "/api/token/";

/// Token refresh path
pub const TOKEN_REFRESH_PATH: &str = "/api/token/refresh/";

const DEFAULT_LOGIN_FAILURE: &str = "No active account found with the given credentials";

/// Exchanges a refresh token for a new access token
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh(&self, refresh_token: &str) -> ClientResult<RefreshedToken>;
}

/// Client for the token endpoints
#[derive(Clone)]
pub struct TokenEndpoint {
    transport: Arc<dyn HttpTransport>,
}

impl TokenEndpoint {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self { transport }
    }

    async fn post(&self, path: &str, body: serde_json::Value) -> ClientResult<ApiResponse> {
        let request = ApiRequest::post(path).json(body).anonymous();
        tracing::debug!(path = path, "Calling token endpoint");
        Ok(self.transport.send(&request, None).await?)
    }

    /// Issues a token pair for `credentials`
    ///
    /// A 401 becomes [`ClientError::InvalidCredentials`] carrying the server's
    /// `detail`.
    pub async fn obtain(&self, credentials: &Credentials) -> ClientResult<TokenPair> {
        let response = self
            .post(
                TOKEN_PATH,
                json!({
                    "username": credentials.username,
                    "password": credentials.password,
                }),
            )
            .await?;

        if response.is_success() {
            return response.json();
        }

        if response.status() == StatusCode::UNAUTHORIZED {
            let detail = ErrorBody::from_bytes(response.body())
                .detail
                .unwrap_or_else(|| DEFAULT_LOGIN_FAILURE.to_string());
            tracing::info!(username = %credentials.username, "Login rejected");
            return Err(ClientError::InvalidCredentials(detail));
        }

        Err(ClientError::from_response(response.status(), response.body()))
    }
}

#[async_trait]
impl TokenRefresher for TokenEndpoint {
    async fn refresh(&self, refresh_token: &str) -> ClientResult<RefreshedToken> {
        let body = serde_json::to_value(RefreshRequest {
            refresh: refresh_token,
        })?;

        self.post(TOKEN_REFRESH_PATH, body)
            .await?
            .into_result()?
            .json()
    }
}
