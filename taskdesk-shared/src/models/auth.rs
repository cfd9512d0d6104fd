//! Authentication payloads
//!
//! The token endpoints speak SimpleJWT-style JSON:
//!
//! ```text
//! POST /api/token/          {"username": "...", "password": "..."} -> {"access": "...", "refresh": "..."}
//! POST /api/token/refresh/  {"refresh": "..."}                     -> {"access": "...", "refresh"?: "..."}
//! ```
//!
//! Tokens are opaque strings as far as these types are concerned.

use serde::{Deserialize, Serialize};
use std::fmt;
use validator::Validate;

/// Login credentials
#[derive(Clone, Serialize, Deserialize, Validate)]
pub struct Credentials {
    /// Username
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,

    /// Password
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Token pair issued by the login endpoint
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    /// Short-lived access token
    pub access: String,

    /// Long-lived refresh token
    pub refresh: String,
}

impl fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TokenPair { .. }")
    }
}

/// Refresh endpoint request body
#[derive(Serialize)]
pub struct RefreshRequest<'a> {
    pub refresh: &'a str,
}

/// Refresh endpoint response
///
/// `refresh` is only present when the server rotates refresh tokens.
#[derive(Clone, Deserialize)]
pub struct RefreshedToken {
    /// New access token
    pub access: String,

    /// Rotated refresh token, if any
    #[serde(default)]
    pub refresh: Option<String>,
}

impl fmt::Debug for RefreshedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshedToken")
            .field("rotated", &self.refresh.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_debug_hides_password() {
        let credentials = Credentials::new("alice", "secret");
        let debug = format!("{:?}", credentials);

        assert!(debug.contains("alice"));
        assert!(!debug.contains("secret"));
    }

    #[test]
    fn test_refreshed_token_without_rotation() {
        let token: RefreshedToken = serde_json::from_str(r#"{"access": "A2"}"#).unwrap();
        assert_eq!(token.access, "A2");
        assert!(token.refresh.is_none());
    }

    #[test]
    fn test_refreshed_token_with_rotation() {
        let token: RefreshedToken =
            serde_json::from_str(r#"{"access": "A2", "refresh": "R2"}"#).unwrap();
        assert_eq!(token.refresh.as_deref(), Some("R2"));
    }

    #[test]
    fn test_empty_credentials_fail_validation() {
        assert!(Credentials::new("", "secret").validate().is_err());
        assert!(Credentials::new("alice", "secret").validate().is_ok());
    }
}
