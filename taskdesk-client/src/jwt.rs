//! Unverified JWT claim inspection
//!
//! The client never needs to understand its tokens: every decision is driven
//! by the server's 401s. For status display (`whoami`, expiry hints) it can
//! still peek at the payload of a JWT access token.
//!
//! # Security
//!
//! - **Signature**: not checked; the client does not hold the signing key
//! - **Use**: display only, never for control flow
//!
//! Tokens that are not JWTs yield `None`.
//!
//! # Example
//!
//! ```
//! use taskdesk_client::jwt::peek_claims;
//!
//! assert!(peek_claims("opaque-token").is_none());
//! ```

use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

/// Token type claim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

impl TokenType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Access => "access",
            TokenType::Refresh => "refresh",
        }
    }
}

/// Claims issued by the API's token endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject user
    #[serde(default)]
    pub user_id: Option<i64>,

    /// Expiration (Unix seconds)
    #[serde(default)]
    pub exp: Option<i64>,

    #[serde(default)]
    pub iat: Option<i64>,

    #[serde(default)]
    pub token_type: Option<TokenType>,

    /// Token ID
    #[serde(default)]
    pub jti: Option<String>,
}

impl TokenClaims {
    /// Expiration as a timestamp
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.exp.and_then(|exp| Utc.timestamp_opt(exp, 0).single())
    }

    /// Checks if the token is past its expiration at `now`
    ///
    /// Tokens without an `exp` claim are never considered expired.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().map(|exp| exp <= now).unwrap_or(false)
    }
}

/// Reads the claims of a JWT without verifying it
pub fn peek_claims(token: &str) -> Option<TokenClaims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    match decode::<TokenClaims>(token, &DecodingKey::from_secret(&[]), &validation) {
        Ok(data) => Some(data.claims),
        Err(e) => {
            tracing::debug!(error = %e, "Token is not a readable JWT");
            None
        }
    }
}

/// Expiration of a token, if it is a JWT carrying `exp`
pub fn expires_at(token: &str) -> Option<DateTime<Utc>> {
    peek_claims(token).and_then(|claims| claims.expires_at())
}

/// Checks if a token is a JWT that has expired
pub fn is_expired(token: &str, now: DateTime<Utc>) -> bool {
    peek_claims(token)
        .map(|claims| claims.is_expired(now))
        .unwrap_or(false)
}
