//! Session token issuance and validation (HS256 JWT).
//!
//! Validation is self-contained: it never consults the sessions table, so
//! a token stays valid until its own expiry even after logout.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;
use tracing::debug;

use super::models::Claims;
use crate::common::ApiError;

pub const TOKEN_ISSUER: &str = "codestandoff";

/// Lifetime of a session token, its cookie and its session row.
pub fn session_ttl() -> Duration {
    Duration::days(7)
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("token has expired")]
    Expired,

    #[error("token is not valid yet")]
    NotYetValid,

    #[error("invalid token signature")]
    InvalidSignature,

    #[error("malformed token: {0}")]
    Malformed(String),

    #[error("failed to sign token: {0}")]
    Signing(String),
}

impl From<TokenError> for ApiError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::Signing(msg) => ApiError::InternalServer(format!("jwt error: {}", msg)),
            _ => ApiError::NotAuthenticated("invalid or expired token".to_string()),
        }
    }
}

/// A freshly signed token together with its expiry.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl TokenService {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Issue a token valid from now for [`session_ttl`].
    pub fn issue(&self, user_id: &str, email: &str) -> Result<IssuedToken, TokenError> {
        self.issue_at(user_id, email, Utc::now())
    }

    pub fn issue_at(
        &self,
        user_id: &str,
        email: &str,
        issued_at: DateTime<Utc>,
    ) -> Result<IssuedToken, TokenError> {
        let expires_at = issued_at + session_ttl();
        let claims = Claims {
            user_id: user_id.to_string(),
            email: email.to_string(),
            iss: TOKEN_ISSUER.to_string(),
            sub: user_id.to_string(),
            iat: issued_at.timestamp(),
            nbf: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))?;

        Ok(IssuedToken { token, expires_at })
    }

    /// Verify signature, structure and the `[nbf, exp]` window.
    pub fn validate(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.set_issuer(&[TOKEN_ISSUER]);

        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                debug!(error = %e, "JWT validation failed");
                match e.kind() {
                    ErrorKind::ExpiredSignature => TokenError::Expired,
                    ErrorKind::ImmatureSignature => TokenError::NotYetValid,
                    ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                    _ => TokenError::Malformed(e.to_string()),
                }
            })
    }
}
