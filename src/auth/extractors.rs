//! Session cookie extractor for Axum

use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::extract::CookieJar;
use std::convert::Infallible;
use tracing::debug;

use super::cookies::AUTH_COOKIE;
use crate::common::safe_token_log;

/// The inbound `auth_token` cookie, if the request carried a non-empty one.
///
/// Never rejects: resolvers that need an identity validate the token
/// themselves, and anonymous requests are fine everywhere else.
#[derive(Debug, Clone, Default)]
pub struct SessionToken(pub Option<String>);

#[async_trait]
impl<S> FromRequestParts<S> for SessionToken
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let token = jar
            .get(AUTH_COOKIE)
            .map(|c| c.value().to_string())
            .filter(|v| !v.is_empty());

        if let Some(token) = &token {
            debug!(token = %safe_token_log(token), "Session cookie present");
        }

        Ok(SessionToken(token))
    }
}
