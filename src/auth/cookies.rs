//! Session cookie construction and propagation.
//!
//! GraphQL resolvers only return data, but signup/login must set a cookie
//! on the HTTP response. The `/query` handler puts a [`ResponseSink`] into
//! the request-scoped [`RequestContext`]; resolvers push cookies into it and
//! the handler copies them onto the response once execution finishes.
//! `session_cookie_middleware` is the fallback for when that path did not
//! produce a session cookie.

use axum::http::{header::SET_COOKIE, HeaderMap, HeaderValue};
use axum_extra::extract::cookie::{Cookie, SameSite};
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};
use time::{Duration, OffsetDateTime};
use tracing::warn;

use crate::common::run_mode::RunMode;

pub const AUTH_COOKIE: &str = "auth_token";
pub const OAUTH_STATE_COOKIE: &str = "oauth_state";
pub const OAUTH_REDIRECT_COOKIE: &str = "oauth_redirect_uri";

/// Lifetime of the OAuth handshake cookies.
const OAUTH_COOKIE_TTL: Duration = Duration::minutes(10);

/// Attributes shared by every cookie this service sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CookiePolicy {
    pub secure: bool,
}

impl CookiePolicy {
    pub fn for_mode(mode: RunMode) -> Self {
        Self {
            secure: mode.is_production(),
        }
    }

    fn base(&self, name: &'static str, value: String) -> Cookie<'static> {
        Cookie::build((name, value))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.secure)
            .build()
    }

    /// `auth_token`, expiring together with the token it carries.
    pub fn session_cookie(&self, token: &str, expires_at: DateTime<Utc>) -> Cookie<'static> {
        let mut cookie = self.base(AUTH_COOKIE, token.to_string());
        let remaining = (expires_at - Utc::now()).num_seconds().max(0);
        cookie.set_max_age(Duration::seconds(remaining));
        if let Ok(expires) = OffsetDateTime::from_unix_timestamp(expires_at.timestamp()) {
            cookie.set_expires(expires);
        }
        cookie
    }

    /// Expires the named cookie immediately.
    pub fn cleared(&self, name: &'static str) -> Cookie<'static> {
        let mut cookie = self.base(name, String::new());
        cookie.set_max_age(Duration::ZERO);
        cookie.set_expires(OffsetDateTime::UNIX_EPOCH);
        cookie
    }

    pub fn oauth_state_cookie(&self, state: &str) -> Cookie<'static> {
        let mut cookie = self.base(OAUTH_STATE_COOKIE, state.to_string());
        cookie.set_max_age(OAUTH_COOKIE_TTL);
        cookie
    }

    /// Holds the raw redirect target; `CookieJar` percent-encodes it on the
    /// way out and decodes it on the way back in.
    pub fn oauth_redirect_cookie(&self, redirect_uri: &str) -> Cookie<'static> {
        let mut cookie = self.base(OAUTH_REDIRECT_COOKIE, redirect_uri.to_string());
        cookie.set_max_age(OAUTH_COOKIE_TTL);
        cookie
    }
}

/// Collects cookies set during a request's execution.
#[derive(Clone, Default)]
pub struct ResponseSink {
    cookies: Arc<Mutex<Vec<Cookie<'static>>>>,
}

impl ResponseSink {
    pub fn set_cookie(&self, cookie: Cookie<'static>) {
        match self.cookies.lock() {
            Ok(mut cookies) => {
                cookies.retain(|c| c.name() != cookie.name());
                cookies.push(cookie);
            }
            Err(_) => warn!(cookie = %cookie.name(), "Response sink unavailable, cookie not set"),
        }
    }

    pub fn cookies(&self) -> Vec<Cookie<'static>> {
        self.cookies
            .lock()
            .map(|cookies| cookies.clone())
            .unwrap_or_default()
    }

    /// Appends every collected cookie as a `Set-Cookie` header.
    pub fn apply(&self, headers: &mut HeaderMap) {
        for cookie in self.cookies() {
            append_cookie(headers, &cookie);
        }
    }
}

pub fn append_cookie(headers: &mut HeaderMap, cookie: &Cookie<'_>) {
    match HeaderValue::from_str(&cookie.to_string()) {
        Ok(value) => {
            headers.append(SET_COOKIE, value);
        }
        Err(e) => warn!(error = %e, cookie = %cookie.name(), "Cookie is not a valid header value"),
    }
}

/// True when the headers already set the named cookie.
pub fn sets_cookie(headers: &HeaderMap, name: &str) -> bool {
    let prefix = format!("{}=", name);
    headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|v| v.starts_with(&prefix))
}

/// Per-request data handed to GraphQL resolvers.
#[derive(Clone, Default)]
pub struct RequestContext {
    /// Value of the inbound `auth_token` cookie, if any.
    pub session_token: Option<String>,
    pub sink: ResponseSink,
}

impl RequestContext {
    pub fn new(session_token: Option<String>) -> Self {
        Self {
            session_token: session_token.filter(|t| !t.is_empty()),
            sink: ResponseSink::default(),
        }
    }
}
