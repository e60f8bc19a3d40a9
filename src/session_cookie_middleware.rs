// src/session_cookie_middleware.rs
//! Fallback session cookie propagation for the GraphQL endpoint.
//!
//! After a request has been answered, look at the JSON result for a
//! successful `signup` or `login` payload and set the `auth_token` cookie
//! from it, unless the resolver already did.

use axum::{
    body::{to_bytes, Body},
    extract::{Extension, Request},
    http::{header::CONTENT_TYPE, StatusCode},
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error};

use crate::auth::cookies::{append_cookie, sets_cookie, AUTH_COOKIE};
use crate::auth::token::session_ttl;
use crate::common::{safe_token_log, AppState};

const SESSION_FIELDS: [&str; 2] = ["signup", "login"];

pub async fn propagate_session_cookie(
    Extension(state): Extension<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let response = next.run(request).await;

    if sets_cookie(response.headers(), AUTH_COOKIE) || !is_json(&response) {
        return Ok(response);
    }

    let (mut parts, body) = response.into_parts();
    let bytes = to_bytes(body, usize::MAX).await.map_err(|e| {
        error!(error = %e, "Failed to buffer GraphQL response");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    if let Some((token, expires_at)) = find_session_token(&bytes) {
        debug!(token = %safe_token_log(&token), "Setting session cookie from response payload");
        append_cookie(
            &mut parts.headers,
            &state.cookies.session_cookie(&token, expires_at),
        );
    }

    Ok(Response::from_parts(parts, Body::from(bytes)))
}

fn is_json(response: &Response) -> bool {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map_or(false, |v| v.starts_with("application/json"))
}

/// Token and expiry of the first `signup`/`login` result carrying a token.
/// A missing or unreadable `expiresAt` falls back to a full session lifetime.
pub fn find_session_token(body: &[u8]) -> Option<(String, DateTime<Utc>)> {
    let json: Value = serde_json::from_slice(body).ok()?;
    let data = json.get("data")?;

    SESSION_FIELDS.iter().find_map(|field| {
        let payload = data.get(*field)?;
        let token = payload
            .get("token")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())?;

        let expires_at = payload
            .get("expiresAt")
            .and_then(Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|d| d.with_timezone(&Utc))
            .unwrap_or_else(|| Utc::now() + session_ttl());

        Some((token.to_string(), expires_at))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::state::test_support::test_state;
    use axum::{
        http::header::SET_COOKIE, middleware, response::IntoResponse, routing::post, Json, Router,
    };
    use tower::ServiceExt;

    #[test]
    fn test_find_session_token() {
        let body = br#"{"data":{"login":{"token":"abc","expiresAt":"2030-01-02T03:04:05Z","user":{"id":"1"}}}}"#;
        let (token, expires_at) = find_session_token(body).unwrap();
        assert_eq!(token, "abc");
        assert_eq!(expires_at.to_rfc3339(), "2030-01-02T03:04:05+00:00");
    }

    #[test]
    fn test_missing_expiry_uses_session_lifetime() {
        let body = br#"{"data":{"signup":{"token":"abc"}}}"#;
        let (_, expires_at) = find_session_token(body).unwrap();
        let remaining = expires_at - Utc::now();
        assert!(remaining > session_ttl() - chrono::Duration::minutes(1));
    }

    #[test]
    fn test_ignores_other_payloads() {
        assert!(find_session_token(br#"{"data":{"me":{"id":"1"}}}"#).is_none());
        assert!(find_session_token(br#"{"data":{"login":null},"errors":[{"message":"x"}]}"#).is_none());
        assert!(find_session_token(br#"{"data":{"login":{"token":""}}}"#).is_none());
        assert!(find_session_token(b"not json").is_none());
    }

    async fn run(handler_body: &'static str) -> Response {
        let state = test_state().await;
        let app = Router::new()
            .route(
                "/query",
                post(move || async move {
                    Json(serde_json::from_str::<Value>(handler_body).unwrap()).into_response()
                })
                .route_layer(middleware::from_fn(propagate_session_cookie)),
            )
            .layer(Extension(state));

        app.oneshot(
            axum::http::Request::builder()
                .method("POST")
                .uri("/query")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_sets_cookie_when_handler_did_not() {
        let response =
            run(r#"{"data":{"login":{"token":"tok","expiresAt":"2030-01-02T03:04:05Z"}}}"#).await;

        let cookies: Vec<_> = response.headers().get_all(SET_COOKIE).iter().collect();
        assert_eq!(cookies.len(), 1);
        let cookie = cookies[0].to_str().unwrap();
        assert!(cookie.starts_with("auth_token=tok"));
        assert!(cookie.contains("HttpOnly"));

        let body = to_bytes(response.into_body(), 4096).await.unwrap();
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["data"]["login"]["token"], "tok");
    }

    #[tokio::test]
    async fn test_leaves_other_responses_alone() {
        let response = run(r#"{"data":{"users":[]}}"#).await;
        assert!(response.headers().get(SET_COOKIE).is_none());
    }
}
