//! OAuth initiate and callback handlers

use axum::{
    extract::{Extension, Query},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::CookieJar;
use oauth2::CsrfToken;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, warn};

use super::linkage::join_or_create;
use super::providers::{OAuthError, Provider};
use crate::auth::cookies::{OAUTH_REDIRECT_COOKIE, OAUTH_STATE_COOKIE};
use crate::auth::models::AuthResult;
use crate::common::{ApiError, AppState};

type Params = Query<HashMap<String, String>>;

/// GET /auth/google
pub async fn google_start(
    Extension(state): Extension<Arc<AppState>>,
    jar: CookieJar,
    Query(params): Params,
) -> Result<(CookieJar, Redirect), ApiError> {
    start(Provider::Google, &state, jar, &params)
}

/// GET /auth/google/callback
pub async fn google_callback(
    Extension(state): Extension<Arc<AppState>>,
    jar: CookieJar,
    Query(params): Params,
) -> Response {
    callback(Provider::Google, &state, jar, &params).await
}

/// GET /auth/github
pub async fn github_start(
    Extension(state): Extension<Arc<AppState>>,
    jar: CookieJar,
    Query(params): Params,
) -> Result<(CookieJar, Redirect), ApiError> {
    start(Provider::GitHub, &state, jar, &params)
}

/// GET /auth/github/callback
pub async fn github_callback(
    Extension(state): Extension<Arc<AppState>>,
    jar: CookieJar,
    Query(params): Params,
) -> Response {
    callback(Provider::GitHub, &state, jar, &params).await
}

/// Random, URL-safe CSRF state.
pub fn generate_state() -> String {
    CsrfToken::new_random().secret().clone()
}

fn start(
    provider: Provider,
    state: &AppState,
    jar: CookieJar,
    params: &HashMap<String, String>,
) -> Result<(CookieJar, Redirect), ApiError> {
    let client = state.oauth.get(provider);
    if !client.is_configured() {
        error!(provider = %provider, "OAuth login attempted but client is not configured");
        return Err(OAuthError::NotConfigured.into());
    }

    let default_redirect = &state.config.oauth.default_redirect;
    let redirect_uri = match params.get("redirect_uri").map(|r| r.trim()) {
        None | Some("") => default_redirect.as_str(),
        Some(uri) if uri.starts_with("http://") || uri.starts_with("https://") => uri,
        Some(uri) => {
            warn!(provider = %provider, redirect_uri = %uri, "Ignoring non-http redirect_uri");
            default_redirect.as_str()
        }
    };

    let csrf_state = generate_state();
    let location = client.authorization_url(&csrf_state)?;
    let jar = jar
        .add(state.cookies.oauth_state_cookie(&csrf_state))
        .add(state.cookies.oauth_redirect_cookie(redirect_uri));

    info!(provider = %provider, "Starting OAuth flow");
    Ok((jar, Redirect::temporary(&location)))
}

async fn callback(
    provider: Provider,
    state: &AppState,
    jar: CookieJar,
    params: &HashMap<String, String>,
) -> Response {
    let Some(expected) = jar
        .get(OAUTH_STATE_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
    else {
        warn!(provider = %provider, "OAuth callback without state cookie");
        return ApiError::CsrfMismatch("State cookie not found".to_string()).into_response();
    };

    let returned = params.get("state").map(String::as_str).filter(|v| !v.is_empty());
    if returned != Some(expected.as_str()) {
        warn!(provider = %provider, "OAuth callback state mismatch");
        return ApiError::CsrfMismatch("Invalid state parameter".to_string()).into_response();
    }

    let redirect_uri = jar
        .get(OAUTH_REDIRECT_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| state.config.oauth.default_redirect.clone());

    // state is single use; drop the handshake cookies whatever happens next
    let jar = jar
        .add(state.cookies.cleared(OAUTH_STATE_COOKIE))
        .add(state.cookies.cleared(OAUTH_REDIRECT_COOKIE));

    match complete(provider, state, params).await {
        Ok(result) => {
            info!(provider = %provider, user_id = %result.user.id, "OAuth login complete");
            let jar = jar.add(state.cookies.session_cookie(&result.token, result.expires_at));
            (jar, Redirect::temporary(&redirect_uri)).into_response()
        }
        Err(e) => {
            error!(provider = %provider, error = %e, "OAuth callback failed");
            (jar, e).into_response()
        }
    }
}

async fn complete(
    provider: Provider,
    state: &AppState,
    params: &HashMap<String, String>,
) -> Result<AuthResult, ApiError> {
    if let Some(error) = params.get("error") {
        return Err(ApiError::ProviderError(format!(
            "{} authorization failed: {}",
            provider, error
        )));
    }

    let code = params
        .get("code")
        .filter(|c| !c.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Code not provided".to_string()))?;

    let client = state.oauth.get(provider);
    if !client.is_configured() {
        return Err(OAuthError::NotConfigured.into());
    }

    let access_token = client.exchange_code(code).await?;
    let profile = client.fetch_profile(&access_token).await?;
    let user = join_or_create(state.auth.store(), provider, &profile).await?;

    state.auth.start_session(&user).await
}
