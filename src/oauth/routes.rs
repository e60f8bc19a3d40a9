//! OAuth routes

use axum::{routing::get, Router};

use super::handlers;

/// Creates the OAuth router
///
/// # Routes
/// - `GET /auth/google` - start Google login (`?redirect_uri=` optional)
/// - `GET /auth/google/callback` - Google redirects back here
/// - `GET /auth/github` - start GitHub login
/// - `GET /auth/github/callback` - GitHub redirects back here
pub fn oauth_routes() -> Router {
    Router::new()
        .route("/auth/google", get(handlers::google_start))
        .route("/auth/google/callback", get(handlers::google_callback))
        .route("/auth/github", get(handlers::github_start))
        .route("/auth/github/callback", get(handlers::github_callback))
}
