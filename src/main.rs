// src/main.rs
use axum::{
    extract::Extension,
    http::{StatusCode, Uri},
    routing::get,
    Json, Router,
};
use dotenv::dotenv;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::path::PathBuf;
use std::{net::SocketAddr, str::FromStr, sync::Arc};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

// ============================================================================
// MODULE IMPORTS
// ============================================================================

mod auth;
mod common;
mod graphql;
mod oauth;
mod questions;
mod session_cookie_middleware;

// ============================================================================
// COMMON IMPORTS
// ============================================================================

use common::config::Config;
use common::run_mode::{apply_cli_override, log_run_mode_status, RunMode};
use common::{ApiError, AppState};
use oauth::providers::OAuthProviders;

// ============================================================================
// MAIN APPLICATION ENTRY POINT
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    // ========================================================================
    // CONFIGURATION
    // ========================================================================

    let run_mode = apply_cli_override(RunMode::from_env());
    log_run_mode_status(run_mode);

    let config = Config::from_env(run_mode)?;

    // ========================================================================
    // DATABASE SETUP
    // ========================================================================

    if let Some(path_part) = config.database_url.strip_prefix("sqlite://") {
        let path_without_params = path_part.split('?').next().unwrap_or("");
        if !path_without_params.is_empty() && !path_without_params.starts_with(':') {
            let db_path = PathBuf::from(path_without_params);
            if let Some(parent) = db_path.parent() {
                if !parent.as_os_str().is_empty() {
                    tokio::fs::create_dir_all(parent).await?;
                }
            }
        }
    }

    let connect_options =
        SqliteConnectOptions::from_str(&config.database_url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .connect_with(connect_options)
        .await?;

    common::migrations::run_migrations(&pool).await?;

    // ========================================================================
    // APPLICATION STATE
    // ========================================================================

    let oauth = OAuthProviders::from_config(&config.oauth);
    let port = config.port;
    let state = Arc::new(AppState::new(pool, config, oauth));

    let app = build_app(state);

    // ========================================================================
    // SERVER STARTUP
    // ========================================================================

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Listening on {}", addr);
    info!("GraphQL playground at http://localhost:{}/", port);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

// ============================================================================
// ROUTER COMPOSITION
// ============================================================================

pub fn build_app(state: Arc<AppState>) -> Router {
    let schema = graphql::build_schema(state.clone());
    let cors = cors_layer(&state.config.cors_origins);

    Router::new()
        .merge(graphql::graphql_routes())
        .merge(oauth::oauth_routes())
        .route("/health", get(health))
        .fallback(not_found)
        .layer(Extension(schema))
        .layer(Extension(state))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<axum::http::HeaderValue> = origins
        .iter()
        .filter_map(|origin| origin.trim().parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::OPTIONS,
        ])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::AUTHORIZATION,
        ])
        .allow_credentials(true)
}

async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

async fn not_found(uri: Uri) -> ApiError {
    ApiError::NotFound(format!("No route for {}", uri.path()))
}
