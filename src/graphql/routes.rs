//! GraphQL routes

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use super::handlers;
use crate::session_cookie_middleware::propagate_session_cookie;

/// Creates the GraphQL router
///
/// # Routes
/// - `POST /query` - GraphQL endpoint
/// - `GET /` - GraphiQL playground
pub fn graphql_routes() -> Router {
    Router::new()
        .route(
            "/query",
            post(handlers::graphql_handler)
                .route_layer(middleware::from_fn(propagate_session_cookie)),
        )
        .route("/", get(handlers::playground))
}
