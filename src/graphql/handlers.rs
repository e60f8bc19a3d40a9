//! GraphQL endpoint and playground handlers

use async_graphql::http::GraphiQLSource;
use axum::{
    extract::{Extension, Json},
    response::{Html, IntoResponse, Response},
};
use tracing::debug;

use super::schema::AppSchema;
use crate::auth::cookies::RequestContext;
use crate::auth::SessionToken;

/// POST /query
///
/// Runs one GraphQL request. Resolvers see the inbound session cookie and a
/// response sink through [`RequestContext`]; cookies they set are copied
/// onto the HTTP response after execution.
pub async fn graphql_handler(
    Extension(schema): Extension<AppSchema>,
    SessionToken(token): SessionToken,
    Json(request): Json<async_graphql::Request>,
) -> Response {
    let context = RequestContext::new(token);
    let sink = context.sink.clone();

    debug!(operation = ?request.operation_name, "Executing GraphQL request");
    let result = schema.execute(request.data(context)).await;

    let mut response = Json(result).into_response();
    sink.apply(response.headers_mut());
    response
}

/// GET /
pub async fn playground() -> Html<String> {
    Html(GraphiQLSource::build().endpoint("/query").finish())
}
