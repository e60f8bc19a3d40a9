//! # GraphQL Module
//!
//! Schema, resolvers and the HTTP endpoint for the public API.

pub mod handlers;
pub mod routes;
pub mod schema;
pub mod types;

#[cfg(test)]
mod tests;

pub use routes::graphql_routes;
pub use schema::build_schema;
