//! # OAuth Module
//!
//! Federated login through Google and GitHub using the authorization-code
//! flow with a cookie-held CSRF state value. A successful callback resolves
//! the external account to a local user and starts a normal session.

pub mod config;
pub mod handlers;
pub mod linkage;
pub mod providers;
pub mod routes;


pub use routes::oauth_routes;
