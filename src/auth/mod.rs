//! # Auth Module
//!
//! Password accounts and sessions:
//! - Credential Store (`store`, `password`): user and session rows, Argon2 hashes
//! - Token Service (`token`): HS256 session tokens
//! - Propagation Bridge (`cookies`): getting the session cookie onto the response
//! - Auth Service (`service`): signup, login, logout, me

pub mod cookies;
pub mod extractors;
pub mod models;
pub mod password;
pub mod service;
pub mod store;
pub mod token;


pub use extractors::SessionToken;
