// src/common/config.rs
//! Process configuration, read once from the environment at startup and
//! shared read-only afterwards.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::RngCore;
use std::env;
use thiserror::Error;
use tracing::{info, warn};

use super::run_mode::RunMode;
use crate::auth::password::PasswordConfig;
use crate::oauth::config::OAuthConfig;

const DEFAULT_DATABASE_URL: &str = "sqlite://standoff.db";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_CORS_ORIGINS: &str = "http://localhost:3000,http://localhost:3001,\
http://localhost:3002,http://localhost:3003,http://localhost:3004,\
http://localhost:3005,http://localhost:3006";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set in production mode")]
    MissingSecret(&'static str),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Environment variable lookup; empty values count as unset.
pub type Lookup<'a> = &'a dyn Fn(&str) -> Option<String>;

pub fn env_lookup(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

#[derive(Debug, Clone)]
pub struct Config {
    pub run_mode: RunMode,
    pub database_url: String,
    pub port: u16,
    pub jwt_secret: String,
    pub cors_origins: Vec<String>,
    pub oauth: OAuthConfig,
    pub password: PasswordConfig,
}

impl Config {
    pub fn from_env(run_mode: RunMode) -> Result<Self, ConfigError> {
        Self::from_lookup(run_mode, &env_lookup)
    }

    pub fn from_lookup(run_mode: RunMode, lookup: Lookup<'_>) -> Result<Self, ConfigError> {
        let database_url =
            lookup("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());

        let port = match lookup("PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|_| ConfigError::Invalid(format!("PORT is not a port number: {}", raw)))?,
            None => DEFAULT_PORT,
        };

        let jwt_secret = resolve_jwt_secret(run_mode, lookup("JWT_SECRET"))?;

        let cors_origins = lookup("CORS_ORIGINS")
            .unwrap_or_else(|| DEFAULT_CORS_ORIGINS.to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        let oauth = OAuthConfig::from_lookup(lookup)?;
        let password = PasswordConfig::from_lookup(lookup)?;

        Ok(Self {
            run_mode,
            database_url,
            port,
            jwt_secret,
            cors_origins,
            oauth,
            password,
        })
    }
}

/// Production refuses to start without a configured secret. Development
/// falls back to a random per-process secret, so sessions do not survive
/// a restart.
fn resolve_jwt_secret(run_mode: RunMode, configured: Option<String>) -> Result<String, ConfigError> {
    match configured {
        Some(secret) => {
            info!("JWT signing secret loaded from environment");
            Ok(secret)
        }
        None if run_mode.is_production() => Err(ConfigError::MissingSecret("JWT_SECRET")),
        None => {
            warn!("JWT_SECRET not set - using a random secret for this process only");
            let mut bytes = [0u8; 32];
            rand::thread_rng().fill_bytes(&mut bytes);
            Ok(URL_SAFE_NO_PAD.encode(bytes))
        }
    }
}
