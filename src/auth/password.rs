//! # Password hashing and verification (Argon2id)
//!
//! [`PasswordService::hash_password`] salts with [`OsRng`] and returns a
//! PHC-format string (`$argon2id$v=19$m=19456,t=2,p=1$...`), which is what
//! the `users.password_hash` column stores. The cost parameters travel
//! inside the PHC string, so verification keeps working for hashes made
//! under an older cost setting.
//!
//! [`PasswordService::verify_password`] never errors: a mismatch, an empty
//! hash (OAuth-only accounts) or a malformed hash all verify as `false`.
//! [`PasswordService::verify_dummy`] spends the same Argon2 work against a
//! hash nobody owns, so a login for an unknown email takes as long as one
//! with a wrong password.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use thiserror::Error;
use tracing::warn;

use crate::common::config::{ConfigError, Lookup};
use crate::common::ApiError;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("Invalid Argon2 params: {0}")]
    InvalidParams(String),

    #[error("Failed to hash password: {0}")]
    HashingFailed(String),
}

impl From<PasswordError> for ApiError {
    fn from(e: PasswordError) -> Self {
        ApiError::InternalServer(e.to_string())
    }
}

/// Argon2id cost parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordConfig {
    /// Memory in KiB
    pub memory_cost: u32,
    /// Iterations; tunable through `PASSWORD_HASH_COST`
    pub time_cost: u32,
    pub parallelism: u32,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            memory_cost: 19_456,
            time_cost: 2,
            parallelism: 1,
        }
    }
}

impl PasswordConfig {
    pub fn from_lookup(lookup: Lookup<'_>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(raw) = lookup("PASSWORD_HASH_COST") {
            config.time_cost = raw
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|cost| *cost >= 1)
                .ok_or_else(|| {
                    ConfigError::Invalid(format!("PASSWORD_HASH_COST must be >= 1: {}", raw))
                })?;
        }
        Ok(config)
    }

    /// Cheapest valid parameters, for tests.
    #[cfg(test)]
    pub fn fast() -> Self {
        Self {
            memory_cost: 1_024,
            time_cost: 1,
            parallelism: 1,
        }
    }
}

const DUMMY_PASSWORD: &str = "standoff-dummy-password";

#[derive(Debug, Clone)]
pub struct PasswordService {
    config: PasswordConfig,
    dummy_hash: String,
}

impl PasswordService {
    pub fn new(config: PasswordConfig) -> Self {
        let mut service = Self {
            config,
            dummy_hash: String::new(),
        };
        match service.hash_password(DUMMY_PASSWORD) {
            Ok(hash) => service.dummy_hash = hash,
            Err(e) => warn!(error = %e, "Could not prepare dummy password hash"),
        }
        service
    }

    fn argon2(&self) -> Result<Argon2<'static>, PasswordError> {
        let params = Params::new(
            self.config.memory_cost,
            self.config.time_cost,
            self.config.parallelism,
            None,
        )
        .map_err(|e| PasswordError::InvalidParams(e.to_string()))?;
        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }

    /// Hash a password with a fresh random salt.
    pub fn hash_password(&self, password: &str) -> Result<String, PasswordError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2()?
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| PasswordError::HashingFailed(e.to_string()))?;
        Ok(hash.to_string())
    }

    /// Verify a candidate password against a stored PHC hash.
    pub fn verify_password(&self, hash: &str, candidate: &str) -> bool {
        let Ok(parsed_hash) = PasswordHash::new(hash) else {
            return false;
        };
        Argon2::default()
            .verify_password(candidate.as_bytes(), &parsed_hash)
            .is_ok()
    }

    /// Runs a full verification against the dummy hash and discards it.
    pub fn verify_dummy(&self, candidate: &str) {
        let _ = self.verify_password(&self.dummy_hash, candidate);
    }
}
