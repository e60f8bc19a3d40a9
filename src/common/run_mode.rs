// src/common/run_mode.rs
//! Run mode selection (development vs production)
//! Production mode hardens cookies and refuses to start without secrets

use std::env;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Development,
    Production,
}

impl RunMode {
    /// Reads `APP_ENV`; only `production` (any case) selects production.
    pub fn from_env() -> Self {
        Self::parse(&env::var("APP_ENV").unwrap_or_default())
    }

    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "production" | "prod" => RunMode::Production,
            _ => RunMode::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, RunMode::Production)
    }
}

/// Log run mode status on startup
pub fn log_run_mode_status(mode: RunMode) {
    match mode {
        RunMode::Production => info!("🔒 Production mode - secure cookies, JWT_SECRET required"),
        RunMode::Development => {
            warn!("⚠️  Development mode - cookies are not marked Secure");
        }
    }
}

/// CLI argument parsing for run mode
pub fn parse_run_mode_args<I>(args: I) -> Option<RunMode>
where
    I: IntoIterator<Item = String>,
{
    for arg in args {
        match arg.as_str() {
            "--dev" | "--dev-mode" => return Some(RunMode::Development),
            "--prod" | "--production" => return Some(RunMode::Production),
            _ => {}
        }
    }

    None
}

/// Override run mode from CLI args
pub fn apply_cli_override(mode: RunMode) -> RunMode {
    match parse_run_mode_args(env::args()) {
        Some(cli_mode) => {
            info!(mode = ?cli_mode, "🔧 CLI override for run mode");
            cli_mode
        }
        None => mode,
    }
}
