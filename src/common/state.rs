// Application state shared across all modules

use sqlx::SqlitePool;
use std::sync::Arc;

use super::config::Config;
use crate::auth::cookies::CookiePolicy;
use crate::auth::password::PasswordService;
use crate::auth::service::AuthService;
use crate::auth::store::CredentialStore;
use crate::auth::token::TokenService;
use crate::oauth::providers::OAuthProviders;

/// Application state: database pool, immutable configuration and the
/// services built from it. Built once in `main`, read-only afterwards.
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Arc<Config>,
    pub auth: AuthService,
    pub oauth: OAuthProviders,
    pub cookies: CookiePolicy,
}

impl AppState {
    pub fn new(db: SqlitePool, config: Config, oauth: OAuthProviders) -> Self {
        let cookies = CookiePolicy::for_mode(config.run_mode);
        let store = CredentialStore::new(db.clone(), PasswordService::new(config.password.clone()));
        let tokens = TokenService::new(&config.jwt_secret);
        let auth = AuthService::new(store, tokens, cookies);

        Self {
            db,
            config: Arc::new(config),
            auth,
            oauth,
            cookies,
        }
    }
}
