//! Auth Service: signup, login, logout and identity lookups.
//!
//! Every successful login path (password or OAuth) goes through
//! [`AuthService::start_session`], which mints the token and persists the
//! session row. Cookie propagation is separate so the GraphQL resolvers and
//! the OAuth callback can each attach it to their own response.

use tracing::{debug, info, warn};

use super::cookies::{CookiePolicy, ResponseSink, AUTH_COOKIE};
use super::models::{AuthResult, SignupInput, User};
use super::store::CredentialStore;
use super::token::TokenService;
use crate::common::validation::{check_email, parse_user_id};
use crate::common::{safe_email_log, safe_token_log, ApiError, ValidationResult, Validator};

pub struct SignupValidator;

impl Validator<SignupInput> for SignupValidator {
    fn validate(&self, data: &SignupInput) -> ValidationResult {
        let mut result = ValidationResult::new();

        check_email(&mut result, "email", &data.email);

        if data.password.is_empty() {
            result.add_error("password", "is required");
        }

        result
    }
}

#[derive(Clone)]
pub struct AuthService {
    store: CredentialStore,
    tokens: TokenService,
    cookies: CookiePolicy,
}

impl AuthService {
    pub fn new(store: CredentialStore, tokens: TokenService, cookies: CookiePolicy) -> Self {
        Self {
            store,
            tokens,
            cookies,
        }
    }

    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    #[cfg(test)]
    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    pub async fn signup(
        &self,
        sink: Option<&ResponseSink>,
        input: SignupInput,
    ) -> Result<AuthResult, ApiError> {
        SignupValidator.validate(&input).into_result()?;

        let email = input.email.trim();
        let user = self
            .store
            .create_user(
                email,
                &input.password,
                input.first_name.as_deref(),
                input.last_name.as_deref(),
            )
            .await?;

        let result = self.start_session(&user).await?;
        self.propagate(sink, &result);

        info!(user_id = %user.id, email = %safe_email_log(email), "User signed up");
        Ok(result)
    }

    /// Unknown email and wrong password fail identically.
    pub async fn login(
        &self,
        sink: Option<&ResponseSink>,
        email: &str,
        password: &str,
    ) -> Result<AuthResult, ApiError> {
        let email = email.trim();
        let user = match self.store.get_user_by_email(email).await? {
            Some(user) => user,
            None => {
                self.store.verify_unknown(password);
                debug!(email = %safe_email_log(email), "Login failed: unknown email");
                return Err(ApiError::InvalidCredentials);
            }
        };

        if !self.store.verify_password(&user.password_hash, password) {
            debug!(user_id = %user.id, "Login failed: password mismatch");
            return Err(ApiError::InvalidCredentials);
        }

        let result = self.start_session(&user).await?;
        self.propagate(sink, &result);

        info!(user_id = %user.id, email = %safe_email_log(email), "User logged in");
        Ok(result)
    }

    /// Always succeeds. The session row is removed when possible and the
    /// cookie is always cleared.
    pub async fn logout(&self, sink: Option<&ResponseSink>, token: Option<&str>) -> bool {
        if let Some(token) = token {
            match self.store.delete_session(token).await {
                Ok(removed) => {
                    debug!(token = %safe_token_log(token), removed = removed, "Session deleted")
                }
                Err(e) => warn!(error = %e, "Failed to delete session during logout"),
            }
        }

        match sink {
            Some(sink) => sink.set_cookie(self.cookies.cleared(AUTH_COOKIE)),
            None => warn!("No response sink available, auth cookie not cleared"),
        }

        true
    }

    /// The user behind an inbound session token.
    pub async fn me(&self, token: Option<&str>) -> Result<User, ApiError> {
        let token =
            token.ok_or_else(|| ApiError::NotAuthenticated("not authenticated".to_string()))?;
        let claims = self.tokens.validate(token)?;

        self.store
            .get_user_by_id(&claims.sub)
            .await?
            .ok_or(ApiError::UserNotFound)
    }

    pub async fn users(&self) -> Result<Vec<User>, ApiError> {
        self.store.list_users().await
    }

    /// `None` for a well-formed id that matches nobody.
    pub async fn user(&self, id: &str) -> Result<Option<User>, ApiError> {
        let id = parse_user_id(id)?;
        self.store.get_user_by_id(&id.to_string()).await
    }

    /// Mints a token for `user` and records the matching session row.
    pub async fn start_session(&self, user: &User) -> Result<AuthResult, ApiError> {
        let issued = self.tokens.issue(&user.id, &user.email)?;
        self.store
            .create_session(&user.id, &issued.token, issued.expires_at)
            .await?;

        Ok(AuthResult {
            user: user.clone(),
            token: issued.token,
            expires_at: issued.expires_at,
        })
    }

    /// Pushes the session cookie for `result` into the response, if there
    /// is one to push into.
    pub fn propagate(&self, sink: Option<&ResponseSink>, result: &AuthResult) {
        let Some(sink) = sink else {
            warn!(user_id = %result.user.id, "No response sink available, auth cookie not set");
            return;
        };

        sink.set_cookie(self.cookies.session_cookie(&result.token, result.expires_at));
    }
}
