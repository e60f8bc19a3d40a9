//! Credential Store: user rows, password hashing and session rows.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{debug, error, info};
use uuid::Uuid;

use super::models::{progression, NewUser, Session, User};
use super::password::PasswordService;
use crate::common::helpers::{db_timestamp, now_timestamp};
use crate::common::{safe_email_log, ApiError};
use crate::oauth::providers::Provider;

pub const EMAIL_TAKEN_MESSAGE: &str = "user with this email already exists";

const USER_COLUMNS: &str = "id, email, password_hash, first_name, last_name, email_verified, \
google_id, github_id, rating, peak_rating, current_rank, rank_tier, rank_subdivision, \
global_rank, total_matches, wins, losses, last_activity, created_at, updated_at";

#[derive(Clone)]
pub struct CredentialStore {
    db: SqlitePool,
    passwords: PasswordService,
}

impl CredentialStore {
    pub fn new(db: SqlitePool, passwords: PasswordService) -> Self {
        Self { db, passwords }
    }

    // ---- Users ----

    /// Registers a password account. The email pre-check only produces the
    /// friendly error; the UNIQUE constraint on `users.email` decides races.
    pub async fn create_user(
        &self,
        email: &str,
        raw_password: &str,
        first_name: Option<&str>,
        last_name: Option<&str>,
    ) -> Result<User, ApiError> {
        if self.get_user_by_email(email).await?.is_some() {
            debug!(email = %safe_email_log(email), "Signup rejected: email already registered");
            return Err(ApiError::Conflict(EMAIL_TAKEN_MESSAGE.to_string()));
        }

        let password_hash = self.passwords.hash_password(raw_password)?;

        self.insert_user(NewUser {
            email: email.to_string(),
            password_hash,
            first_name: non_empty(first_name),
            last_name: non_empty(last_name),
            email_verified: false,
            ..NewUser::default()
        })
        .await
    }

    /// Inserts a row with the starting progression values and returns it
    /// as stored.
    pub async fn insert_user(&self, new_user: NewUser) -> Result<User, ApiError> {
        let id = Uuid::new_v4().to_string();
        let now = now_timestamp();

        sqlx::query(
            r#"
            INSERT INTO users (id, email, password_hash, first_name, last_name, email_verified,
                google_id, github_id, rating, peak_rating, current_rank, rank_tier,
                rank_subdivision, total_matches, wins, losses, last_activity, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0, 0, 0, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&new_user.email)
        .bind(&new_user.password_hash)
        .bind(new_user.first_name.as_deref())
        .bind(new_user.last_name.as_deref())
        .bind(new_user.email_verified)
        .bind(new_user.google_id.as_deref())
        .bind(new_user.github_id.as_deref())
        .bind(progression::RATING)
        .bind(progression::PEAK_RATING)
        .bind(progression::CURRENT_RANK)
        .bind(progression::RANK_TIER)
        .bind(progression::RANK_SUBDIVISION)
        .bind(&now)
        .bind(&now)
        .bind(&now)
        .execute(&self.db)
        .await
        .map_err(|e| {
            let err = ApiError::from_insert(e, EMAIL_TAKEN_MESSAGE);
            if !matches!(err, ApiError::Conflict(_)) {
                error!(user_id = %id, error = %err, "Database error inserting user");
            }
            err
        })?;

        info!(
            user_id = %id,
            email = %safe_email_log(&new_user.email),
            "User account created"
        );

        self.get_user_by_id(&id)
            .await?
            .ok_or_else(|| ApiError::InternalServer("created user not found".to_string()))
    }

    /// Constant-time verification through the hash scheme; `false` on any failure.
    pub fn verify_password(&self, hash: &str, candidate: &str) -> bool {
        self.passwords.verify_password(hash, candidate)
    }

    /// Same hashing cost as [`Self::verify_password`], for a login whose
    /// email matched no account.
    pub fn verify_unknown(&self, candidate: &str) {
        self.passwords.verify_dummy(candidate)
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, ApiError> {
        self.fetch_user_where("email", email).await
    }

    pub async fn get_user_by_id(&self, id: &str) -> Result<Option<User>, ApiError> {
        self.fetch_user_where("id", id).await
    }

    pub async fn get_user_by_google_id(&self, google_id: &str) -> Result<Option<User>, ApiError> {
        self.fetch_user_where("google_id", google_id).await
    }

    pub async fn get_user_by_github_id(&self, github_id: &str) -> Result<Option<User>, ApiError> {
        self.fetch_user_where("github_id", github_id).await
    }

    pub async fn get_user_by_provider_id(
        &self,
        provider: Provider,
        external_id: &str,
    ) -> Result<Option<User>, ApiError> {
        match provider {
            Provider::Google => self.get_user_by_google_id(external_id).await,
            Provider::GitHub => self.get_user_by_github_id(external_id).await,
        }
    }

    async fn fetch_user_where(&self, column: &str, value: &str) -> Result<Option<User>, ApiError> {
        // column is always one of the fixed names above
        let query = format!("SELECT {} FROM users WHERE {} = ?", USER_COLUMNS, column);
        sqlx::query_as::<_, User>(&query)
            .bind(value)
            .fetch_optional(&self.db)
            .await
            .map_err(|e| {
                error!(error = %e, column = %column, "Database error during user lookup");
                ApiError::DatabaseError(e)
            })
    }

    /// All users, newest first.
    pub async fn list_users(&self) -> Result<Vec<User>, ApiError> {
        let query = format!("SELECT {} FROM users ORDER BY created_at DESC, rowid DESC", USER_COLUMNS);
        sqlx::query_as::<_, User>(&query)
            .fetch_all(&self.db)
            .await
            .map_err(ApiError::DatabaseError)
    }

    /// Links an external identity to an existing account. Writing the same
    /// id twice is a no-op; an id owned by another account is a `Conflict`.
    pub async fn update_provider_id(
        &self,
        user_id: &str,
        provider: Provider,
        external_id: &str,
    ) -> Result<(), ApiError> {
        let query = format!(
            "UPDATE users SET {} = ?, updated_at = ? WHERE id = ?",
            provider.id_column()
        );
        sqlx::query(&query)
            .bind(external_id)
            .bind(now_timestamp())
            .bind(user_id)
            .execute(&self.db)
            .await
            .map_err(|e| {
                ApiError::from_insert(
                    e,
                    &format!("{} account is already linked to another user", provider.display_name()),
                )
            })?;

        info!(user_id = %user_id, provider = %provider, "Linked external identity");
        Ok(())
    }

    // ---- Sessions ----

    pub async fn create_session(
        &self,
        user_id: &str,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<Session, ApiError> {
        let session = Session {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            token: token.to_string(),
            expires_at: db_timestamp(expires_at),
            created_at: now_timestamp(),
        };

        sqlx::query(
            "INSERT INTO sessions (id, user_id, token, expires_at, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&session.id)
        .bind(&session.user_id)
        .bind(&session.token)
        .bind(&session.expires_at)
        .bind(&session.created_at)
        .execute(&self.db)
        .await
        .map_err(|e| {
            error!(error = %e, user_id = %user_id, "Database error creating session");
            ApiError::DatabaseError(e)
        })?;

        debug!(session_id = %session.id, user_id = %user_id, "Session created");
        Ok(session)
    }

    /// Live session for a token; expired rows are treated as absent.
    pub async fn get_session_by_token(&self, token: &str) -> Result<Option<Session>, ApiError> {
        sqlx::query_as::<_, Session>(
            "SELECT id, user_id, token, expires_at, created_at FROM sessions \
             WHERE token = ? AND expires_at > ?",
        )
        .bind(token)
        .bind(now_timestamp())
        .fetch_optional(&self.db)
        .await
        .map_err(ApiError::DatabaseError)
    }

    pub async fn delete_session(&self, token: &str) -> Result<u64, ApiError> {
        let result = sqlx::query("DELETE FROM sessions WHERE token = ?")
            .bind(token)
            .execute(&self.db)
            .await
            .map_err(ApiError::DatabaseError)?;
        Ok(result.rows_affected())
    }

    /// Bulk removal of a user's sessions. Not used by the login flows.
    #[allow(dead_code)]
    pub async fn delete_user_sessions(&self, user_id: &str) -> Result<u64, ApiError> {
        let result = sqlx::query("DELETE FROM sessions WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.db)
            .await
            .map_err(ApiError::DatabaseError)?;
        Ok(result.rows_affected())
    }

    /// Deletes expired sessions. Not scheduled by the service itself.
    #[allow(dead_code)]
    pub async fn sweep_expired_sessions(&self) -> Result<u64, ApiError> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
            .bind(now_timestamp())
            .execute(&self.db)
            .await
            .map_err(ApiError::DatabaseError)?;
        info!(removed = result.rows_affected(), "Swept expired sessions");
        Ok(result.rows_affected())
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
