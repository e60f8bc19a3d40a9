//! Authentication data models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// JWT claims structure
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Claims {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub email: String,
    pub iss: String,
    pub sub: String,
    pub iat: i64,
    pub nbf: i64,
    pub exp: i64,
}

/// User database model
#[derive(FromRow, Serialize, Debug, Clone)]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email_verified: bool,
    pub google_id: Option<String>,
    pub github_id: Option<String>,
    pub rating: i64,
    pub peak_rating: i64,
    pub current_rank: Option<String>,
    pub rank_tier: String,
    pub rank_subdivision: i64,
    pub global_rank: Option<i64>,
    pub total_matches: i64,
    pub wins: i64,
    pub losses: i64,
    pub last_activity: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Session database model
#[derive(FromRow, Serialize, Debug, Clone)]
pub struct Session {
    pub id: String,
    pub user_id: String,
    pub token: String,
    pub expires_at: String,
    pub created_at: String,
}

/// Starting progression for every new account.
pub mod progression {
    pub const RATING: i64 = 0;
    pub const PEAK_RATING: i64 = 0;
    pub const CURRENT_RANK: &str = "Bronze 1";
    pub const RANK_TIER: &str = "Bronze";
    pub const RANK_SUBDIVISION: i64 = 1;
}

/// Fields needed to insert a user row. Password accounts carry a hash,
/// OAuth accounts an empty hash plus one provider id.
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email_verified: bool,
    pub google_id: Option<String>,
    pub github_id: Option<String>,
}

/// Signup request
#[derive(Debug, Clone, Deserialize)]
pub struct SignupInput {
    pub email: String,
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Outcome of a successful signup, login or OAuth login.
#[derive(Debug, Clone)]
pub struct AuthResult {
    pub user: User,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}
