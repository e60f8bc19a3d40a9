// src/common/migrations.rs
//! Database migration and schema management

use sqlx::SqlitePool;
use std::env;
use tracing::{info, warn};

/// Run all database migrations
///
/// Tables are created if missing; existing data is kept unless `RESET_DB=true`.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let should_reset_db = env::var("RESET_DB").unwrap_or_else(|_| "false".to_string()) == "true";

    if should_reset_db {
        warn!("⚠️  RESET_DB=true - Dropping all tables and recreating schema...");
        drop_all_tables(pool).await?;
        info!("✅ Dropped old tables");
    }

    create_schema(pool).await?;

    info!("✅ Database migration completed successfully!");
    Ok(())
}

/// Creates every table and index. Idempotent.
pub async fn create_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    create_user_tables(pool).await?;
    create_session_tables(pool).await?;
    create_question_tables(pool).await?;
    create_indexes(pool).await?;
    Ok(())
}

async fn drop_all_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    // Children first so foreign keys never dangle mid-drop.
    for table in ["sessions", "questions", "users"] {
        sqlx::query(&format!("DROP TABLE IF EXISTS {}", table))
            .execute(pool)
            .await?;
    }
    Ok(())
}

async fn create_user_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    // Uniqueness on email and provider ids is the real guard against
    // duplicate accounts; application-level lookups only give nicer errors.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL DEFAULT '',
            first_name TEXT,
            last_name TEXT,
            email_verified INTEGER NOT NULL DEFAULT 0,
            google_id TEXT UNIQUE,
            github_id TEXT UNIQUE,
            rating INTEGER NOT NULL DEFAULT 0,
            peak_rating INTEGER NOT NULL DEFAULT 0,
            current_rank TEXT,
            rank_tier TEXT NOT NULL DEFAULT 'Bronze',
            rank_subdivision INTEGER NOT NULL DEFAULT 1,
            global_rank INTEGER,
            total_matches INTEGER NOT NULL DEFAULT 0,
            wins INTEGER NOT NULL DEFAULT 0,
            losses INTEGER NOT NULL DEFAULT 0,
            last_activity TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_session_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sessions (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            token TEXT NOT NULL,
            expires_at TEXT NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_question_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    // topics holds a JSON array of strings
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS questions (
            id INTEGER PRIMARY KEY,
            title TEXT NOT NULL,
            slug TEXT NOT NULL UNIQUE,
            description TEXT NOT NULL DEFAULT '',
            difficulty TEXT NOT NULL,
            topics TEXT NOT NULL DEFAULT '[]',
            test_case_count INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_indexes(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let indexes = [
        "CREATE INDEX IF NOT EXISTS idx_sessions_token ON sessions(token)",
        "CREATE INDEX IF NOT EXISTS idx_sessions_user_id ON sessions(user_id)",
        "CREATE INDEX IF NOT EXISTS idx_sessions_expires_at ON sessions(expires_at)",
        "CREATE INDEX IF NOT EXISTS idx_users_created_at ON users(created_at)",
        "CREATE INDEX IF NOT EXISTS idx_questions_difficulty ON questions(difficulty)",
    ];

    for statement in indexes {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::state::test_support::memory_pool;

    #[tokio::test]
    async fn test_schema_is_idempotent() {
        let pool = memory_pool().await;
        create_schema(&pool).await.unwrap();
        create_schema(&pool).await.unwrap();

        let tables: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name",
        )
        .fetch_all(&pool)
        .await
        .unwrap();
        let names: Vec<&str> = tables.iter().map(|(n,)| n.as_str()).collect();
        assert_eq!(names, vec!["questions", "sessions", "users"]);
    }

    #[tokio::test]
    async fn test_email_is_unique() {
        let pool = memory_pool().await;
        let insert = "INSERT INTO users (id, email, created_at, updated_at) VALUES (?, ?, '', '')";
        sqlx::query(insert)
            .bind("u1")
            .bind("a@x.com")
            .execute(&pool)
            .await
            .unwrap();
        let err = sqlx::query(insert)
            .bind("u2")
            .bind("a@x.com")
            .execute(&pool)
            .await
            .unwrap_err();
        match err {
            sqlx::Error::Database(db_err) => assert!(db_err.is_unique_violation()),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
