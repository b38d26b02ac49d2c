//! Database initialization
//!
//! Creates the database file and schema on first run; every statement is
//! idempotent so opening an existing database is safe.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;
use uuid::Uuid;

/// Languages available out of the box (code, display name)
pub const SEED_LANGUAGES: [(&str, &str); 6] = [
    ("es", "Español"),
    ("en", "English"),
    ("de", "Deutsch"),
    ("fr", "Français"),
    ("it", "Italiano"),
    ("pt", "Português"),
];

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // WAL lets readers proceed while a generation batch writes
    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    create_schema(&pool).await?;

    Ok(pool)
}

/// Single-connection in-memory database with the full schema
///
/// Every SQLite `:memory:` connection is its own database, so the pool is
/// pinned to one connection that never expires.
pub async fn init_memory_database() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await?;

    create_schema(&pool).await?;

    Ok(pool)
}

/// Create all tables and seed languages
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query("PRAGMA foreign_keys = ON").execute(pool).await?;

    create_languages_table(pool).await?;
    create_users_table(pool).await?;
    create_phrases_table(pool).await?;
    create_word_explanations_table(pool).await?;
    create_progress_table(pool).await?;

    seed_languages(pool).await?;

    Ok(())
}

async fn create_languages_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS languages (
            id TEXT PRIMARY KEY,
            code TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_users_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            name TEXT,
            role TEXT NOT NULL DEFAULT 'USER',
            native_language TEXT NOT NULL,
            learning_language TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_phrases_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS phrases (
            id TEXT PRIMARY KEY,
            native_language_id TEXT NOT NULL REFERENCES languages(id),
            learning_language_id TEXT NOT NULL REFERENCES languages(id),
            native_text TEXT NOT NULL,
            learning_text TEXT NOT NULL,
            context TEXT,
            difficulty TEXT NOT NULL,
            cefr_level TEXT NOT NULL,
            category TEXT,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_phrases_language_pair \
         ON phrases(native_language_id, learning_language_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Word explanations, unique per (phrase, word, language pair)
///
/// The unique constraint is what makes concurrent duplicate inserts safe.
async fn create_word_explanations_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS word_explanations (
            id TEXT PRIMARY KEY,
            phrase_id TEXT NOT NULL REFERENCES phrases(id) ON DELETE CASCADE,
            word TEXT NOT NULL,
            native_language_id TEXT NOT NULL,
            learning_language_id TEXT NOT NULL,
            translation TEXT NOT NULL,
            explanation TEXT NOT NULL,
            examples TEXT,
            grammar_explanation TEXT,
            created_at TEXT NOT NULL,
            UNIQUE (phrase_id, word, native_language_id, learning_language_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_progress_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS user_phrase_progress (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            phrase_id TEXT NOT NULL REFERENCES phrases(id) ON DELETE CASCADE,
            user_answer TEXT NOT NULL,
            ai_feedback TEXT NOT NULL,
            is_correct INTEGER NOT NULL,
            accuracy_score INTEGER NOT NULL,
            words_learned TEXT,
            words_forgotten TEXT,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_progress_user ON user_phrase_progress(user_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn seed_languages(pool: &SqlitePool) -> Result<()> {
    for (code, name) in SEED_LANGUAGES {
        sqlx::query("INSERT OR IGNORE INTO languages (id, code, name) VALUES (?, ?, ?)")
            .bind(Uuid::new_v4().to_string())
            .bind(code)
            .bind(name)
            .execute(pool)
            .await?;
    }

    Ok(())
}
