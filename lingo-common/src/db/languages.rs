//! Language lookups

use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use uuid::Uuid;

use super::models::Language;
use super::parse_uuid;
use crate::Result;

fn row_to_language(row: &SqliteRow) -> Result<Language> {
    let id: String = row.get("id");
    Ok(Language {
        id: parse_uuid(&id)?,
        code: row.get("code"),
        name: row.get("name"),
    })
}

pub async fn list_languages(pool: &SqlitePool) -> Result<Vec<Language>> {
    let rows = sqlx::query("SELECT id, code, name FROM languages ORDER BY code")
        .fetch_all(pool)
        .await?;

    rows.iter().map(row_to_language).collect()
}

pub async fn get_language(pool: &SqlitePool, id: Uuid) -> Result<Option<Language>> {
    let row = sqlx::query("SELECT id, code, name FROM languages WHERE id = ?")
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(row_to_language).transpose()
}

/// Find a language by code (case-insensitive)
pub async fn find_language_by_code(pool: &SqlitePool, code: &str) -> Result<Option<Language>> {
    let row = sqlx::query("SELECT id, code, name FROM languages WHERE code = ?")
        .bind(code.trim().to_lowercase())
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(row_to_language).transpose()
}
