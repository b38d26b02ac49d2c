//! Phrase persistence

use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use uuid::Uuid;

use super::models::{NewPhrase, Phrase};
use super::parse_uuid;
use crate::{CefrLevel, Difficulty, Result};

const SELECT_COLUMNS: &str = r#"
    SELECT id, native_language_id, learning_language_id, native_text, learning_text,
           context, difficulty, cefr_level, category, created_at
    FROM phrases
"#;

/// Optional filters for phrase listing; `None` matches everything
#[derive(Debug, Clone, Default)]
pub struct PhraseFilter {
    pub native_language_id: Option<Uuid>,
    pub learning_language_id: Option<Uuid>,
    pub difficulty: Option<Difficulty>,
}

/// Phrase fields that may change after creation; `None` keeps the value
///
/// The language pair is fixed: explanations are scoped by it.
#[derive(Debug, Clone, Default)]
pub struct PhraseUpdate {
    pub native_text: Option<String>,
    pub learning_text: Option<String>,
    pub context: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub cefr_level: Option<CefrLevel>,
    pub category: Option<String>,
}

fn row_to_phrase(row: &SqliteRow) -> Result<Phrase> {
    let id: String = row.get("id");
    let native_language_id: String = row.get("native_language_id");
    let learning_language_id: String = row.get("learning_language_id");
    let difficulty: String = row.get("difficulty");
    let cefr_level: String = row.get("cefr_level");
    let created_at: DateTime<Utc> = row.get("created_at");

    Ok(Phrase {
        id: parse_uuid(&id)?,
        native_language_id: parse_uuid(&native_language_id)?,
        learning_language_id: parse_uuid(&learning_language_id)?,
        native_text: row.get("native_text"),
        learning_text: row.get("learning_text"),
        context: row.get("context"),
        difficulty: difficulty.parse()?,
        cefr_level: cefr_level.parse()?,
        category: row.get("category"),
        created_at,
    })
}

pub async fn insert_phrase(pool: &SqlitePool, new: &NewPhrase) -> Result<Phrase> {
    let phrase = Phrase {
        id: Uuid::new_v4(),
        native_language_id: new.native_language_id,
        learning_language_id: new.learning_language_id,
        native_text: new.native_text.trim().to_string(),
        learning_text: new.learning_text.trim().to_string(),
        context: new.context.clone(),
        difficulty: new.difficulty,
        cefr_level: new.cefr_level,
        category: new.category.as_ref().map(|c| c.trim().to_string()),
        created_at: Utc::now(),
    };

    sqlx::query(
        r#"
        INSERT INTO phrases (
            id, native_language_id, learning_language_id, native_text, learning_text,
            context, difficulty, cefr_level, category, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(phrase.id.to_string())
    .bind(phrase.native_language_id.to_string())
    .bind(phrase.learning_language_id.to_string())
    .bind(&phrase.native_text)
    .bind(&phrase.learning_text)
    .bind(&phrase.context)
    .bind(phrase.difficulty.as_str())
    .bind(phrase.cefr_level.as_str())
    .bind(&phrase.category)
    .bind(phrase.created_at)
    .execute(pool)
    .await?;

    Ok(phrase)
}

pub async fn get_phrase(pool: &SqlitePool, id: Uuid) -> Result<Option<Phrase>> {
    let sql = format!("{} WHERE id = ?", SELECT_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(row_to_phrase).transpose()
}

/// Apply an update, returning the updated phrase (None if unknown)
pub async fn update_phrase(pool: &SqlitePool, id: Uuid, update: &PhraseUpdate) -> Result<Option<Phrase>> {
    let result = sqlx::query(
        r#"
        UPDATE phrases SET
            native_text = COALESCE(?, native_text),
            learning_text = COALESCE(?, learning_text),
            context = COALESCE(?, context),
            difficulty = COALESCE(?, difficulty),
            cefr_level = COALESCE(?, cefr_level),
            category = COALESCE(?, category)
        WHERE id = ?
        "#,
    )
    .bind(update.native_text.as_ref().map(|t| t.trim().to_string()))
    .bind(update.learning_text.as_ref().map(|t| t.trim().to_string()))
    .bind(&update.context)
    .bind(update.difficulty.map(|d| d.as_str()))
    .bind(update.cefr_level.map(|c| c.as_str()))
    .bind(update.category.as_ref().map(|c| c.trim().to_string()))
    .bind(id.to_string())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }

    get_phrase(pool, id).await
}

const FILTER_CLAUSE: &str = r#"
    WHERE (?1 IS NULL OR native_language_id = ?1)
      AND (?2 IS NULL OR learning_language_id = ?2)
      AND (?3 IS NULL OR difficulty = ?3)
"#;

fn filter_binds(filter: &PhraseFilter) -> (Option<String>, Option<String>, Option<&'static str>) {
    (
        filter.native_language_id.map(|id| id.to_string()),
        filter.learning_language_id.map(|id| id.to_string()),
        filter.difficulty.map(|d| d.as_str()),
    )
}

/// Phrases matching the filter, newest first
pub async fn list_phrases(pool: &SqlitePool, filter: &PhraseFilter) -> Result<Vec<Phrase>> {
    let sql = format!("{} {} ORDER BY created_at DESC", SELECT_COLUMNS, FILTER_CLAUSE);
    let (native, learning, difficulty) = filter_binds(filter);

    let rows = sqlx::query(&sql)
        .bind(native)
        .bind(learning)
        .bind(difficulty)
        .fetch_all(pool)
        .await?;

    rows.iter().map(row_to_phrase).collect()
}

/// One random phrase matching the filter
pub async fn random_phrase(pool: &SqlitePool, filter: &PhraseFilter) -> Result<Option<Phrase>> {
    let sql = format!("{} {} ORDER BY RANDOM() LIMIT 1", SELECT_COLUMNS, FILTER_CLAUSE);
    let (native, learning, difficulty) = filter_binds(filter);

    let row = sqlx::query(&sql)
        .bind(native)
        .bind(learning)
        .bind(difficulty)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(row_to_phrase).transpose()
}

/// Delete a phrase and (by cascade) its explanations and progress rows
pub async fn delete_phrase(pool: &SqlitePool, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM phrases WHERE id = ?")
        .bind(id.to_string())
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Native texts already stored for a language pair, newest first
pub async fn existing_native_texts(
    pool: &SqlitePool,
    native_language_id: Uuid,
    learning_language_id: Uuid,
) -> Result<Vec<String>> {
    let texts = sqlx::query_scalar::<_, String>(
        r#"
        SELECT native_text FROM phrases
        WHERE native_language_id = ? AND learning_language_id = ?
        ORDER BY created_at DESC
        "#,
    )
    .bind(native_language_id.to_string())
    .bind(learning_language_id.to_string())
    .fetch_all(pool)
    .await?;

    Ok(texts)
}

/// Phrase counts per difficulty for a language pair
pub async fn count_by_difficulty(
    pool: &SqlitePool,
    native_language_id: Uuid,
    learning_language_id: Uuid,
) -> Result<Vec<(Difficulty, i64)>> {
    let rows = sqlx::query_as::<_, (String, i64)>(
        r#"
        SELECT difficulty, COUNT(*) FROM phrases
        WHERE native_language_id = ? AND learning_language_id = ?
        GROUP BY difficulty
        ORDER BY difficulty
        "#,
    )
    .bind(native_language_id.to_string())
    .bind(learning_language_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|(difficulty, count)| Ok((difficulty.parse()?, count)))
        .collect()
}
