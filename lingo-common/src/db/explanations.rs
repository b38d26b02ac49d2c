//! Word explanation persistence
//!
//! Words are normalized before every write and lookup, so the unique key
//! (phrase, word, native language, learning language) always compares
//! normalized forms.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use uuid::Uuid;

use super::models::{ExamplePair, WordExplanation};
use super::{conflict_or_database, decode_json_list, parse_uuid};
use crate::repair::{ExplanationScope, ExplanationStore, NewWordExplanation};
use crate::text::normalize;
use crate::{Error, Result};

const SELECT_COLUMNS: &str = r#"
    SELECT id, phrase_id, word, native_language_id, learning_language_id,
           translation, explanation, examples, grammar_explanation, created_at
    FROM word_explanations
"#;

fn row_to_explanation(row: &SqliteRow) -> Result<WordExplanation> {
    let id: String = row.get("id");
    let phrase_id: String = row.get("phrase_id");
    let native_language_id: String = row.get("native_language_id");
    let learning_language_id: String = row.get("learning_language_id");
    let created_at: DateTime<Utc> = row.get("created_at");

    Ok(WordExplanation {
        id: parse_uuid(&id)?,
        phrase_id: parse_uuid(&phrase_id)?,
        word: row.get("word"),
        native_language_id: parse_uuid(&native_language_id)?,
        learning_language_id: parse_uuid(&learning_language_id)?,
        translation: row.get("translation"),
        explanation: row.get("explanation"),
        examples: decode_json_list::<ExamplePair>("examples", row.get("examples")),
        grammar_explanation: row.get("grammar_explanation"),
        created_at,
    })
}

/// Insert one explanation
///
/// Returns [`Error::Conflict`] when the word is already explained for this
/// phrase and language pair.
pub async fn insert_explanation(
    pool: &SqlitePool,
    new: &NewWordExplanation,
) -> Result<WordExplanation> {
    let word = normalize(&new.word);
    if word.is_empty() {
        return Err(Error::InvalidInput("explanation word is empty".to_string()));
    }

    let examples = if new.examples.is_empty() {
        None
    } else {
        Some(serde_json::to_string(&new.examples)?)
    };

    let explanation = WordExplanation {
        id: Uuid::new_v4(),
        phrase_id: new.scope.phrase_id,
        word,
        native_language_id: new.scope.native_language_id,
        learning_language_id: new.scope.learning_language_id,
        translation: new.translation.clone(),
        explanation: new.explanation.clone(),
        examples: new.examples.clone(),
        grammar_explanation: new.grammar_explanation.clone(),
        created_at: Utc::now(),
    };

    sqlx::query(
        r#"
        INSERT INTO word_explanations (
            id, phrase_id, word, native_language_id, learning_language_id,
            translation, explanation, examples, grammar_explanation, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(explanation.id.to_string())
    .bind(explanation.phrase_id.to_string())
    .bind(&explanation.word)
    .bind(explanation.native_language_id.to_string())
    .bind(explanation.learning_language_id.to_string())
    .bind(&explanation.translation)
    .bind(&explanation.explanation)
    .bind(examples)
    .bind(&explanation.grammar_explanation)
    .bind(explanation.created_at)
    .execute(pool)
    .await
    .map_err(|e| {
        conflict_or_database(e, || {
            format!(
                "explanation for '{}' already exists on phrase {}",
                explanation.word, explanation.phrase_id
            )
        })
    })?;

    Ok(explanation)
}

/// Delete all explanations of a word in a scope, returning rows removed
pub async fn delete_explanations(
    pool: &SqlitePool,
    scope: &ExplanationScope,
    word: &str,
) -> Result<u64> {
    let result = sqlx::query(
        r#"
        DELETE FROM word_explanations
        WHERE phrase_id = ? AND word = ? AND native_language_id = ? AND learning_language_id = ?
        "#,
    )
    .bind(scope.phrase_id.to_string())
    .bind(normalize(word))
    .bind(scope.native_language_id.to_string())
    .bind(scope.learning_language_id.to_string())
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// All explanations in a scope, oldest first
pub async fn list_explanations(
    pool: &SqlitePool,
    scope: &ExplanationScope,
) -> Result<Vec<WordExplanation>> {
    let sql = format!(
        "{} WHERE phrase_id = ? AND native_language_id = ? AND learning_language_id = ? \
         ORDER BY created_at, word",
        SELECT_COLUMNS
    );

    let rows = sqlx::query(&sql)
        .bind(scope.phrase_id.to_string())
        .bind(scope.native_language_id.to_string())
        .bind(scope.learning_language_id.to_string())
        .fetch_all(pool)
        .await?;

    rows.iter().map(row_to_explanation).collect()
}

/// Explanation of one word in a scope
pub async fn find_explanation(
    pool: &SqlitePool,
    scope: &ExplanationScope,
    word: &str,
) -> Result<Option<WordExplanation>> {
    let sql = format!(
        "{} WHERE phrase_id = ? AND word = ? AND native_language_id = ? AND learning_language_id = ?",
        SELECT_COLUMNS
    );

    let row = sqlx::query(&sql)
        .bind(scope.phrase_id.to_string())
        .bind(normalize(word))
        .bind(scope.native_language_id.to_string())
        .bind(scope.learning_language_id.to_string())
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(row_to_explanation).transpose()
}

/// Cache a grammar explanation on an existing explanation row
pub async fn set_grammar_explanation(
    pool: &SqlitePool,
    explanation_id: Uuid,
    grammar_explanation: &str,
) -> Result<()> {
    let result = sqlx::query("UPDATE word_explanations SET grammar_explanation = ? WHERE id = ?")
        .bind(grammar_explanation)
        .bind(explanation_id.to_string())
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("word explanation {}", explanation_id)));
    }

    Ok(())
}

/// [`ExplanationStore`] backed by the SQLite pool
#[derive(Clone)]
pub struct SqliteExplanationStore {
    pool: SqlitePool,
}

impl SqliteExplanationStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ExplanationStore for SqliteExplanationStore {
    async fn create(&self, explanation: &NewWordExplanation) -> Result<WordExplanation> {
        insert_explanation(&self.pool, explanation).await
    }

    async fn delete_many(&self, scope: &ExplanationScope, word: &str) -> Result<u64> {
        delete_explanations(&self.pool, scope, word).await
    }

    async fn find_many(&self, scope: &ExplanationScope) -> Result<Vec<WordExplanation>> {
        list_explanations(&self.pool, scope).await
    }
}
