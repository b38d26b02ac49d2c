//! Answer attempts (user phrase progress)

use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use uuid::Uuid;

use super::models::PhraseProgress;
use super::{decode_json_list, parse_uuid};
use crate::Result;

#[derive(Debug, Clone)]
pub struct NewProgress {
    pub user_id: Uuid,
    pub phrase_id: Uuid,
    pub user_answer: String,
    pub ai_feedback: String,
    pub is_correct: bool,
    pub accuracy_score: i64,
    pub words_learned: Vec<String>,
    pub words_forgotten: Vec<String>,
}

/// Progress row joined with the phrase it was recorded for
#[derive(Debug, Clone)]
pub struct ProgressEntry {
    pub progress: PhraseProgress,
    pub phrase_native_text: String,
}

fn encode_words(words: &[String]) -> Result<Option<String>> {
    if words.is_empty() {
        Ok(None)
    } else {
        Ok(Some(serde_json::to_string(words)?))
    }
}

fn row_to_progress(row: &SqliteRow) -> Result<PhraseProgress> {
    let id: String = row.get("id");
    let user_id: String = row.get("user_id");
    let phrase_id: String = row.get("phrase_id");
    let is_correct: i64 = row.get("is_correct");
    let created_at: DateTime<Utc> = row.get("created_at");

    Ok(PhraseProgress {
        id: parse_uuid(&id)?,
        user_id: parse_uuid(&user_id)?,
        phrase_id: parse_uuid(&phrase_id)?,
        user_answer: row.get("user_answer"),
        ai_feedback: row.get("ai_feedback"),
        is_correct: is_correct != 0,
        accuracy_score: row.get("accuracy_score"),
        words_learned: decode_json_list("words_learned", row.get("words_learned")),
        words_forgotten: decode_json_list("words_forgotten", row.get("words_forgotten")),
        created_at,
    })
}

pub async fn record_progress(pool: &SqlitePool, new: &NewProgress) -> Result<PhraseProgress> {
    let progress = PhraseProgress {
        id: Uuid::new_v4(),
        user_id: new.user_id,
        phrase_id: new.phrase_id,
        user_answer: new.user_answer.clone(),
        ai_feedback: new.ai_feedback.clone(),
        is_correct: new.is_correct,
        accuracy_score: new.accuracy_score,
        words_learned: new.words_learned.clone(),
        words_forgotten: new.words_forgotten.clone(),
        created_at: Utc::now(),
    };

    sqlx::query(
        r#"
        INSERT INTO user_phrase_progress (
            id, user_id, phrase_id, user_answer, ai_feedback, is_correct,
            accuracy_score, words_learned, words_forgotten, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(progress.id.to_string())
    .bind(progress.user_id.to_string())
    .bind(progress.phrase_id.to_string())
    .bind(&progress.user_answer)
    .bind(&progress.ai_feedback)
    .bind(progress.is_correct as i64)
    .bind(progress.accuracy_score)
    .bind(encode_words(&progress.words_learned)?)
    .bind(encode_words(&progress.words_forgotten)?)
    .bind(progress.created_at)
    .execute(pool)
    .await?;

    Ok(progress)
}

/// All attempts of a user, newest first
pub async fn list_progress_for_user(pool: &SqlitePool, user_id: Uuid) -> Result<Vec<ProgressEntry>> {
    let rows = sqlx::query(
        r#"
        SELECT p.id, p.user_id, p.phrase_id, p.user_answer, p.ai_feedback, p.is_correct,
               p.accuracy_score, p.words_learned, p.words_forgotten, p.created_at,
               ph.native_text AS phrase_native_text
        FROM user_phrase_progress p
        JOIN phrases ph ON ph.id = p.phrase_id
        WHERE p.user_id = ?
        ORDER BY p.created_at DESC
        "#,
    )
    .bind(user_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| {
            Ok(ProgressEntry {
                progress: row_to_progress(row)?,
                phrase_native_text: row.get("phrase_native_text"),
            })
        })
        .collect()
}
