//! HTTP API handlers for lingo-server

pub mod audio;
pub mod generate;
pub mod grammar;
pub mod health;
pub mod languages;
pub mod phrases;
pub mod users;
pub mod verify;
pub mod word_explanations;
pub mod word_insight;

pub use audio::audio_routes;
pub use generate::generate_routes;
pub use grammar::grammar_routes;
pub use health::health_routes;
pub use languages::language_routes;
pub use phrases::phrase_routes;
pub use users::user_routes;
pub use verify::verify_routes;
pub use word_explanations::word_explanation_routes;
pub use word_insight::word_insight_routes;

use lingo_common::db::{languages as db_languages, phrases as db_phrases};
use lingo_common::{Language, Phrase, PhraseContext};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::services::phrase_generation::phrase_context;
use crate::{ApiError, ApiResult};

pub(crate) async fn load_phrase(db: &SqlitePool, id: Uuid) -> ApiResult<Phrase> {
    db_phrases::get_phrase(db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Phrase {}", id)))
}

pub(crate) async fn load_language(db: &SqlitePool, id: Uuid) -> ApiResult<Language> {
    db_languages::get_language(db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Language {}", id)))
}

pub(crate) async fn language_by_code(db: &SqlitePool, code: &str) -> ApiResult<Language> {
    db_languages::find_language_by_code(db, code)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Language '{}'", code)))
}

/// Phrase with both of its languages resolved
pub(crate) async fn load_phrase_context(db: &SqlitePool, id: Uuid) -> ApiResult<(Phrase, PhraseContext)> {
    let phrase = load_phrase(db, id).await?;
    let native = load_language(db, phrase.native_language_id).await?;
    let learning = load_language(db, phrase.learning_language_id).await?;
    let context = phrase_context(&phrase, native, learning);
    Ok((phrase, context))
}

/// Trimmed non-empty text, or a 400 naming the field
pub(crate) fn required(field: &str, value: &str) -> ApiResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(ApiError::BadRequest(format!("{} is required", field)))
    } else {
        Ok(trimmed.to_string())
    }
}
