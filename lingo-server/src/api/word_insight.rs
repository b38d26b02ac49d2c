//! On-demand explanation of a word the learner selects
//!
//! Nothing is stored; the stored explanation set of the phrase is left to
//! the coverage loop.

use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use super::{load_phrase_context, required};
use crate::services::tutor::WordInsight;
use crate::{ApiResult, AppState};

#[derive(Debug, Deserialize)]
pub struct WordInsightRequest {
    pub phrase_id: Uuid,
    pub word: String,
    #[serde(default)]
    pub word_index: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct WordInsightResponse {
    pub word: String,
    #[serde(flatten)]
    pub insight: WordInsight,
}

/// POST /api/phrases/word-explanation
pub async fn explain_word(
    State(state): State<AppState>,
    Json(payload): Json<WordInsightRequest>,
) -> ApiResult<Json<WordInsightResponse>> {
    let word = required("word", &payload.word)?;
    let (phrase, context) = load_phrase_context(&state.db, payload.phrase_id).await?;

    let insight = state
        .tutor
        .explain_word(
            &phrase,
            &context.native_language,
            &context.learning_language,
            &word,
            payload.word_index,
        )
        .await?;

    debug!(phrase_id = %phrase.id, word = %word, "Explained selected word");
    Ok(Json(WordInsightResponse { word, insight }))
}

pub fn word_insight_routes() -> Router<AppState> {
    Router::new().route("/api/phrases/word-explanation", post(explain_word))
}
