//! Grammar explanation for a word of a phrase, cached on its explanation row

use axum::{extract::State, routing::post, Json, Router};
use lingo_common::coverage::important_words;
use lingo_common::db::explanations::{find_explanation, insert_explanation, set_grammar_explanation};
use lingo_common::text::normalize;
use lingo_common::NewWordExplanation;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use super::{load_phrase_context, required};
use crate::{ApiError, ApiResult, AppState};

#[derive(Debug, Deserialize)]
pub struct GrammarRequest {
    pub phrase_id: Uuid,
    pub word: String,
}

#[derive(Debug, Serialize)]
pub struct GrammarResponse {
    pub word: String,
    pub grammar_explanation: String,
    pub cached: bool,
}

/// POST /api/phrases/grammar-explanation
pub async fn grammar_explanation(
    State(state): State<AppState>,
    Json(payload): Json<GrammarRequest>,
) -> ApiResult<Json<GrammarResponse>> {
    let word = required("word", &payload.word)?;
    let normalized = normalize(&word);
    if normalized.is_empty() {
        return Err(ApiError::BadRequest("word has no letters".to_string()));
    }

    let (phrase, context) = load_phrase_context(&state.db, payload.phrase_id).await?;

    // Grammar is cached on explanation rows, which exist only for important
    // words; a row for any other word would be an extra
    let is_important = important_words(
        &context.sentence_text,
        &context.learning_language.code,
        &state.filter,
    )
    .iter()
    .any(|token| token.normalized == normalized);
    if !is_important {
        return Err(ApiError::BadRequest(format!(
            "'{}' is not an explained word of this phrase",
            word
        )));
    }
    let scope = context.scope();
    let existing = find_explanation(&state.db, &scope, &word).await?;

    if let Some(cached) = existing
        .as_ref()
        .and_then(|e| e.grammar_explanation.clone())
        .filter(|g| !g.trim().is_empty())
    {
        return Ok(Json(GrammarResponse {
            word,
            grammar_explanation: cached,
            cached: true,
        }));
    }

    let grammar = state
        .tutor
        .explain_grammar(&phrase, &context.native_language, &context.learning_language, &word)
        .await?;

    match existing {
        Some(explanation) => set_grammar_explanation(&state.db, explanation.id, &grammar).await?,
        // Minimal row; it also counts toward coverage of the word
        None => {
            insert_explanation(
                &state.db,
                &NewWordExplanation {
                    scope,
                    word: word.clone(),
                    translation: word.clone(),
                    explanation: String::new(),
                    examples: Vec::new(),
                    grammar_explanation: Some(grammar.clone()),
                },
            )
            .await?;
        }
    }

    info!(phrase_id = %phrase.id, word = %word, "Stored grammar explanation");

    Ok(Json(GrammarResponse {
        word,
        grammar_explanation: grammar,
        cached: false,
    }))
}

pub fn grammar_routes() -> Router<AppState> {
    Router::new().route("/api/phrases/grammar-explanation", post(grammar_explanation))
}
