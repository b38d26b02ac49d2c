//! Phrase CRUD and random practice phrase

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use lingo_common::db::phrases::{self, PhraseFilter, PhraseUpdate};
use lingo_common::db::SqliteExplanationStore;
use lingo_common::{converge, CefrLevel, Difficulty, NewPhrase, Phrase};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::{error, info};
use uuid::Uuid;

use super::{language_by_code, load_phrase, load_phrase_context, required};
use crate::services::phrase_generation::PhraseValidation;
use crate::{ApiError, ApiResult, AppState};

/// Listing filters by language code and difficulty
#[derive(Debug, Default, Deserialize)]
pub struct PhraseQuery {
    pub native_language: Option<String>,
    pub learning_language: Option<String>,
    pub difficulty: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreatePhraseRequest {
    pub native_language_code: String,
    pub learning_language_code: String,
    pub native_text: String,
    pub learning_text: String,
    pub cefr_level: String,
    /// Defaults to the CEFR level's bucket
    pub difficulty: Option<String>,
    pub context: Option<String>,
    pub category: Option<String>,
}

/// Partial update; absent fields keep their value
#[derive(Debug, Default, Deserialize)]
pub struct UpdatePhraseRequest {
    pub native_text: Option<String>,
    pub learning_text: Option<String>,
    pub context: Option<String>,
    pub cefr_level: Option<String>,
    /// Defaults to the new CEFR level's bucket when only the level changes
    pub difficulty: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UpdatePhraseResponse {
    #[serde(flatten)]
    pub phrase: Phrase,
    /// Present when the learning text changed and explanations were
    /// re-validated
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation: Option<PhraseValidation>,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub deleted: bool,
}

fn non_blank(value: Option<&String>) -> Option<&str> {
    value.map(|v| v.trim()).filter(|v| !v.is_empty())
}

async fn resolve_filter(db: &SqlitePool, query: &PhraseQuery) -> ApiResult<PhraseFilter> {
    let mut filter = PhraseFilter::default();

    if let Some(code) = non_blank(query.native_language.as_ref()) {
        filter.native_language_id = Some(language_by_code(db, code).await?.id);
    }
    if let Some(code) = non_blank(query.learning_language.as_ref()) {
        filter.learning_language_id = Some(language_by_code(db, code).await?.id);
    }
    if let Some(difficulty) = non_blank(query.difficulty.as_ref()) {
        filter.difficulty = Some(difficulty.parse::<Difficulty>()?);
    }

    Ok(filter)
}

/// GET /api/phrases
pub async fn list_phrases(
    State(state): State<AppState>,
    Query(query): Query<PhraseQuery>,
) -> ApiResult<Json<Vec<Phrase>>> {
    let filter = resolve_filter(&state.db, &query).await?;
    Ok(Json(phrases::list_phrases(&state.db, &filter).await?))
}

/// GET /api/phrases/random
pub async fn random_phrase(
    State(state): State<AppState>,
    Query(query): Query<PhraseQuery>,
) -> ApiResult<Json<Phrase>> {
    let filter = resolve_filter(&state.db, &query).await?;
    phrases::random_phrase(&state.db, &filter)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("No phrase matches the filters".to_string()))
}

/// POST /api/phrases
pub async fn create_phrase(
    State(state): State<AppState>,
    Json(payload): Json<CreatePhraseRequest>,
) -> ApiResult<(StatusCode, Json<Phrase>)> {
    let native_text = required("native_text", &payload.native_text)?;
    let learning_text = required("learning_text", &payload.learning_text)?;
    let cefr_level: CefrLevel = payload.cefr_level.parse()?;
    let difficulty = match non_blank(payload.difficulty.as_ref()) {
        Some(d) => d.parse::<Difficulty>()?,
        None => cefr_level.difficulty(),
    };

    let native = language_by_code(&state.db, &payload.native_language_code).await?;
    let learning = language_by_code(&state.db, &payload.learning_language_code).await?;
    if native.id == learning.id {
        return Err(ApiError::BadRequest(
            "Native and learning language must differ".to_string(),
        ));
    }

    let phrase = phrases::insert_phrase(
        &state.db,
        &NewPhrase {
            native_language_id: native.id,
            learning_language_id: learning.id,
            native_text,
            learning_text,
            context: non_blank(payload.context.as_ref()).map(str::to_string),
            difficulty,
            cefr_level,
            category: non_blank(payload.category.as_ref()).map(str::to_string),
        },
    )
    .await?;

    info!(phrase_id = %phrase.id, "Created phrase");
    Ok((StatusCode::CREATED, Json(phrase)))
}

/// GET /api/phrases/:id
pub async fn get_phrase(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<Phrase>> {
    Ok(Json(load_phrase(&state.db, id).await?))
}

/// PUT /api/phrases/:id
///
/// A new learning text invalidates the stored explanation set, so the
/// convergence loop runs again on it.
pub async fn update_phrase(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdatePhraseRequest>,
) -> ApiResult<Json<UpdatePhraseResponse>> {
    let before = load_phrase(&state.db, id).await?;

    let native_text = match payload.native_text.as_deref() {
        Some(text) => Some(required("native_text", text)?),
        None => None,
    };
    let learning_text = match payload.learning_text.as_deref() {
        Some(text) => Some(required("learning_text", text)?),
        None => None,
    };
    let cefr_level: Option<CefrLevel> = non_blank(payload.cefr_level.as_ref())
        .map(str::parse::<CefrLevel>)
        .transpose()?;
    let difficulty = match non_blank(payload.difficulty.as_ref()) {
        Some(d) => Some(d.parse::<Difficulty>()?),
        None => cefr_level.map(|c| c.difficulty()),
    };

    let update = PhraseUpdate {
        native_text,
        learning_text,
        context: non_blank(payload.context.as_ref()).map(str::to_string),
        difficulty,
        cefr_level,
        category: non_blank(payload.category.as_ref()).map(str::to_string),
    };

    let phrase = phrases::update_phrase(&state.db, id, &update)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Phrase {}", id)))?;
    info!(phrase_id = %id, "Updated phrase");

    if phrase.learning_text == before.learning_text {
        return Ok(Json(UpdatePhraseResponse {
            phrase,
            validation: None,
        }));
    }

    let (_, context) = load_phrase_context(&state.db, id).await?;
    let store = SqliteExplanationStore::new(state.db.clone());
    let validation = match converge(
        &context,
        state.tutor.as_ref(),
        &store,
        &state.filter,
        state.coverage.max_validation_passes,
    )
    .await
    {
        Ok(outcome) => Some(PhraseValidation::from_outcome(id, &outcome)),
        Err(e) => {
            error!(phrase_id = %id, error = %e, "Explanation validation failed after update");
            None
        }
    };

    Ok(Json(UpdatePhraseResponse { phrase, validation }))
}

/// DELETE /api/phrases/:id
///
/// Explanations and progress rows go with the phrase.
pub async fn delete_phrase(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<DeleteResponse>> {
    if !phrases::delete_phrase(&state.db, id).await? {
        return Err(ApiError::NotFound(format!("Phrase {}", id)));
    }

    info!(phrase_id = %id, "Deleted phrase");
    Ok(Json(DeleteResponse { deleted: true }))
}

pub fn phrase_routes() -> Router<AppState> {
    Router::new()
        .route("/api/phrases", get(list_phrases).post(create_phrase))
        .route("/api/phrases/random", get(random_phrase))
        .route(
            "/api/phrases/:id",
            get(get_phrase).put(update_phrase).delete(delete_phrase),
        )
}
