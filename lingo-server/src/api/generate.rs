//! AI phrase generation endpoint

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use lingo_common::CefrLevel;
use serde::Deserialize;

use super::language_by_code;
use crate::services::phrase_generation::{
    generate_batch, GenerationLimits, GenerationReport, GenerationRequest, MAX_QUANTITY,
};
use crate::{ApiError, ApiResult, AppState};

#[derive(Debug, Deserialize)]
pub struct GeneratePhrasesRequest {
    pub native_language_code: String,
    pub learning_language_code: String,
    pub cefr_level: String,
    #[serde(default)]
    pub category: Option<String>,
    pub quantity: usize,
}

/// POST /api/phrases/generate
///
/// Responds 201 with the stored phrases, per-phrase coverage and the batch
/// summary. Incomplete coverage is reported, never rejected.
pub async fn generate_phrases(
    State(state): State<AppState>,
    Json(payload): Json<GeneratePhrasesRequest>,
) -> ApiResult<(StatusCode, Json<GenerationReport>)> {
    let cefr_level: CefrLevel = payload.cefr_level.parse()?;
    if !(1..=MAX_QUANTITY).contains(&payload.quantity) {
        return Err(ApiError::BadRequest(format!(
            "quantity must be between 1 and {}",
            MAX_QUANTITY
        )));
    }

    let native_language = language_by_code(&state.db, &payload.native_language_code).await?;
    let learning_language = language_by_code(&state.db, &payload.learning_language_code).await?;

    let request = GenerationRequest {
        native_language,
        learning_language,
        cefr_level,
        category: payload
            .category
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty()),
        quantity: payload.quantity,
    };
    let limits = GenerationLimits {
        max_validation_passes: state.coverage.max_validation_passes,
        concurrency: state.coverage.generation_concurrency,
    };

    let report = generate_batch(&state.db, state.tutor.as_ref(), &state.filter, limits, request).await?;

    Ok((StatusCode::CREATED, Json(report)))
}

pub fn generate_routes() -> Router<AppState> {
    Router::new().route("/api/phrases/generate", post(generate_phrases))
}
