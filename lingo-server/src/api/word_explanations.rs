//! Word explanations of a stored phrase: list, validate, repair

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use lingo_common::convergence::validate_stored;
use lingo_common::db::explanations::list_explanations;
use lingo_common::db::SqliteExplanationStore;
use lingo_common::{converge, ValidationReport, WordExplanation};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use super::load_phrase_context;
use crate::{ApiResult, AppState};

#[derive(Debug, Serialize)]
pub struct ValidationResponse {
    pub phrase_id: Uuid,
    #[serde(flatten)]
    pub report: ValidationReport,
}

#[derive(Debug, Serialize)]
pub struct RepairResponse {
    pub phrase_id: Uuid,
    pub report: ValidationReport,
    pub passes: usize,
    pub added: u64,
    pub removed: u64,
}

/// GET /api/phrases/:id/word-explanations
pub async fn get_word_explanations(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<WordExplanation>>> {
    let (_, context) = load_phrase_context(&state.db, id).await?;
    Ok(Json(list_explanations(&state.db, &context.scope()).await?))
}

/// GET /api/phrases/:id/word-explanations/validation
pub async fn validate_word_explanations(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ValidationResponse>> {
    let (_, context) = load_phrase_context(&state.db, id).await?;
    let store = SqliteExplanationStore::new(state.db.clone());
    let report = validate_stored(&context, &store, &state.filter).await?;

    Ok(Json(ValidationResponse {
        phrase_id: id,
        report,
    }))
}

/// POST /api/phrases/:id/word-explanations/repair
///
/// Runs the bounded validate/repair loop on a stored phrase.
pub async fn repair_word_explanations(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<RepairResponse>> {
    let (_, context) = load_phrase_context(&state.db, id).await?;
    let store = SqliteExplanationStore::new(state.db.clone());

    let outcome = converge(
        &context,
        state.tutor.as_ref(),
        &store,
        &state.filter,
        state.coverage.max_validation_passes,
    )
    .await?;

    info!(
        phrase_id = %id,
        passes = outcome.passes,
        valid = outcome.report.is_valid,
        "Word explanation repair requested"
    );

    Ok(Json(RepairResponse {
        phrase_id: id,
        report: outcome.report,
        passes: outcome.passes,
        added: outcome.added,
        removed: outcome.removed,
    }))
}

pub fn word_explanation_routes() -> Router<AppState> {
    Router::new()
        .route("/api/phrases/:id/word-explanations", get(get_word_explanations))
        .route(
            "/api/phrases/:id/word-explanations/validation",
            get(validate_word_explanations),
        )
        .route(
            "/api/phrases/:id/word-explanations/repair",
            post(repair_word_explanations),
        )
}
