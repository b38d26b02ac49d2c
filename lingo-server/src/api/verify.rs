//! Answer verification; every attempt is recorded as progress

use axum::{extract::State, routing::post, Json, Router};
use lingo_common::db::progress::{record_progress, NewProgress};
use lingo_common::db::users::get_user;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use super::{load_phrase, required};
use crate::services::tutor::{AnswerCheck, Verification};
use crate::{ApiError, ApiResult, AppState};

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub user_id: Uuid,
    pub phrase_id: Uuid,
    pub user_answer: String,
}

#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    #[serde(flatten)]
    pub verification: Verification,
    pub progress_id: Uuid,
}

/// POST /api/phrases/verify
///
/// A grading failure is not an error: the fallback result (score 0) is
/// recorded and returned.
pub async fn verify_answer(
    State(state): State<AppState>,
    Json(payload): Json<VerifyRequest>,
) -> ApiResult<Json<VerifyResponse>> {
    let user_answer = required("user_answer", &payload.user_answer)?;

    if get_user(&state.db, payload.user_id).await?.is_none() {
        return Err(ApiError::NotFound(format!("User {}", payload.user_id)));
    }
    let phrase = load_phrase(&state.db, payload.phrase_id).await?;

    let check = AnswerCheck {
        prompt_text: phrase.native_text.clone(),
        expected_answer: phrase.learning_text.clone(),
        user_answer: user_answer.clone(),
        difficulty: phrase.difficulty,
    };

    let verification = match state.tutor.verify_answer(&check).await {
        Ok(v) => v.clamped(),
        Err(e) => {
            warn!(phrase_id = %phrase.id, error = %e, "Answer verification failed; recording fallback");
            Verification::fallback()
        }
    };

    let progress = record_progress(
        &state.db,
        &NewProgress {
            user_id: payload.user_id,
            phrase_id: phrase.id,
            user_answer,
            ai_feedback: verification.feedback.clone(),
            is_correct: verification.is_correct,
            accuracy_score: verification.accuracy_score,
            words_learned: verification.words_learned.clone(),
            words_forgotten: verification.words_forgotten.clone(),
        },
    )
    .await?;

    info!(
        user_id = %payload.user_id,
        phrase_id = %phrase.id,
        correct = verification.is_correct,
        score = verification.accuracy_score,
        "Answer verified"
    );

    Ok(Json(VerifyResponse {
        verification,
        progress_id: progress.id,
    }))
}

pub fn verify_routes() -> Router<AppState> {
    Router::new().route("/api/phrases/verify", post(verify_answer))
}
