//! Text-to-speech for a phrase or free text

use axum::{extract::State, routing::post, Json, Router};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use super::{language_by_code, load_phrase_context};
use crate::{ApiError, ApiResult, AppState};

#[derive(Debug, Deserialize)]
pub struct AudioRequest {
    /// Speak this phrase's learning text (takes precedence over `text`)
    pub phrase_id: Option<Uuid>,
    pub text: Option<String>,
    pub language_code: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AudioResponse {
    /// Base64-encoded audio
    pub audio: String,
    pub format: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language_code: Option<String>,
}

/// POST /api/phrases/audio
pub async fn phrase_audio(
    State(state): State<AppState>,
    Json(payload): Json<AudioRequest>,
) -> ApiResult<Json<AudioResponse>> {
    let (text, language_code) = match payload.phrase_id {
        Some(id) => {
            let (phrase, context) = load_phrase_context(&state.db, id).await?;
            (phrase.learning_text, Some(context.learning_language.code))
        }
        None => {
            let language_code = match payload.language_code.as_deref().map(str::trim) {
                Some(code) if !code.is_empty() => Some(language_by_code(&state.db, code).await?.code),
                _ => None,
            };
            (payload.text.unwrap_or_default().trim().to_string(), language_code)
        }
    };

    if text.is_empty() {
        return Err(ApiError::BadRequest("No text to convert to audio".to_string()));
    }

    let audio = state.tutor.synthesize_speech(&text).await?;
    debug!(bytes = audio.len(), "Audio generated");

    Ok(Json(AudioResponse {
        audio: STANDARD.encode(audio),
        format: "mp3".to_string(),
        text,
        language_code,
    }))
}

pub fn audio_routes() -> Router<AppState> {
    Router::new().route("/api/phrases/audio", post(phrase_audio))
}
