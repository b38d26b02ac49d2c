//! Language listing

use axum::{extract::State, routing::get, Json, Router};
use lingo_common::db::languages::list_languages;
use lingo_common::Language;

use crate::{ApiResult, AppState};

/// GET /api/languages
pub async fn get_languages(State(state): State<AppState>) -> ApiResult<Json<Vec<Language>>> {
    Ok(Json(list_languages(&state.db).await?))
}

pub fn language_routes() -> Router<AppState> {
    Router::new().route("/api/languages", get(get_languages))
}
