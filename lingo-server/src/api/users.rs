//! Learner profiles and statistics

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use lingo_common::db::phrases::count_by_difficulty;
use lingo_common::db::progress::list_progress_for_user;
use lingo_common::db::users::{self, NewUser, UserUpdate};
use lingo_common::db::languages::find_language_by_code;
use lingo_common::{User, UserRole};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use super::{language_by_code, required};
use crate::services::stats::{compute_stats, UserStats};
use crate::{ApiError, ApiResult, AppState};

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub name: Option<String>,
    pub role: Option<String>,
    pub native_language: String,
    pub learning_language: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub native_language: Option<String>,
    pub learning_language: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DeleteUserResponse {
    pub deleted: bool,
}

/// Language code checked against the seeded languages
async fn known_code(db: &SqlitePool, code: &str) -> ApiResult<String> {
    Ok(language_by_code(db, code).await?.code)
}

async fn load_user(db: &SqlitePool, id: Uuid) -> ApiResult<User> {
    users::get_user(db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("User {}", id)))
}

/// GET /api/users
pub async fn list_users(State(state): State<AppState>) -> ApiResult<Json<Vec<User>>> {
    Ok(Json(users::list_users(&state.db).await?))
}

/// POST /api/users
pub async fn create_user(
    State(state): State<AppState>,
    Json(payload): Json<CreateUserRequest>,
) -> ApiResult<(StatusCode, Json<User>)> {
    let email = required("email", &payload.email)?;
    if !email.contains('@') {
        return Err(ApiError::BadRequest(format!("Invalid email '{}'", email)));
    }
    let role = match payload.role.as_deref() {
        Some(role) => role.parse::<UserRole>()?,
        None => UserRole::User,
    };

    let new_user = NewUser {
        email,
        name: payload.name.filter(|n| !n.trim().is_empty()),
        role,
        native_language: known_code(&state.db, &payload.native_language).await?,
        learning_language: known_code(&state.db, &payload.learning_language).await?,
    };

    let user = users::create_user(&state.db, &new_user).await?;
    info!(user_id = %user.id, "Created user");

    Ok((StatusCode::CREATED, Json(user)))
}

/// GET /api/users/:id
pub async fn get_user(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<User>> {
    Ok(Json(load_user(&state.db, id).await?))
}

/// PATCH /api/users/:id
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUserRequest>,
) -> ApiResult<Json<User>> {
    let native_language = match payload.native_language.as_deref() {
        Some(code) => Some(known_code(&state.db, code).await?),
        None => None,
    };
    let learning_language = match payload.learning_language.as_deref() {
        Some(code) => Some(known_code(&state.db, code).await?),
        None => None,
    };

    let update = UserUpdate {
        name: payload.name.filter(|n| !n.trim().is_empty()),
        native_language,
        learning_language,
    };

    users::update_user(&state.db, id, &update)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("User {}", id)))
}

/// DELETE /api/users/:id
///
/// The user's progress rows go with them.
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<DeleteUserResponse>> {
    if !users::delete_user(&state.db, id).await? {
        return Err(ApiError::NotFound(format!("User {}", id)));
    }

    info!(user_id = %id, "Deleted user");
    Ok(Json(DeleteUserResponse { deleted: true }))
}

/// GET /api/users/:id/stats
pub async fn user_stats(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<UserStats>> {
    let user = load_user(&state.db, id).await?;
    let entries = list_progress_for_user(&state.db, id).await?;

    let native = find_language_by_code(&state.db, &user.native_language).await?;
    let learning = find_language_by_code(&state.db, &user.learning_language).await?;
    let by_difficulty = match (native, learning) {
        (Some(native), Some(learning)) => count_by_difficulty(&state.db, native.id, learning.id).await?,
        _ => Vec::new(),
    };

    Ok(Json(compute_stats(&entries, by_difficulty)))
}

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/api/users", get(list_users).post(create_user))
        .route(
            "/api/users/:id",
            get(get_user).patch(update_user).delete(delete_user),
        )
        .route("/api/users/:id/stats", get(user_stats))
}
