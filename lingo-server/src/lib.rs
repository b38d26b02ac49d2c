//! lingo-server library interface
//!
//! Exposes the application state and router for the binary and for
//! integration tests.

pub mod api;
pub mod error;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use lingo_common::config::CoverageConfig;
use lingo_common::ImportantWordFilter;
use services::TutorService;
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Language model behind generation, grading, grammar and speech
    pub tutor: Arc<dyn TutorService>,
    /// Important-word rules, fixed at startup
    pub filter: Arc<ImportantWordFilter>,
    pub coverage: CoverageConfig,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        tutor: Arc<dyn TutorService>,
        filter: ImportantWordFilter,
        coverage: CoverageConfig,
    ) -> Self {
        Self {
            db,
            tutor,
            filter: Arc::new(filter),
            coverage,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::health_routes())
        .merge(api::language_routes())
        .merge(api::phrase_routes())
        .merge(api::generate_routes())
        .merge(api::word_explanation_routes())
        .merge(api::word_insight_routes())
        .merge(api::grammar_routes())
        .merge(api::audio_routes())
        .merge(api::verify_routes())
        .merge(api::user_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
