//! Integration tests for lingo-server API endpoints
//!
//! Every test runs against a fresh in-memory database and a scripted tutor,
//! so no network access is needed.

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use lingo_common::config::CoverageConfig;
use lingo_common::db::init_memory_database;
use lingo_common::{
    CandidateExplanation, Error, ExplanationGenerator, ImportantWordFilter, Language, Phrase,
    PhraseContext, Result,
};
use lingo_server::services::tutor::{
    AnswerCheck, GeneratedPhrase, PhraseRequest, TutorService, Verification, WordInsight,
};
use lingo_server::{build_router, AppState};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::util::ServiceExt; // for `oneshot` method

/// Scripted tutor
#[derive(Default)]
struct FakeTutor {
    phrases: Vec<GeneratedPhrase>,
    /// Explain every requested word when repairing; otherwise explain nothing
    fills_missing: bool,
    /// Grading result; `None` makes grading fail
    verification: Option<Verification>,
}

#[async_trait]
impl ExplanationGenerator for FakeTutor {
    async fn generate(
        &self,
        words: &[String],
        _context: &PhraseContext,
    ) -> Result<Vec<CandidateExplanation>> {
        if !self.fills_missing {
            return Ok(Vec::new());
        }
        Ok(words
            .iter()
            .map(|w| CandidateExplanation::new(w, "traducción", "explicación"))
            .collect())
    }
}

#[async_trait]
impl TutorService for FakeTutor {
    async fn generate_phrases(&self, _request: &PhraseRequest) -> Result<Vec<GeneratedPhrase>> {
        Ok(self.phrases.clone())
    }

    async fn verify_answer(&self, _check: &AnswerCheck) -> Result<Verification> {
        self.verification
            .clone()
            .ok_or_else(|| Error::Generator("model unavailable".to_string()))
    }

    async fn explain_grammar(
        &self,
        _phrase: &Phrase,
        _native_language: &Language,
        _learning_language: &Language,
        word: &str,
    ) -> Result<String> {
        Ok(format!("Gramática de '{}'", word))
    }

    async fn explain_word(
        &self,
        _phrase: &Phrase,
        _native_language: &Language,
        _learning_language: &Language,
        word: &str,
        position: Option<usize>,
    ) -> Result<WordInsight> {
        Ok(WordInsight {
            translation: word.to_lowercase(),
            explanation: format!("'{}' en la posición {:?}", word, position),
            examples: vec!["Ich trinke Kaffee.".to_string()],
            grammar_notes: None,
        })
    }

    async fn synthesize_speech(&self, _text: &str) -> Result<Vec<u8>> {
        Ok(b"ID3fake".to_vec())
    }
}

fn generated(native: &str, learning: &str, words: &[&str]) -> GeneratedPhrase {
    GeneratedPhrase {
        native_text: native.to_string(),
        learning_text: learning.to_string(),
        context: None,
        word_explanations: words
            .iter()
            .map(|w| CandidateExplanation::new(w, "traducción", "explicación"))
            .collect(),
    }
}

/// Test helper: Create app with an in-memory database and the given tutor
async fn setup_app(tutor: FakeTutor) -> Router {
    let db = init_memory_database()
        .await
        .expect("Should create in-memory database");
    let state = AppState::new(
        db,
        Arc::new(tutor),
        ImportantWordFilter::default(),
        CoverageConfig::default(),
    );
    build_router(state)
}

fn request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Test helper: Extract JSON body from response
async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    (status, extract_json(response.into_body()).await)
}

async fn create_phrase(app: &Router, learning_text: &str) -> String {
    let (status, body) = send(
        app,
        json_request(
            "POST",
            "/api/phrases",
            json!({
                "native_language_code": "es",
                "learning_language_code": "de",
                "native_text": "Bebo café",
                "learning_text": learning_text,
                "cefr_level": "A1"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    body["id"].as_str().unwrap().to_string()
}

async fn create_user(app: &Router, email: &str) -> (StatusCode, Value) {
    send(
        app,
        json_request(
            "POST",
            "/api/users",
            json!({
                "email": email,
                "name": "Ana",
                "native_language": "es",
                "learning_language": "de"
            }),
        ),
    )
    .await
}

// =============================================================================
// Health and languages
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let app = setup_app(FakeTutor::default()).await;
    let (status, body) = send(&app, request("GET", "/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "lingo-server");
}

#[tokio::test]
async fn test_languages_seeded() {
    let app = setup_app(FakeTutor::default()).await;
    let (status, body) = send(&app, request("GET", "/api/languages")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 6);
}

// =============================================================================
// Phrases
// =============================================================================

#[tokio::test]
async fn test_phrase_crud() {
    let app = setup_app(FakeTutor::default()).await;
    let id = create_phrase(&app, "Ich trinke Kaffee").await;

    let (status, body) = send(&app, request("GET", &format!("/api/phrases/{}", id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["difficulty"], "BEGINNER");
    assert_eq!(body["cefr_level"], "A1");

    let (_, listed) = send(&app, request("GET", "/api/phrases?learning_language=de&difficulty=beginner")).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let (_, none) = send(&app, request("GET", "/api/phrases?learning_language=fr")).await;
    assert!(none.as_array().unwrap().is_empty());

    let (status, random) = send(&app, request("GET", "/api/phrases/random?native_language=es")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(random["id"], id.as_str());

    let (status, _) = send(&app, request("DELETE", &format!("/api/phrases/{}", id))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, request("GET", &format!("/api/phrases/{}", id))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");

    let (status, _) = send(&app, request("GET", "/api/phrases/random")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_phrase_revalidates_new_learning_text() {
    let app = setup_app(FakeTutor {
        fills_missing: true,
        ..Default::default()
    })
    .await;
    let id = create_phrase(&app, "Ich trinke Kaffee").await;
    let uri = format!("/api/phrases/{}", id);

    let (status, body) = send(&app, json_request("PUT", &uri, json!({"category": "food"}))).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["category"], "food");
    assert_eq!(body["learning_text"], "Ich trinke Kaffee");
    assert!(body.get("validation").is_none());

    let (status, body) = send(
        &app,
        json_request(
            "PUT",
            &uri,
            json!({"learning_text": "Ich trinke Tee", "cefr_level": "B2"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["learning_text"], "Ich trinke Tee");
    assert_eq!(body["difficulty"], "INTERMEDIATE");
    assert_eq!(body["category"], "food");
    assert_eq!(body["validation"]["is_valid"], true);
    assert_eq!(body["validation"]["passes"], 2);

    let (_, explanations) = send(&app, request("GET", &format!("{}/word-explanations", uri))).await;
    assert_eq!(explanations.as_array().unwrap().len(), 3);

    let (status, _) = send(&app, json_request("PUT", &uri, json!({"learning_text": "  "}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        json_request("PUT", &format!("/api/phrases/{}", uuid::Uuid::new_v4()), json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_create_phrase_validation() {
    let app = setup_app(FakeTutor::default()).await;

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/api/phrases",
            json!({
                "native_language_code": "es",
                "learning_language_code": "de",
                "native_text": "Hola",
                "learning_text": "Hallo",
                "cefr_level": "D4"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");

    let (status, _) = send(
        &app,
        json_request(
            "POST",
            "/api/phrases",
            json!({
                "native_language_code": "es",
                "learning_language_code": "xx",
                "native_text": "Hola",
                "learning_text": "Hallo",
                "cefr_level": "A1"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// =============================================================================
// Generation with coverage validation
// =============================================================================

#[tokio::test]
async fn test_generate_converges_and_reports() {
    let tutor = FakeTutor {
        phrases: vec![
            // "kaffee" missing and "foo" extra until repaired
            generated("Bebo café", "Ich trinke Kaffee", &["ich", "trinke", "foo"]),
            generated("Gracias", "Danke", &["danke"]),
            generated(" bebo CAFÉ", "Ich trinke Kaffee!", &[]),
        ],
        fills_missing: true,
        ..Default::default()
    };
    let app = setup_app(tutor).await;

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/api/phrases/generate",
            json!({
                "native_language_code": "es",
                "learning_language_code": "de",
                "cefr_level": "B1",
                "category": "food",
                "quantity": 3
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["created"], 2);
    assert_eq!(body["duplicates"], 1);
    assert_eq!(body["phrases"][0]["difficulty"], "INTERMEDIATE");

    let first = &body["validation"][0];
    assert_eq!(first["is_valid"], true);
    assert_eq!(first["passes"], 2);
    assert_eq!(first["coverage_percent"], 100.0);

    let second = &body["validation"][1];
    assert_eq!(second["is_valid"], true);
    assert_eq!(second["passes"], 1);

    assert_eq!(body["summary"]["total"], 2);
    assert_eq!(body["summary"]["valid"], 2);
    assert_eq!(body["summary"]["average_coverage"], 100.0);

    let phrase_id = body["phrases"][0]["id"].as_str().unwrap();
    let (_, explanations) = send(
        &app,
        request("GET", &format!("/api/phrases/{}/word-explanations", phrase_id)),
    )
    .await;
    let mut words: Vec<&str> = explanations
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["word"].as_str().unwrap())
        .collect();
    words.sort();
    assert_eq!(words, vec!["ich", "kaffee", "trinke"]);
}

#[tokio::test]
async fn test_generate_keeps_phrase_when_coverage_incomplete() {
    let tutor = FakeTutor {
        phrases: vec![generated("Buenos días", "Guten Morgen", &["guten"])],
        fills_missing: false,
        ..Default::default()
    };
    let app = setup_app(tutor).await;

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/api/phrases/generate",
            json!({
                "native_language_code": "es",
                "learning_language_code": "de",
                "cefr_level": "A1",
                "quantity": 1
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    let validation = &body["validation"][0];
    assert_eq!(validation["is_valid"], false);
    assert_eq!(validation["passes"], 3);
    assert_eq!(validation["missing_count"], 1);
    assert_eq!(validation["coverage_percent"], 50.0);
    assert_eq!(body["summary"]["invalid"], 1);

    let phrase_id = body["phrases"][0]["id"].as_str().unwrap();
    let (status, _) = send(&app, request("GET", &format!("/api/phrases/{}", phrase_id))).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_generate_rejects_bad_quantity_and_all_duplicates() {
    let app = setup_app(FakeTutor {
        phrases: vec![generated("Bebo café", "Ich trinke Kaffee", &[])],
        ..Default::default()
    })
    .await;

    let body = |quantity: usize| {
        json!({
            "native_language_code": "es",
            "learning_language_code": "de",
            "cefr_level": "A1",
            "quantity": quantity
        })
    };

    let (status, _) = send(&app, json_request("POST", "/api/phrases/generate", body(0))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = send(&app, json_request("POST", "/api/phrases/generate", body(51))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    create_phrase(&app, "Ich trinke Kaffee").await;
    let (status, _) = send(&app, json_request("POST", "/api/phrases/generate", body(1))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// =============================================================================
// Validation and repair of stored phrases
// =============================================================================

#[tokio::test]
async fn test_validation_then_repair() {
    let app = setup_app(FakeTutor {
        fills_missing: true,
        ..Default::default()
    })
    .await;
    let id = create_phrase(&app, "Wie ist der Kaffee?").await;

    let (status, report) = send(
        &app,
        request("GET", &format!("/api/phrases/{}/word-explanations/validation", id)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["total_important_words"], 4);
    assert_eq!(report["coverage_percent"], 0.0);
    assert_eq!(report["is_valid"], false);
    assert_eq!(report["missing_words"][3], "Kaffee?");

    let (status, repaired) = send(
        &app,
        request("POST", &format!("/api/phrases/{}/word-explanations/repair", id)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(repaired["report"]["is_valid"], true);
    assert_eq!(repaired["passes"], 2);
    assert_eq!(repaired["added"], 4);
    assert_eq!(repaired["removed"], 0);
}

// =============================================================================
// Grammar, audio, verification, users
// =============================================================================

#[tokio::test]
async fn test_grammar_explanation_is_cached() {
    let app = setup_app(FakeTutor::default()).await;
    let id = create_phrase(&app, "Ich trinke Kaffee").await;
    let payload = json!({"phrase_id": id, "word": "Kaffee"});

    let (status, first) = send(&app, json_request("POST", "/api/phrases/grammar-explanation", payload.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["cached"], false);
    assert_eq!(first["grammar_explanation"], "Gramática de 'Kaffee'");

    let (_, second) = send(&app, json_request("POST", "/api/phrases/grammar-explanation", payload)).await;
    assert_eq!(second["cached"], true);
}

#[tokio::test]
async fn test_grammar_rejects_word_outside_sentence() {
    let app = setup_app(FakeTutor::default()).await;
    let id = create_phrase(&app, "Ich trinke Kaffee").await;

    let (status, _) = send(
        &app,
        json_request("POST", "/api/phrases/grammar-explanation", json!({"phrase_id": id, "word": "Zebra"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, report) = send(
        &app,
        request("GET", &format!("/api/phrases/{}/word-explanations/validation", id)),
    )
    .await;
    assert_eq!(report["explained_count"], 0);
}

#[tokio::test]
async fn test_word_explanation_on_demand() {
    let app = setup_app(FakeTutor::default()).await;
    let id = create_phrase(&app, "Ich trinke Kaffee").await;

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/api/phrases/word-explanation",
            json!({"phrase_id": id, "word": " Café ", "word_index": 1}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["word"], "Café");
    assert_eq!(body["translation"], "café");
    assert_eq!(body["explanation"], "'Café' en la posición Some(1)");
    assert_eq!(body["examples"][0], "Ich trinke Kaffee.");
    assert!(body["grammar_notes"].is_null());

    // Nothing is stored for the phrase
    let (_, explanations) = send(&app, request("GET", &format!("/api/phrases/{}/word-explanations", id))).await;
    assert!(explanations.as_array().unwrap().is_empty());

    let (status, _) = send(
        &app,
        json_request(
            "POST",
            "/api/phrases/word-explanation",
            json!({"phrase_id": uuid::Uuid::new_v4(), "word": "Kaffee"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_audio() {
    let app = setup_app(FakeTutor::default()).await;
    let id = create_phrase(&app, "Ich trinke Kaffee").await;

    let (status, body) = send(&app, json_request("POST", "/api/phrases/audio", json!({"phrase_id": id}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["format"], "mp3");
    assert_eq!(body["text"], "Ich trinke Kaffee");
    assert_eq!(body["audio"], "SUQzZmFrZQ==");

    let (status, _) = send(&app, json_request("POST", "/api/phrases/audio", json!({"text": "  "}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_verify_records_progress_and_stats() {
    let app = setup_app(FakeTutor {
        verification: Some(Verification {
            is_correct: true,
            feedback: "Perfecto".to_string(),
            accuracy_score: 130,
            words_learned: vec!["kaffee".to_string()],
            words_forgotten: Vec::new(),
        }),
        ..Default::default()
    })
    .await;
    let phrase_id = create_phrase(&app, "Ich trinke Kaffee").await;
    let (_, user) = create_user(&app, "ana@example.com").await;
    let user_id = user["id"].as_str().unwrap();

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/api/phrases/verify",
            json!({"user_id": user_id, "phrase_id": phrase_id, "user_answer": "Ich trinke Kaffee"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["is_correct"], true);
    assert_eq!(body["accuracy_score"], 100);
    assert!(body["progress_id"].is_string());

    let (status, stats) = send(&app, request("GET", &format!("/api/users/{}/stats", user_id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["total_attempts"], 1);
    assert_eq!(stats["accuracy"], 100.0);
    assert_eq!(stats["learned_phrases_count"], 1);
    assert_eq!(stats["words_learned"][0], "kaffee");
    assert_eq!(stats["recent_progress"][0]["phrase"], "Bebo café");
    assert_eq!(stats["phrases_by_difficulty"][0]["difficulty"], "BEGINNER");
}

#[tokio::test]
async fn test_verify_falls_back_when_grading_fails() {
    let app = setup_app(FakeTutor::default()).await;
    let phrase_id = create_phrase(&app, "Ich trinke Kaffee").await;
    let (_, user) = create_user(&app, "ben@example.com").await;

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/api/phrases/verify",
            json!({"user_id": user["id"], "phrase_id": phrase_id, "user_answer": "Kaffee"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_correct"], false);
    assert_eq!(body["accuracy_score"], 0);
}

#[tokio::test]
async fn test_users() {
    let app = setup_app(FakeTutor::default()).await;

    let (status, user) = create_user(&app, "Cleo@Example.com").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(user["email"], "cleo@example.com");
    assert_eq!(user["role"], "USER");

    let (status, body) = create_user(&app, "cleo@example.com").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CONFLICT");

    let id = user["id"].as_str().unwrap();
    let (status, updated) = send(
        &app,
        json_request("PATCH", &format!("/api/users/{}", id), json!({"learning_language": "IT"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["learning_language"], "it");

    let (status, _) = send(
        &app,
        json_request("PATCH", &format!("/api/users/{}", id), json!({"learning_language": "xx"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, users) = send(&app, request("GET", "/api/users")).await;
    assert_eq!(users.as_array().unwrap().len(), 1);

    let (status, body) = send(&app, request("DELETE", &format!("/api/users/{}", id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted"], true);

    let (status, _) = send(&app, request("DELETE", &format!("/api/users/{}", id))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, request("GET", &format!("/api/users/{}/stats", id))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
