//! Database tests: schema creation, language seeding, explanation uniqueness
//! and cascade behavior

use lingo_common::db::explanations::{
    delete_explanations, find_explanation, insert_explanation, list_explanations,
    set_grammar_explanation,
};
use lingo_common::db::init::{init_database, SEED_LANGUAGES};
use lingo_common::db::languages::{find_language_by_code, list_languages};
use lingo_common::db::phrases::{
    delete_phrase, get_phrase, insert_phrase, list_phrases, update_phrase, PhraseFilter, PhraseUpdate,
};
use lingo_common::db::progress::{list_progress_for_user, record_progress, NewProgress};
use lingo_common::db::users::{
    create_user, delete_user, get_user, update_user, NewUser, UserUpdate,
};
use lingo_common::db::init_memory_database;
use lingo_common::{
    CefrLevel, Difficulty, Error, ExplanationScope, NewPhrase, NewWordExplanation, Phrase, UserRole,
};
use sqlx::SqlitePool;

async fn seeded_phrase(pool: &SqlitePool) -> Phrase {
    let es = find_language_by_code(pool, "es").await.unwrap().unwrap();
    let de = find_language_by_code(pool, "de").await.unwrap().unwrap();

    insert_phrase(
        pool,
        &NewPhrase {
            native_language_id: es.id,
            learning_language_id: de.id,
            native_text: "¿Cómo está el café?".to_string(),
            learning_text: "Wie ist der Kaffee?".to_string(),
            context: Some("En una cafetería".to_string()),
            difficulty: Difficulty::Beginner,
            cefr_level: CefrLevel::A1,
            category: Some("food".to_string()),
        },
    )
    .await
    .unwrap()
}

fn scope_of(phrase: &Phrase) -> ExplanationScope {
    ExplanationScope {
        phrase_id: phrase.id,
        native_language_id: phrase.native_language_id,
        learning_language_id: phrase.learning_language_id,
    }
}

fn explanation(scope: ExplanationScope, word: &str) -> NewWordExplanation {
    NewWordExplanation {
        scope,
        word: word.to_string(),
        translation: "café".to_string(),
        explanation: "Sustantivo masculino".to_string(),
        examples: Vec::new(),
        grammar_explanation: None,
    }
}

#[tokio::test]
async fn test_database_file_created_and_reopened() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("nested").join("lingo.db");

    let pool = init_database(&db_path).await;
    assert!(pool.is_ok(), "Database initialization failed: {:?}", pool.err());
    assert!(db_path.exists(), "Database file was not created");
    drop(pool);

    let reopened = init_database(&db_path).await.unwrap();
    let languages = list_languages(&reopened).await.unwrap();
    assert_eq!(languages.len(), SEED_LANGUAGES.len(), "Seeding must not duplicate languages");
}

#[tokio::test]
async fn test_languages_seeded() {
    let pool = init_memory_database().await.unwrap();

    let languages = list_languages(&pool).await.unwrap();
    let codes: Vec<&str> = languages.iter().map(|l| l.code.as_str()).collect();
    assert_eq!(codes, vec!["de", "en", "es", "fr", "it", "pt"]);

    let german = find_language_by_code(&pool, " DE ").await.unwrap().unwrap();
    assert_eq!(german.name, "Deutsch");
    assert!(find_language_by_code(&pool, "xx").await.unwrap().is_none());
}

#[tokio::test]
async fn test_duplicate_explanation_is_conflict() {
    let pool = init_memory_database().await.unwrap();
    let phrase = seeded_phrase(&pool).await;
    let scope = scope_of(&phrase);

    insert_explanation(&pool, &explanation(scope, "Kaffee")).await.unwrap();
    let second = insert_explanation(&pool, &explanation(scope, "kaffee?")).await;

    assert!(matches!(second, Err(Error::Conflict(_))), "got {:?}", second);
    let stored = list_explanations(&pool, &scope).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].word, "kaffee");
}

#[tokio::test]
async fn test_empty_word_rejected() {
    let pool = init_memory_database().await.unwrap();
    let phrase = seeded_phrase(&pool).await;

    let result = insert_explanation(&pool, &explanation(scope_of(&phrase), "?!")).await;
    assert!(matches!(result, Err(Error::InvalidInput(_))));
}

#[tokio::test]
async fn test_delete_explanations_is_idempotent() {
    let pool = init_memory_database().await.unwrap();
    let phrase = seeded_phrase(&pool).await;
    let scope = scope_of(&phrase);

    insert_explanation(&pool, &explanation(scope, "foo")).await.unwrap();

    assert_eq!(delete_explanations(&pool, &scope, "Foo").await.unwrap(), 1);
    assert_eq!(delete_explanations(&pool, &scope, "foo").await.unwrap(), 0);
    assert!(find_explanation(&pool, &scope, "foo").await.unwrap().is_none());
}

#[tokio::test]
async fn test_grammar_explanation_cached() {
    let pool = init_memory_database().await.unwrap();
    let phrase = seeded_phrase(&pool).await;
    let scope = scope_of(&phrase);

    let stored = insert_explanation(&pool, &explanation(scope, "der")).await.unwrap();
    set_grammar_explanation(&pool, stored.id, "Artículo definido masculino").await.unwrap();

    let found = find_explanation(&pool, &scope, "DER").await.unwrap().unwrap();
    assert_eq!(found.grammar_explanation.as_deref(), Some("Artículo definido masculino"));

    let missing = set_grammar_explanation(&pool, uuid::Uuid::new_v4(), "x").await;
    assert!(matches!(missing, Err(Error::NotFound(_))));
}

#[tokio::test]
async fn test_deleting_phrase_cascades() {
    let pool = init_memory_database().await.unwrap();
    let phrase = seeded_phrase(&pool).await;
    let scope = scope_of(&phrase);

    insert_explanation(&pool, &explanation(scope, "kaffee")).await.unwrap();

    assert!(delete_phrase(&pool, phrase.id).await.unwrap());
    assert!(!delete_phrase(&pool, phrase.id).await.unwrap());
    assert!(get_phrase(&pool, phrase.id).await.unwrap().is_none());
    assert!(list_explanations(&pool, &scope).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_phrase_filters() {
    let pool = init_memory_database().await.unwrap();
    let phrase = seeded_phrase(&pool).await;

    let all = list_phrases(&pool, &PhraseFilter::default()).await.unwrap();
    assert_eq!(all.len(), 1);

    let beginner = PhraseFilter {
        difficulty: Some(Difficulty::Beginner),
        ..Default::default()
    };
    assert_eq!(list_phrases(&pool, &beginner).await.unwrap()[0].id, phrase.id);

    let advanced = PhraseFilter {
        learning_language_id: Some(phrase.learning_language_id),
        difficulty: Some(Difficulty::Advanced),
        ..Default::default()
    };
    assert!(list_phrases(&pool, &advanced).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_users_and_progress() {
    let pool = init_memory_database().await.unwrap();
    let phrase = seeded_phrase(&pool).await;

    let new_user = NewUser {
        email: "Ana@Example.com".to_string(),
        name: Some("Ana".to_string()),
        role: UserRole::User,
        native_language: "es".to_string(),
        learning_language: "de".to_string(),
    };
    let user = create_user(&pool, &new_user).await.unwrap();
    assert_eq!(user.email, "ana@example.com");

    let duplicate = create_user(&pool, &new_user).await;
    assert!(matches!(duplicate, Err(Error::Conflict(_))));

    let updated = update_user(
        &pool,
        user.id,
        &UserUpdate {
            learning_language: Some("FR".to_string()),
            ..Default::default()
        },
    )
    .await
    .unwrap()
    .unwrap();
    assert_eq!(updated.learning_language, "fr");
    assert_eq!(updated.name.as_deref(), Some("Ana"));
    assert!(get_user(&pool, uuid::Uuid::new_v4()).await.unwrap().is_none());

    record_progress(
        &pool,
        &NewProgress {
            user_id: user.id,
            phrase_id: phrase.id,
            user_answer: "Wie ist der Kaffee?".to_string(),
            ai_feedback: "Perfecto".to_string(),
            is_correct: true,
            accuracy_score: 100,
            words_learned: vec!["kaffee".to_string()],
            words_forgotten: Vec::new(),
        },
    )
    .await
    .unwrap();

    let entries = list_progress_for_user(&pool, user.id).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].phrase_native_text, phrase.native_text);
    assert!(entries[0].progress.is_correct);
    assert_eq!(entries[0].progress.words_learned, vec!["kaffee"]);
    assert!(entries[0].progress.words_forgotten.is_empty());
}

#[tokio::test]
async fn test_update_phrase_keeps_unset_fields() {
    let pool = init_memory_database().await.unwrap();
    let phrase = seeded_phrase(&pool).await;

    let updated = update_phrase(
        &pool,
        phrase.id,
        &PhraseUpdate {
            learning_text: Some("  Wie schmeckt der Kaffee?  ".to_string()),
            cefr_level: Some(CefrLevel::B1),
            difficulty: Some(Difficulty::Intermediate),
            ..Default::default()
        },
    )
    .await
    .unwrap()
    .unwrap();

    assert_eq!(updated.learning_text, "Wie schmeckt der Kaffee?");
    assert_eq!(updated.cefr_level, CefrLevel::B1);
    assert_eq!(updated.difficulty, Difficulty::Intermediate);
    assert_eq!(updated.native_text, phrase.native_text);
    assert_eq!(updated.context, phrase.context);
    assert_eq!(updated.category.as_deref(), Some("food"));

    let missing = update_phrase(&pool, uuid::Uuid::new_v4(), &PhraseUpdate::default())
        .await
        .unwrap();
    assert!(missing.is_none());
}

#[tokio::test]
async fn test_deleting_user_cascades_to_progress() {
    let pool = init_memory_database().await.unwrap();
    let phrase = seeded_phrase(&pool).await;
    let user = create_user(
        &pool,
        &NewUser {
            email: "leo@example.com".to_string(),
            name: None,
            role: UserRole::User,
            native_language: "es".to_string(),
            learning_language: "de".to_string(),
        },
    )
    .await
    .unwrap();

    record_progress(
        &pool,
        &NewProgress {
            user_id: user.id,
            phrase_id: phrase.id,
            user_answer: "Kaffee".to_string(),
            ai_feedback: "Incompleto".to_string(),
            is_correct: false,
            accuracy_score: 20,
            words_learned: Vec::new(),
            words_forgotten: Vec::new(),
        },
    )
    .await
    .unwrap();

    assert!(delete_user(&pool, user.id).await.unwrap());
    assert!(!delete_user(&pool, user.id).await.unwrap());
    assert!(get_user(&pool, user.id).await.unwrap().is_none());

    let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM user_phrase_progress")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(remaining, 0);
    assert!(get_phrase(&pool, phrase.id).await.unwrap().is_some());
}
