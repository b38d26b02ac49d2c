//! Phrase generation pipeline
//!
//! Asks the tutor for a batch of phrases, drops duplicates, stores each
//! phrase with its candidate explanations and drives the explanations to
//! full coverage. Coverage never fails a batch: a phrase whose explanations
//! are still incomplete after the last pass is kept and reported as invalid.

use futures::StreamExt;
use lingo_common::convergence::ConvergenceOutcome;
use lingo_common::db::phrases::{existing_native_texts, insert_phrase};
use lingo_common::db::SqliteExplanationStore;
use lingo_common::repair::{accept_candidates, normalized_unique, persist_explanations};
use lingo_common::{
    converge, BatchSummary, CandidateExplanation, CefrLevel, Error, ExplanationStore,
    ImportantWordFilter, Language, NewPhrase, Phrase, PhraseContext, Result, ValidationReport,
};
use serde::Serialize;
use sqlx::SqlitePool;
use std::collections::HashSet;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::tutor::{GeneratedPhrase, PhraseRequest, TutorService};

/// Maximum phrases per generation request
pub const MAX_QUANTITY: usize = 50;

#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub native_language: Language,
    pub learning_language: Language,
    pub cefr_level: CefrLevel,
    pub category: Option<String>,
    pub quantity: usize,
}

/// Tuning for one batch, taken from `[coverage]`
#[derive(Debug, Clone, Copy)]
pub struct GenerationLimits {
    pub max_validation_passes: usize,
    pub concurrency: usize,
}

/// Per-phrase coverage result reported to the client
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhraseValidation {
    pub phrase_id: Uuid,
    pub coverage_percent: f64,
    pub missing_count: usize,
    pub extra_count: usize,
    pub is_valid: bool,
    /// Validation passes run; 0 when the stored set could not be read
    pub passes: usize,
}

impl PhraseValidation {
    pub fn from_outcome(phrase_id: Uuid, outcome: &ConvergenceOutcome) -> Self {
        Self {
            phrase_id,
            coverage_percent: outcome.report.coverage_percent,
            missing_count: outcome.report.missing_count(),
            extra_count: outcome.report.extra_count(),
            is_valid: outcome.report.is_valid,
            passes: outcome.passes,
        }
    }

    fn unchecked(phrase_id: Uuid) -> Self {
        Self {
            phrase_id,
            coverage_percent: 0.0,
            missing_count: 0,
            extra_count: 0,
            is_valid: false,
            passes: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerationReport {
    pub message: String,
    pub phrases: Vec<Phrase>,
    pub requested: usize,
    pub created: usize,
    pub duplicates: usize,
    pub validation: Vec<PhraseValidation>,
    pub summary: BatchSummary,
}

/// Context handed to the explanation generator for a stored phrase
pub fn phrase_context(phrase: &Phrase, native_language: Language, learning_language: Language) -> PhraseContext {
    PhraseContext {
        phrase_id: phrase.id,
        sentence_text: phrase.learning_text.clone(),
        expected_answer: phrase.native_text.clone(),
        explanation_context: phrase.context.clone(),
        native_language,
        learning_language,
    }
}

fn duplicate_key(native_text: &str) -> String {
    native_text.trim().to_lowercase()
}

/// Drop blank phrases, phrases already stored, and repeats within the batch
pub fn drop_duplicates(existing: &[String], generated: Vec<GeneratedPhrase>) -> Vec<GeneratedPhrase> {
    let mut seen: HashSet<String> = existing.iter().map(|t| duplicate_key(t)).collect();

    generated
        .into_iter()
        .filter(|p| !p.native_text.trim().is_empty() && !p.learning_text.trim().is_empty())
        .filter(|p| seen.insert(duplicate_key(&p.native_text)))
        .collect()
}

/// Store a phrase's candidate explanations before the first validation
///
/// Malformed candidates and repeated words are dropped; conflicts count as
/// stored. Extra words are left for the convergence loop to remove.
pub async fn seed_explanations<S>(
    store: &S,
    context: &PhraseContext,
    candidates: Vec<CandidateExplanation>,
) -> u64
where
    S: ExplanationStore + ?Sized,
{
    let words: Vec<String> = candidates.iter().filter_map(|c| c.word.clone()).collect();
    let requested = normalized_unique(&words);
    let accepted = accept_candidates(context.scope(), &requested, candidates);
    persist_explanations(store, &accepted).await
}

struct ProcessedPhrase {
    phrase: Phrase,
    validation: PhraseValidation,
    report: Option<ValidationReport>,
}

async fn process_phrase(
    pool: &SqlitePool,
    tutor: &dyn TutorService,
    filter: &ImportantWordFilter,
    request: &GenerationRequest,
    max_passes: usize,
    generated: GeneratedPhrase,
) -> Result<ProcessedPhrase> {
    let phrase = insert_phrase(
        pool,
        &NewPhrase {
            native_language_id: request.native_language.id,
            learning_language_id: request.learning_language.id,
            native_text: generated.native_text,
            learning_text: generated.learning_text,
            context: generated.context.filter(|c| !c.trim().is_empty()),
            difficulty: request.cefr_level.difficulty(),
            cefr_level: request.cefr_level,
            category: request.category.clone(),
        },
    )
    .await?;

    let store = SqliteExplanationStore::new(pool.clone());
    let context = phrase_context(
        &phrase,
        request.native_language.clone(),
        request.learning_language.clone(),
    );

    let seeded = seed_explanations(&store, &context, generated.word_explanations).await;
    info!(phrase_id = %phrase.id, seeded, "Stored phrase");

    match converge(&context, tutor, &store, filter, max_passes).await {
        Ok(outcome) => Ok(ProcessedPhrase {
            validation: PhraseValidation::from_outcome(phrase.id, &outcome),
            report: Some(outcome.report),
            phrase,
        }),
        Err(e) => {
            error!(phrase_id = %phrase.id, error = %e, "Explanation validation failed; phrase kept");
            Ok(ProcessedPhrase {
                validation: PhraseValidation::unchecked(phrase.id),
                report: None,
                phrase,
            })
        }
    }
}

/// Generate, store and validate a batch of phrases
pub async fn generate_batch(
    pool: &SqlitePool,
    tutor: &dyn TutorService,
    filter: &ImportantWordFilter,
    limits: GenerationLimits,
    request: GenerationRequest,
) -> Result<GenerationReport> {
    let existing = existing_native_texts(
        pool,
        request.native_language.id,
        request.learning_language.id,
    )
    .await?;

    let generated = tutor
        .generate_phrases(&PhraseRequest {
            native_language: request.native_language.clone(),
            learning_language: request.learning_language.clone(),
            cefr_level: request.cefr_level,
            category: request.category.clone(),
            quantity: request.quantity,
            avoid: existing.clone(),
        })
        .await?;

    let generated_count = generated.len();
    let fresh = drop_duplicates(&existing, generated);
    let duplicates = generated_count - fresh.len();

    if fresh.is_empty() {
        return Err(Error::InvalidInput(
            "No new phrases could be generated; all generated phrases already exist".to_string(),
        ));
    }
    if duplicates > 0 {
        info!(duplicates, "Dropped duplicate generated phrases");
    }

    let results: Vec<Result<ProcessedPhrase>> = futures::stream::iter(fresh)
        .map(|generated| {
            process_phrase(pool, tutor, filter, &request, limits.max_validation_passes, generated)
        })
        .buffered(limits.concurrency.max(1))
        .collect()
        .await;

    let mut processed = Vec::with_capacity(results.len());
    let mut last_error = None;
    for result in results {
        match result {
            Ok(p) => processed.push(p),
            Err(e) => {
                warn!(error = %e, "Failed to store generated phrase");
                last_error = Some(e);
            }
        }
    }

    if processed.is_empty() {
        return Err(last_error.unwrap_or_else(|| Error::Internal("no phrase was stored".to_string())));
    }

    let summary = BatchSummary::from_reports(processed.iter().filter_map(|p| p.report.as_ref()));
    info!(
        created = processed.len(),
        valid = summary.valid,
        invalid = summary.invalid,
        average_coverage = summary.average_coverage,
        "Phrase batch generated"
    );

    let created = processed.len();
    let (phrases, validation) = processed
        .into_iter()
        .map(|p| (p.phrase, p.validation))
        .unzip();

    Ok(GenerationReport {
        message: format!("Generated {} phrases", created),
        phrases,
        requested: request.quantity,
        created,
        duplicates,
        validation,
        summary,
    })
}
