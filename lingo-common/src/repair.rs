//! Word-explanation repair driver
//!
//! Moves a phrase's stored explanation set toward exact coverage:
//! explanations for extra words are deleted, and explanations for missing
//! words are requested from an external generator, filtered, and inserted.
//!
//! The generator and the store are reached through the
//! [`ExplanationGenerator`] and [`ExplanationStore`] traits. Neither kind of
//! failure aborts a repair: a generator failure yields zero candidates, and a
//! failed delete or insert is logged and skipped.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::coverage::ValidationReport;
use crate::db::models::{ExamplePair, Language, WordExplanation};
use crate::text::normalize;
use crate::Result;

/// Unique key space of explanations: one phrase in one language pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExplanationScope {
    pub phrase_id: Uuid,
    pub native_language_id: Uuid,
    pub learning_language_id: Uuid,
}

/// Explanation ready for insertion; `word` is already normalized
#[derive(Debug, Clone, PartialEq)]
pub struct NewWordExplanation {
    pub scope: ExplanationScope,
    pub word: String,
    pub translation: String,
    pub explanation: String,
    pub examples: Vec<ExamplePair>,
    pub grammar_explanation: Option<String>,
}

/// Explanation as returned by a generator, before any checks
///
/// Every field may be absent; generators are not trusted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateExplanation {
    #[serde(default)]
    pub word: Option<String>,
    #[serde(default)]
    pub translation: Option<String>,
    #[serde(default)]
    pub explanation: Option<String>,
    #[serde(default)]
    pub examples: Vec<ExamplePair>,
}

impl CandidateExplanation {
    /// Convenience constructor for a complete candidate
    pub fn new(word: &str, translation: &str, explanation: &str) -> Self {
        Self {
            word: Some(word.to_string()),
            translation: Some(translation.to_string()),
            explanation: Some(explanation.to_string()),
            examples: Vec::new(),
        }
    }
}

/// Phrase data handed to the generator and used to scope store calls
#[derive(Debug, Clone)]
pub struct PhraseContext {
    pub phrase_id: Uuid,
    /// Sentence whose words are explained (target language)
    pub sentence_text: String,
    pub expected_answer: String,
    pub explanation_context: Option<String>,
    pub native_language: Language,
    pub learning_language: Language,
}

impl PhraseContext {
    pub fn scope(&self) -> ExplanationScope {
        ExplanationScope {
            phrase_id: self.phrase_id,
            native_language_id: self.native_language.id,
            learning_language_id: self.learning_language.id,
        }
    }
}

/// External source of word explanations (an LLM in production)
#[async_trait]
pub trait ExplanationGenerator: Send + Sync {
    /// Produce explanations for `words` (normalized) in the phrase's context
    ///
    /// Output may contain extra, missing or malformed entries.
    async fn generate(
        &self,
        words: &[String],
        context: &PhraseContext,
    ) -> Result<Vec<CandidateExplanation>>;
}

/// Record store for word explanations
#[async_trait]
pub trait ExplanationStore: Send + Sync {
    /// Insert an explanation
    ///
    /// Fails with [`crate::Error::Conflict`] when the
    /// (phrase, word, native language, learning language) key exists.
    async fn create(&self, explanation: &NewWordExplanation) -> Result<WordExplanation>;

    /// Delete every explanation of `word` in `scope`, returning rows removed
    async fn delete_many(&self, scope: &ExplanationScope, word: &str) -> Result<u64>;

    /// All explanations in `scope`
    async fn find_many(&self, scope: &ExplanationScope) -> Result<Vec<WordExplanation>>;
}

/// Counts reported by one repair call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairOutcome {
    pub added: u64,
    pub removed: u64,
}

/// Normalize and de-duplicate words, keeping first-seen order
pub fn normalized_unique(words: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    words
        .iter()
        .map(|w| normalize(w))
        .filter(|w| !w.is_empty() && seen.insert(w.clone()))
        .collect()
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Turn generator output into insertable explanations
///
/// Drops candidates lacking a word, translation or explanation, candidates
/// whose normalized word was not requested, and repeats of a word already
/// accepted in this batch.
pub fn accept_candidates(
    scope: ExplanationScope,
    requested: &[String],
    candidates: Vec<CandidateExplanation>,
) -> Vec<NewWordExplanation> {
    let requested: HashSet<&str> = requested.iter().map(String::as_str).collect();
    let mut accepted_words = HashSet::new();
    let mut accepted = Vec::new();

    for candidate in candidates {
        let (Some(raw_word), Some(translation), Some(explanation)) = (
            non_blank(candidate.word),
            non_blank(candidate.translation),
            non_blank(candidate.explanation),
        ) else {
            warn!("Skipping generated explanation with missing fields");
            continue;
        };

        let word = normalize(&raw_word);
        if !requested.contains(word.as_str()) {
            warn!(word = %word, "Skipping generated explanation for a word that was not requested");
            continue;
        }
        if !accepted_words.insert(word.clone()) {
            debug!(word = %word, "Skipping repeated generated explanation");
            continue;
        }

        accepted.push(NewWordExplanation {
            scope,
            word,
            translation,
            explanation,
            examples: candidate.examples,
            grammar_explanation: None,
        });
    }

    accepted
}

async fn remove_extras<S>(store: &S, scope: &ExplanationScope, extra_words: &[String]) -> u64
where
    S: ExplanationStore + ?Sized,
{
    let mut removed = 0;
    for word in normalized_unique(extra_words) {
        match store.delete_many(scope, &word).await {
            Ok(0) => warn!(phrase_id = %scope.phrase_id, word = %word, "No explanation found to remove"),
            Ok(count) => {
                info!(phrase_id = %scope.phrase_id, word = %word, count, "Removed extra explanation");
                removed += count;
            }
            Err(e) => {
                error!(phrase_id = %scope.phrase_id, word = %word, error = %e, "Failed to remove extra explanation")
            }
        }
    }
    removed
}

async fn request_candidates<G>(
    generator: &G,
    words: &[String],
    context: &PhraseContext,
) -> Vec<CandidateExplanation>
where
    G: ExplanationGenerator + ?Sized,
{
    if words.is_empty() {
        return Vec::new();
    }

    match generator.generate(words, context).await {
        Ok(candidates) => candidates,
        Err(e) => {
            warn!(phrase_id = %context.phrase_id, error = %e, "Explanation generator failed; no candidates this pass");
            Vec::new()
        }
    }
}

/// Insert explanations one at a time
///
/// A uniqueness conflict means the word is already covered and counts as
/// added. Any other failure skips that explanation only.
pub async fn persist_explanations<S>(store: &S, explanations: &[NewWordExplanation]) -> u64
where
    S: ExplanationStore + ?Sized,
{
    let mut added = 0;
    for explanation in explanations {
        match store.create(explanation).await {
            Ok(_) => {
                debug!(phrase_id = %explanation.scope.phrase_id, word = %explanation.word, "Added explanation");
                added += 1;
            }
            Err(e) if e.is_conflict() => {
                warn!(phrase_id = %explanation.scope.phrase_id, word = %explanation.word, "Explanation already exists");
                added += 1;
            }
            Err(e) => {
                error!(
                    phrase_id = %explanation.scope.phrase_id,
                    word = %explanation.word,
                    error = %e,
                    "Failed to add explanation"
                );
            }
        }
    }
    added
}

/// Run one repair pass for a phrase
///
/// Extra removal and candidate generation touch disjoint words, so they run
/// concurrently; insertion waits for generation.
pub async fn repair<G, S>(
    context: &PhraseContext,
    report: &ValidationReport,
    generator: &G,
    store: &S,
) -> RepairOutcome
where
    G: ExplanationGenerator + ?Sized,
    S: ExplanationStore + ?Sized,
{
    let scope = context.scope();
    let missing = normalized_unique(&report.missing_words);

    if !report.extra_words.is_empty() {
        info!(phrase_id = %scope.phrase_id, count = report.extra_words.len(), "Removing extra explanations");
    }
    if !missing.is_empty() {
        info!(phrase_id = %scope.phrase_id, words = ?missing, "Requesting missing explanations");
    }

    let (removed, candidates) = futures::join!(
        remove_extras(store, &scope, &report.extra_words),
        request_candidates(generator, &missing, context),
    );

    let accepted = accept_candidates(scope, &missing, candidates);
    let added = persist_explanations(store, &accepted).await;

    info!(phrase_id = %scope.phrase_id, added, removed, "Repair pass finished");

    RepairOutcome { added, removed }
}
