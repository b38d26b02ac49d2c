//! Bounded validate/repair loop
//!
//! Per phrase: validate the stored explanation set, and while it is invalid
//! and passes remain, repair and validate again. Pass 1 is the initial
//! validation, so `max_passes = 3` allows at most two repairs.
//!
//! An invalid final report is not an error. It is returned for the caller to
//! log and surface; the phrase stays stored regardless of coverage.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::coverage::{validate, ValidationReport};
use crate::important_words::ImportantWordFilter;
use crate::repair::{repair, ExplanationGenerator, ExplanationStore, PhraseContext};
use crate::Result;

/// Default ceiling on validation passes (1 initial + 2 repairs)
pub const DEFAULT_MAX_VALIDATION_PASSES: usize = 3;

/// Result of running the loop for one phrase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvergenceOutcome {
    /// Report from the last validation pass
    pub report: ValidationReport,
    /// Validation passes performed (at least 1)
    pub passes: usize,
    /// Explanations added across all repairs
    pub added: u64,
    /// Explanations removed across all repairs
    pub removed: u64,
}

/// Validate the stored explanation set once
pub async fn validate_stored<S>(
    context: &PhraseContext,
    store: &S,
    filter: &ImportantWordFilter,
) -> Result<ValidationReport>
where
    S: ExplanationStore + ?Sized,
{
    let explanations = store.find_many(&context.scope()).await?;
    Ok(validate(
        &context.sentence_text,
        &context.learning_language.code,
        &explanations,
        filter,
    ))
}

/// Drive a phrase's explanations toward exact coverage
///
/// Stops at the first valid report or after `max_passes` validations
/// (values below 1 are treated as 1). Only a failure to read the stored
/// explanations is returned as an error.
pub async fn converge<G, S>(
    context: &PhraseContext,
    generator: &G,
    store: &S,
    filter: &ImportantWordFilter,
    max_passes: usize,
) -> Result<ConvergenceOutcome>
where
    G: ExplanationGenerator + ?Sized,
    S: ExplanationStore + ?Sized,
{
    let max_passes = max_passes.max(1);
    let mut added = 0;
    let mut removed = 0;
    let mut passes = 0;
    let mut report = None;

    for pass in 1..=max_passes {
        let current = validate_stored(context, store, filter).await?;
        passes = pass;

        debug!(
            phrase_id = %context.phrase_id,
            pass,
            coverage = current.coverage_percent,
            missing = current.missing_count(),
            extra = current.extra_count(),
            "Validation pass"
        );

        let done = current.is_valid || pass == max_passes;
        if !done {
            let outcome = repair(context, &current, generator, store).await;
            added += outcome.added;
            removed += outcome.removed;
        }
        report = Some(current);
        if done {
            break;
        }
    }

    let report = report.ok_or_else(|| crate::Error::Internal("no validation pass ran".to_string()))?;

    if report.is_valid {
        info!(
            phrase_id = %context.phrase_id,
            passes,
            added,
            removed,
            "Explanations complete"
        );
    } else {
        warn!(
            phrase_id = %context.phrase_id,
            passes,
            coverage = report.coverage_percent,
            missing = ?report.missing_words,
            extra = ?report.extra_words,
            "Explanations still incomplete after final pass"
        );
    }

    Ok(ConvergenceOutcome {
        report,
        passes,
        added,
        removed,
    })
}

/// Aggregate coverage over a batch of phrases
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total: usize,
    pub valid: usize,
    pub invalid: usize,
    /// Mean coverage percent, rounded to 2 decimals (0 for an empty batch)
    pub average_coverage: f64,
}

impl BatchSummary {
    pub fn from_reports<'a, I>(reports: I) -> Self
    where
        I: IntoIterator<Item = &'a ValidationReport>,
    {
        let mut summary = BatchSummary::default();
        let mut coverage_sum = 0.0;

        for report in reports {
            summary.total += 1;
            if report.is_valid {
                summary.valid += 1;
            } else {
                summary.invalid += 1;
            }
            coverage_sum += report.coverage_percent;
        }

        if summary.total > 0 {
            let average = coverage_sum / summary.total as f64;
            summary.average_coverage = (average * 100.0).round() / 100.0;
        }

        summary
    }
}
