//! # Lingo Common Library
//!
//! Shared code for the Lingo services including:
//! - Sentence normalization and tokenization
//! - Important-word filtering per target language
//! - Word-explanation coverage validation, repair and convergence
//! - Database models and queries
//! - Configuration loading

pub mod config;
pub mod convergence;
pub mod coverage;
pub mod db;
pub mod error;
pub mod important_words;
pub mod repair;
pub mod text;

pub use convergence::{converge, BatchSummary, ConvergenceOutcome};
pub use coverage::{validate, ValidationReport};
pub use db::models::*;
pub use error::{Error, Result};
pub use important_words::ImportantWordFilter;
pub use repair::{
    repair, CandidateExplanation, ExplanationGenerator, ExplanationScope, ExplanationStore,
    NewWordExplanation, PhraseContext, RepairOutcome,
};
