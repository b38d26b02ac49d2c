//! Word-explanation coverage validator
//!
//! Scores a sentence's explanation set against the sentence's important
//! words. The result is a [`ValidationReport`]: which important words lack an
//! explanation, which explanations point at words that are not important
//! words of the sentence, and the resulting coverage percentage.
//!
//! Validation is a pure function of its inputs. It never fails; missing data
//! only lowers coverage.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

use crate::db::models::WordExplanation;
use crate::important_words::ImportantWordFilter;
use crate::text::{normalize, tokenize, Token};

/// Anything that names the word it explains
pub trait Explained {
    /// Word as stored or returned (not necessarily normalized)
    fn word(&self) -> &str;
}

impl Explained for WordExplanation {
    fn word(&self) -> &str {
        &self.word
    }
}

impl Explained for String {
    fn word(&self) -> &str {
        self
    }
}

impl Explained for &str {
    fn word(&self) -> &str {
        self
    }
}

/// Coverage of a sentence by its explanation set
///
/// Derived on every evaluation and never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Unique important words of the sentence
    pub total_important_words: usize,
    /// Explanation entries supplied for evaluation
    pub explained_count: usize,
    /// Important words without an explanation, first-seen surface form
    pub missing_words: Vec<String>,
    /// Explanation words that are not important words of the sentence,
    /// as stored
    pub extra_words: Vec<String>,
    /// Percentage of important words explained, rounded to 2 decimals
    ///
    /// Capped at 99.99 while any word is missing, so `100.0` always means
    /// nothing is missing.
    pub coverage_percent: f64,
    /// Full coverage and no extras
    pub is_valid: bool,
}

impl ValidationReport {
    pub fn missing_count(&self) -> usize {
        self.missing_words.len()
    }

    pub fn extra_count(&self) -> usize {
        self.extra_words.len()
    }
}

/// Highest coverage reported while any important word is missing
pub const MAX_INCOMPLETE_COVERAGE: f64 = 99.99;

/// Unique important words of a sentence, in first-seen order
///
/// Repeats are collapsed by normalized form; the first occurrence's surface
/// form is kept.
pub fn important_words(
    sentence: &str,
    language_code: &str,
    filter: &ImportantWordFilter,
) -> Vec<Token> {
    let mut seen = HashSet::new();
    tokenize(sentence)
        .into_iter()
        .filter(|token| seen.insert(token.normalized.clone()))
        .filter(|token| filter.is_important(&token.normalized, language_code))
        .collect()
}

/// Validate an explanation set against a sentence
///
/// `language_code` selects the allow-list of the sentence's (target)
/// language.
pub fn validate<E: Explained>(
    sentence: &str,
    language_code: &str,
    explanations: &[E],
    filter: &ImportantWordFilter,
) -> ValidationReport {
    let important = important_words(sentence, language_code, filter);

    let explained: HashSet<String> = explanations.iter().map(|e| normalize(e.word())).collect();

    let missing_words: Vec<String> = important
        .iter()
        .filter(|token| !explained.contains(&token.normalized))
        .map(|token| token.original.clone())
        .collect();

    let important_set: HashSet<&str> =
        important.iter().map(|token| token.normalized.as_str()).collect();

    let extra_words: Vec<String> = explanations
        .iter()
        .filter(|e| !important_set.contains(normalize(e.word()).as_str()))
        .map(|e| e.word().to_string())
        .collect();

    let total = important.len();
    let coverage_percent = if total == 0 {
        100.0
    } else {
        let raw = (total - missing_words.len()) as f64 / total as f64 * 100.0;
        let rounded = (raw * 100.0).round() / 100.0;
        // Rounding must not report full coverage while a word is missing
        if missing_words.is_empty() {
            rounded
        } else {
            rounded.min(MAX_INCOMPLETE_COVERAGE)
        }
    };

    let is_valid = missing_words.is_empty() && extra_words.is_empty();

    debug!(
        sentence = sentence,
        language = language_code,
        important = total,
        explained = explanations.len(),
        missing = missing_words.len(),
        extra = extra_words.len(),
        coverage = coverage_percent,
        valid = is_valid,
        "Explanation coverage evaluated"
    );

    ValidationReport {
        total_important_words: total,
        explained_count: explanations.len(),
        missing_words,
        extra_words,
        coverage_percent,
        is_valid,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SENTENCE: &str = "Wie würden Sie einen Kaffee bestellen?";
    const WORDS: [&str; 6] = ["wie", "würden", "sie", "einen", "kaffee", "bestellen"];

    fn filter() -> ImportantWordFilter {
        ImportantWordFilter::default()
    }

    #[test]
    fn test_no_explanations_reports_every_important_word_missing() {
        let report = validate::<&str>(SENTENCE, "de", &[], &filter());

        assert_eq!(report.total_important_words, 6);
        assert_eq!(
            report.missing_words,
            vec!["Wie", "würden", "Sie", "einen", "Kaffee", "bestellen?"]
        );
        assert_eq!(report.coverage_percent, 0.0);
        assert!(!report.is_valid);
    }

    #[test]
    fn test_rounding_never_reaches_full_coverage_with_missing_word() {
        let sentence: String = (0..20_001)
            .map(|i| format!("wort{}", i))
            .collect::<Vec<_>>()
            .join(" ");
        let explained: Vec<String> = (1..20_001).map(|i| format!("wort{}", i)).collect();

        let report = validate(&sentence, "de", &explained, &filter());

        assert_eq!(report.missing_words, vec!["wort0"]);
        assert_eq!(report.coverage_percent, 99.99);
        assert!(!report.is_valid);
    }

    #[test]
    fn test_full_explanation_set_is_valid() {
        let report = validate(SENTENCE, "de", &WORDS, &filter());

        assert_eq!(report.coverage_percent, 100.0);
        assert!(report.extra_words.is_empty());
        assert!(report.is_valid);
    }

    #[test]
    fn test_extra_word_invalidates_full_coverage() {
        let mut words = WORDS.to_vec();
        words.push("foo");
        let report = validate(SENTENCE, "de", &words, &filter());

        assert_eq!(report.coverage_percent, 100.0);
        assert_eq!(report.extra_words, vec!["foo"]);
        assert!(!report.is_valid);
    }

    #[test]
    fn test_explanation_words_are_normalized_before_comparison() {
        let words = ["WIE", "Würden,", "sie", "(einen)", "Kaffee!", "bestellen?"];
        let report = validate(SENTENCE, "de", &words, &filter());

        assert!(report.is_valid, "{:?}", report);
    }

    #[test]
    fn test_extra_words_reported_with_stored_spelling() {
        let report = validate(SENTENCE, "de", &["Tee!"], &filter());
        assert_eq!(report.extra_words, vec!["Tee!"]);
    }

    #[test]
    fn test_repeated_word_counted_once() {
        let report = validate::<&str>("Kaffee, Kaffee und noch mehr Kaffee", "de", &[], &filter());
        // kaffee, und, noch, mehr
        assert_eq!(report.total_important_words, 4);
        assert_eq!(report.missing_words[0], "Kaffee,");
    }

    #[test]
    fn test_unimportant_short_word_explanation_is_extra() {
        let report = validate("Ja gerne", "de", &["ja", "gerne"], &filter());
        assert_eq!(report.total_important_words, 1);
        assert_eq!(report.extra_words, vec!["ja"]);
        assert!(!report.is_valid);
    }

    #[test]
    fn test_zero_important_words() {
        let empty = validate::<&str>("ja ok", "de", &[], &filter());
        assert_eq!(empty.total_important_words, 0);
        assert_eq!(empty.coverage_percent, 100.0);
        assert!(empty.is_valid);

        let with_extra = validate("ja ok", "de", &["kaffee"], &filter());
        assert_eq!(with_extra.coverage_percent, 100.0);
        assert!(!with_extra.is_valid);
    }

    #[test]
    fn test_coverage_is_rounded_to_two_decimals() {
        let report = validate("eins zwei drei", "de", &["eins"], &filter());
        assert_eq!(report.coverage_percent, 33.33);
    }

    #[test]
    fn test_adding_missing_explanation_never_lowers_coverage() {
        let f = filter();
        let mut words: Vec<&str> = Vec::new();
        let mut previous = validate(SENTENCE, "de", &words, &f);

        for word in WORDS {
            words.push(word);
            let next = validate(SENTENCE, "de", &words, &f);
            assert!(next.coverage_percent >= previous.coverage_percent);
            assert!(next.missing_words.len() <= previous.missing_words.len());
            previous = next;
        }
    }

    #[test]
    fn test_validity_matches_definition() {
        let f = filter();
        let cases: Vec<Vec<&str>> = vec![
            vec![],
            WORDS.to_vec(),
            WORDS[..3].to_vec(),
            vec!["wie", "würden", "sie", "einen", "kaffee", "bestellen", "tee"],
            vec!["tee"],
        ];

        for words in cases {
            let report = validate(SENTENCE, "de", &words, &f);
            let expected = report.coverage_percent == 100.0 && report.extra_words.is_empty();
            assert_eq!(report.is_valid, expected, "{:?}", words);
        }
    }

    #[test]
    fn test_validate_is_repeatable() {
        let f = filter();
        let first = validate(SENTENCE, "de", &["wie", "tee"], &f);
        let second = validate(SENTENCE, "de", &["wie", "tee"], &f);
        assert_eq!(first, second);
    }
}
