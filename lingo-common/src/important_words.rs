//! Important-word filter
//!
//! A normalized word is important when it is longer than the configured
//! minimum length, or when it appears on the allow-list of short but
//! grammatically significant forms for the sentence's target language.
//!
//! Allow-lists are plain data: built-in tables below, extended at startup
//! from the `[important_words]` TOML section. The filter is immutable once
//! built and is shared read-only (`Arc`) by all requests.

use std::collections::{HashMap, HashSet};

/// Words whose character count exceeds this are important by length
pub const DEFAULT_MIN_WORD_LENGTH: usize = 2;

const GERMAN: &[&str] = &[
    // question words
    "wie", "was", "wo", "wann", "warum", "wer", "wohin", "woher",
    // pronouns
    "sie", "er", "es", "ihr", "ihm", "ihn", "uns", "mir", "dir",
    // articles
    "der", "die", "das", "ein", "eine", "den", "dem", "des",
    // copulas and auxiliaries
    "ist", "sind", "hat", "haben", "bin", "bist", "seid",
    // conjunctions
    "und", "oder", "aber",
    // prepositions and particles
    "zu", "an", "in", "am", "im", "zum", "zur", "auf", "um", "von", "mit", "für", "vor",
    "nach", "über", "unter", "durch", "bei", "seit", "bis",
];

const ENGLISH: &[&str] = &[
    "what", "how", "where", "when", "why", "who", "which",
    "he", "she", "it", "we", "they", "you", "me", "us", "him", "her", "i",
    "the", "a", "an",
    "is", "are", "has", "have", "am", "was", "were", "be",
    "and", "or", "but",
    "to", "in", "on", "at", "of", "for", "with", "by", "from", "up", "as", "do", "if", "so",
];

const SPANISH: &[&str] = &[
    "qué", "que", "cómo", "dónde", "cuándo", "quién",
    "yo", "tú", "tu", "él", "el", "me", "te", "se", "le", "lo", "la", "nos", "mi",
    "los", "las", "un", "una",
    "es", "soy", "son", "ha", "he", "va", "voy",
    "y", "o", "e", "u", "ni", "si",
    "a", "al", "de", "del", "en", "con", "por", "sin",
];

const FRENCH: &[&str] = &[
    "qui", "que", "quoi", "où",
    "je", "tu", "il", "on", "me", "te", "se", "le", "la", "les", "lui", "moi", "toi",
    "un", "une", "des", "du",
    "es", "est", "ai", "as", "a", "va", "vas",
    "et", "ou", "ni", "si",
    "à", "au", "aux", "de", "en", "par", "sur",
    "ne", "pas", "y",
];

const ITALIAN: &[&str] = &[
    "chi", "che", "dove",
    "io", "tu", "lui", "lei", "noi", "voi", "mi", "ti", "si", "ci", "vi", "lo", "la", "li", "le",
    "il", "gli", "un", "uno", "una",
    "è", "e", "ho", "hai", "ha", "sei", "sono",
    "o", "ma", "se",
    "a", "al", "di", "da", "in", "su", "con", "per", "tra", "fra",
    "non", "ne",
];

const PORTUGUESE: &[&str] = &[
    "que", "quê", "quem", "onde",
    "eu", "tu", "ele", "ela", "nós", "me", "te", "se", "lhe", "o", "a", "os", "as",
    "um", "uma",
    "é", "são", "sou", "há", "tem", "vai", "vou",
    "e", "ou", "mas", "se",
    "de", "do", "da", "em", "no", "na", "ao", "à", "por", "com", "sem",
    "não",
];

/// Built-in allow-lists, keyed by language code
pub fn builtin_allow_lists() -> HashMap<String, HashSet<String>> {
    [
        ("de", GERMAN),
        ("en", ENGLISH),
        ("es", SPANISH),
        ("fr", FRENCH),
        ("it", ITALIAN),
        ("pt", PORTUGUESE),
    ]
    .into_iter()
    .map(|(code, words)| {
        (
            code.to_string(),
            words.iter().map(|w| w.to_string()).collect(),
        )
    })
    .collect()
}

/// Decides which normalized words must carry an explanation
#[derive(Debug, Clone)]
pub struct ImportantWordFilter {
    min_word_length: usize,
    allow_lists: HashMap<String, HashSet<String>>,
}

impl Default for ImportantWordFilter {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_WORD_LENGTH, builtin_allow_lists())
    }
}

impl ImportantWordFilter {
    /// Create a filter from a length threshold and explicit allow-lists
    ///
    /// Language codes and words are normalized on the way in so lookups are
    /// insensitive to how the configuration spelled them.
    pub fn new(min_word_length: usize, allow_lists: HashMap<String, HashSet<String>>) -> Self {
        let allow_lists = allow_lists
            .into_iter()
            .map(|(code, words)| {
                let words = words
                    .iter()
                    .map(|w| crate::text::normalize(w))
                    .filter(|w| !w.is_empty())
                    .collect();
                (code.trim().to_lowercase(), words)
            })
            .collect();

        Self {
            min_word_length,
            allow_lists,
        }
    }

    /// Built-in allow-lists extended with configured additions
    ///
    /// Additions never remove built-in entries.
    pub fn with_extensions(
        min_word_length: usize,
        extensions: &HashMap<String, Vec<String>>,
    ) -> Self {
        let mut lists = builtin_allow_lists();
        for (code, words) in extensions {
            lists
                .entry(code.trim().to_lowercase())
                .or_default()
                .extend(words.iter().cloned());
        }
        Self::new(min_word_length, lists)
    }

    pub fn min_word_length(&self) -> usize {
        self.min_word_length
    }

    /// Languages that have an allow-list
    pub fn languages(&self) -> Vec<&str> {
        let mut codes: Vec<&str> = self.allow_lists.keys().map(String::as_str).collect();
        codes.sort_unstable();
        codes
    }

    /// True if `normalized_word` must be explained in `language_code`
    ///
    /// Length is counted in characters, so "für" is three long. A language
    /// without an allow-list only applies the length rule.
    pub fn is_important(&self, normalized_word: &str, language_code: &str) -> bool {
        if normalized_word.chars().count() > self.min_word_length {
            return true;
        }

        self.allow_lists
            .get(&language_code.trim().to_lowercase())
            .map(|words| words.contains(normalized_word))
            .unwrap_or(false)
    }
}
