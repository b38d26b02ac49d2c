//! Word normalization and sentence tokenization
//!
//! `normalize` is the single source of truth for word identity: every word
//! that is compared, stored, deleted or requested from a generator goes
//! through it first.

/// Punctuation stripped from words before comparison
pub const STRIPPED_PUNCTUATION: [char; 8] = ['.', ',', '!', '?', ';', ':', '(', ')'];

/// A sentence token with its surface form and normalized identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Token exactly as it appeared in the sentence (punctuation included)
    pub original: String,
    /// Normalized form used for identity
    pub normalized: String,
}

/// Strip punctuation, trim whitespace and lower-case a word
pub fn normalize(word: &str) -> String {
    let stripped: String = word
        .chars()
        .filter(|c| !STRIPPED_PUNCTUATION.contains(c))
        .collect();
    stripped.trim().to_lowercase()
}

/// Split a sentence on whitespace into normalized tokens
///
/// Tokens that normalize to the empty string (bare punctuation) are dropped.
/// Order is preserved and repeats are kept.
pub fn tokenize(sentence: &str) -> Vec<Token> {
    sentence
        .split_whitespace()
        .filter_map(|word| {
            let normalized = normalize(word);
            if normalized.is_empty() {
                None
            } else {
                Some(Token {
                    original: word.to_string(),
                    normalized,
                })
            }
        })
        .collect()
}
