//! AI tutor interface
//!
//! Everything the service asks of a language model goes through
//! [`TutorService`]. It extends [`ExplanationGenerator`] so one object both
//! repairs word explanations and serves the phrase, grammar, verification
//! and speech features. Tests substitute a scripted implementation.

use async_trait::async_trait;
use lingo_common::{CandidateExplanation, CefrLevel, Difficulty, ExplanationGenerator, Language, Phrase, Result};
use serde::{Deserialize, Serialize};

/// Parameters of one phrase-generation request
#[derive(Debug, Clone)]
pub struct PhraseRequest {
    pub native_language: Language,
    pub learning_language: Language,
    pub cefr_level: CefrLevel,
    pub category: Option<String>,
    pub quantity: usize,
    /// Native texts already stored, listed in the prompt as "do not repeat"
    pub avoid: Vec<String>,
}

/// A phrase as proposed by the model, with its initial explanation set
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneratedPhrase {
    #[serde(default, alias = "nativeText")]
    pub native_text: String,
    #[serde(default, alias = "learningText")]
    pub learning_text: String,
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default, alias = "wordExplanations")]
    pub word_explanations: Vec<CandidateExplanation>,
}

/// A learner's answer to be graded
#[derive(Debug, Clone)]
pub struct AnswerCheck {
    /// Text shown to the learner (native language)
    pub prompt_text: String,
    /// Reference translation (learning language)
    pub expected_answer: String,
    pub user_answer: String,
    pub difficulty: Difficulty,
}

/// Grading result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verification {
    pub is_correct: bool,
    pub feedback: String,
    pub accuracy_score: i64,
    pub words_learned: Vec<String>,
    pub words_forgotten: Vec<String>,
}

impl Verification {
    /// Result recorded when the model could not grade the answer
    pub fn fallback() -> Self {
        Self {
            is_correct: false,
            feedback: "The answer could not be verified. Please try again.".to_string(),
            accuracy_score: 0,
            words_learned: Vec::new(),
            words_forgotten: Vec::new(),
        }
    }

    /// Force the score into 0..=100
    pub fn clamped(mut self) -> Self {
        self.accuracy_score = self.accuracy_score.clamp(0, 100);
        self
    }
}

/// On-demand explanation of one word a learner selected
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WordInsight {
    /// Equivalent in the language being learned
    pub translation: String,
    pub explanation: String,
    pub examples: Vec<String>,
    pub grammar_notes: Option<String>,
}

#[async_trait]
pub trait TutorService: ExplanationGenerator {
    /// Propose `request.quantity` new phrases with candidate explanations
    async fn generate_phrases(&self, request: &PhraseRequest) -> Result<Vec<GeneratedPhrase>>;

    /// Grade a learner's translation
    async fn verify_answer(&self, check: &AnswerCheck) -> Result<Verification>;

    /// Explain the grammar of a phrase around one selected word
    async fn explain_grammar(
        &self,
        phrase: &Phrase,
        native_language: &Language,
        learning_language: &Language,
        word: &str,
    ) -> Result<String>;

    /// Explain one selected word of a phrase in the phrase's context
    ///
    /// `position` is the word's index in the sentence, when known.
    async fn explain_word(
        &self,
        phrase: &Phrase,
        native_language: &Language,
        learning_language: &Language,
        word: &str,
        position: Option<usize>,
    ) -> Result<WordInsight>;

    /// Text-to-speech; returns MP3 bytes
    async fn synthesize_speech(&self, text: &str) -> Result<Vec<u8>>;
}
