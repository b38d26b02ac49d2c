//! OpenAI API client
//!
//! Chat completions in JSON mode for explanations, phrases, grading and
//! grammar; `/audio/speech` for text-to-speech. Implements
//! [`TutorService`] and [`ExplanationGenerator`].

use async_trait::async_trait;
use lingo_common::config::OpenAiConfig;
use lingo_common::{
    CandidateExplanation, ExplanationGenerator, Language, Phrase, PhraseContext,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::fmt::Write as _;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

use super::tutor::{
    AnswerCheck, GeneratedPhrase, PhraseRequest, TutorService, Verification, WordInsight,
};

const USER_AGENT: &str = concat!("lingo-server/", env!("CARGO_PKG_VERSION"));
const JSON_SYSTEM_PROMPT: &str = "You are an assistant that always answers with valid JSON and no additional text.";

const EXPLANATION_TEMPERATURE: f32 = 0.3;
const PHRASE_TEMPERATURE: f32 = 0.8;
const GRADING_TEMPERATURE: f32 = 0.3;

/// Existing phrases listed in a generation prompt
const MAX_AVOID_LISTED: usize = 20;

/// OpenAI client errors
#[derive(Debug, Error)]
pub enum OpenAiError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("API error {0}: {1}")]
    ApiError(u16, String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Empty response from model")]
    EmptyResponse,
}

impl From<OpenAiError> for lingo_common::Error {
    fn from(err: OpenAiError) -> Self {
        lingo_common::Error::Generator(err.to_string())
    }
}

/// OpenAI API client
#[derive(Clone)]
pub struct OpenAiClient {
    http_client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    tts_model: String,
    tts_voice: String,
}

impl OpenAiClient {
    pub fn new(api_key: String, config: &OpenAiConfig) -> Result<Self, OpenAiError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| OpenAiError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            tts_model: config.tts_model.clone(),
            tts_voice: config.tts_voice.clone(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// One JSON-mode chat completion, returning the message content
    async fn chat_json(&self, user_prompt: &str, temperature: f32) -> Result<String, OpenAiError> {
        let body = serde_json::json!({
            "model": &self.model,
            "messages": [
                {"role": "system", "content": JSON_SYSTEM_PROMPT},
                {"role": "user", "content": user_prompt}
            ],
            "temperature": temperature,
            "response_format": {"type": "json_object"}
        });

        let response = self
            .http_client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| OpenAiError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(OpenAiError::ApiError(status.as_u16(), error_text));
        }

        #[derive(Deserialize)]
        struct Message {
            content: Option<String>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: Message,
        }
        #[derive(Deserialize)]
        struct ApiResponse {
            choices: Vec<Choice>,
        }

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| OpenAiError::ParseError(e.to_string()))?;

        api_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(OpenAiError::EmptyResponse)
    }

    /// Chat completion parsed into `T`
    async fn chat_parsed<T: DeserializeOwned>(
        &self,
        user_prompt: &str,
        temperature: f32,
    ) -> Result<T, OpenAiError> {
        let content = self.chat_json(user_prompt, temperature).await?;
        debug!("OpenAI response: {}", preview(&content, 1000));
        serde_json::from_str(&content).map_err(|e| OpenAiError::ParseError(e.to_string()))
    }
}

/// Leading part of a response for debug logs
fn preview(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }
    let end = (0..=max_bytes).rev().find(|&i| text.is_char_boundary(i)).unwrap_or(0);
    &text[..end]
}

fn explanation_prompt(words: &[String], context: &PhraseContext) -> String {
    let native = &context.native_language.name;
    let learning = &context.learning_language.name;

    let mut prompt = format!(
        "You are an expert language teacher. Write explanations for the following {learning} words \
         as they are used in this sentence.\n\n\
         Sentence: \"{}\"\n\
         Expected answer: \"{}\"\n",
        context.sentence_text, context.expected_answer
    );
    if let Some(note) = &context.explanation_context {
        let _ = writeln!(prompt, "Context: \"{}\"", note);
    }
    let _ = write!(
        prompt,
        "Learner's native language: {native}\nLanguage being learned: {learning}\n\n\
         Words that need an explanation (already normalized):\n"
    );
    for (i, word) in words.iter().enumerate() {
        let _ = writeln!(prompt, "{}. \"{}\"", i + 1, word);
    }
    let _ = write!(
        prompt,
        "\nFor EACH word provide:\n\
         - word: the exact word (lower case, no punctuation)\n\
         - translation: translation into {native}\n\
         - explanation: a detailed explanation in {native} of the word's grammatical function in \
           this sentence, why it sits in this position, and how it relates to the other words. \
           Do not just restate the translation.\n\
         - examples: 2-3 objects with learningText ({learning}) and nativeText ({native})\n\n\
         Answer ONLY with JSON in exactly this format:\n\
         {{\"wordExplanations\": [{{\"word\": \"...\", \"translation\": \"...\", \"explanation\": \"...\", \
         \"examples\": [{{\"learningText\": \"...\", \"nativeText\": \"...\"}}]}}]}}\n\n\
         Explain ALL of the words listed above and no others."
    );
    prompt
}

fn phrase_prompt(request: &PhraseRequest) -> String {
    let native = &request.native_language.name;
    let learning = &request.learning_language.name;
    let level = request.cefr_level;
    let category = request.category.as_deref().unwrap_or("everyday life");

    let mut prompt = format!(
        "You are an expert language teacher. Generate {} phrases for translation practice.\n\n\
         Native language: {native}\n\
         Language being learned: {learning}\n\
         CEFR level: {level}\n\
         Topic: {category}\n\n\
         REQUIREMENTS:\n\
         - Phrases must suit level {level} and relate to the topic \"{category}\"\n\
         - Vary grammatical structure and vocabulary\n\
         - Translations must be accurate and natural\n\
         - For every phrase, explain each word of the {learning} text that is longer than two \
           letters, plus short question words, pronouns, articles, auxiliaries, conjunctions and \
           prepositions. Explanations are written in {native}.\n\n",
        request.quantity
    );

    if !request.avoid.is_empty() {
        prompt.push_str("EXISTING PHRASES (DO NOT REPEAT):\n");
        for text in request.avoid.iter().take(MAX_AVOID_LISTED) {
            let _ = writeln!(prompt, "- \"{}\"", text);
        }
        prompt.push('\n');
    }

    let _ = write!(
        prompt,
        "Answer ONLY with JSON in exactly this format:\n\
         {{\"phrases\": [{{\"nativeText\": \"phrase in {native}\", \"learningText\": \"translation in {learning}\", \
         \"context\": \"short usage note or null\", \
         \"wordExplanations\": [{{\"word\": \"...\", \"translation\": \"...\", \"explanation\": \"...\", \
         \"examples\": [{{\"learningText\": \"...\", \"nativeText\": \"...\"}}]}}]}}]}}\n\n\
         Generate exactly {} new phrases that are not in the existing list.",
        request.quantity
    );
    prompt
}

fn grading_prompt(check: &AnswerCheck) -> String {
    format!(
        "You are an expert language teacher. Decide whether the learner's answer is correct by \
         comparing it with the expected answer.\n\n\
         Original phrase: \"{}\"\n\
         Expected answer: \"{}\"\n\
         Learner's answer: \"{}\"\n\
         Difficulty: {}\n\n\
         Consider grammar, meaning, acceptable variations (synonyms, other valid structures) and \
         minor versus serious mistakes.\n\n\
         Answer ONLY with JSON in exactly this format:\n\
         {{\"isCorrect\": true, \"feedback\": \"detailed explanation\", \"accuracyScore\": 0, \
         \"wordsLearned\": [\"word\"], \"wordsForgotten\": [\"word\"]}}\n\n\
         Mark isCorrect true when the answer is correct or very close. accuracyScore: 100 perfect, \
         80-99 very good with small mistakes, 50-79 acceptable with mistakes, 0-49 incorrect. \
         wordsLearned lists new words used correctly; wordsForgotten lists words used incorrectly.",
        check.prompt_text, check.expected_answer, check.user_answer, check.difficulty
    )
}

fn grammar_prompt(phrase: &Phrase, native: &Language, learning: &Language, word: &str) -> String {
    format!(
        "You are a grammar teacher and an expert in {l} ({lc}).\n\n\
         Analyse this sentence and explain its {l} grammar:\n\n\
         Phrase in {n}: \"{}\"\n\
         Phrase in {l}: \"{}\"\n\
         Selected word: \"{word}\"\n\n\
         Explain the full grammatical structure, the rules applied, the word order, any \
         conjugation, case, gender or number, and how \"{word}\" relates grammatically to the rest \
         of the sentence. Write the explanation in {n}.\n\n\
         Answer ONLY with JSON in exactly this format:\n\
         {{\"grammarExplanation\": \"...\"}}",
        phrase.native_text,
        phrase.learning_text,
        l = learning.name,
        lc = learning.code,
        n = native.name,
    )
}

fn word_prompt(
    phrase: &Phrase,
    native: &Language,
    learning: &Language,
    word: &str,
    position: Option<usize>,
) -> String {
    let position = position.map_or_else(|| "not given".to_string(), |p| p.to_string());
    format!(
        "You are an expert language teacher. Explain the meaning of the word \"{word}\" in the \
         context of this phrase.\n\n\
         Phrase in {n}: \"{}\"\n\
         Phrase in {l}: \"{}\"\n\
         Selected word: \"{word}\"\n\
         Word position in the phrase: {position}\n\n\
         Provide the equivalent of \"{word}\" in {l}, an explanation in {n} of what the word means \
         in this specific phrase, usage examples if relevant, and grammar notes if any apply.\n\n\
         Answer ONLY with JSON in exactly this format:\n\
         {{\"translation\": \"...\", \"explanation\": \"...\", \"examples\": [\"...\"] or null, \
         \"grammarNotes\": \"...\" or null}}",
        phrase.native_text,
        phrase.learning_text,
        l = learning.name,
        n = native.name,
    )
}

#[derive(Deserialize)]
struct ExplanationsPayload {
    #[serde(default, alias = "wordExplanations")]
    word_explanations: Vec<CandidateExplanation>,
}

#[derive(Deserialize)]
struct PhrasesPayload {
    phrases: Vec<GeneratedPhrase>,
}

/// Grading output; the model sends nulls and fractional scores
#[derive(Deserialize)]
struct GradingPayload {
    #[serde(default, alias = "isCorrect")]
    is_correct: bool,
    #[serde(default)]
    feedback: Option<String>,
    #[serde(default, alias = "accuracyScore")]
    accuracy_score: Option<f64>,
    #[serde(default, alias = "wordsLearned")]
    words_learned: Option<Vec<String>>,
    #[serde(default, alias = "wordsForgotten")]
    words_forgotten: Option<Vec<String>>,
}

impl From<GradingPayload> for Verification {
    fn from(payload: GradingPayload) -> Self {
        Verification {
            is_correct: payload.is_correct,
            feedback: payload.feedback.unwrap_or_default(),
            accuracy_score: payload.accuracy_score.unwrap_or(0.0).round() as i64,
            words_learned: payload.words_learned.unwrap_or_default(),
            words_forgotten: payload.words_forgotten.unwrap_or_default(),
        }
        .clamped()
    }
}

#[derive(Deserialize)]
struct GrammarPayload {
    #[serde(default, alias = "grammarExplanation")]
    grammar_explanation: Option<String>,
}

#[derive(Deserialize)]
struct WordPayload {
    #[serde(default)]
    translation: Option<String>,
    #[serde(default)]
    explanation: Option<String>,
    #[serde(default)]
    examples: Option<Vec<String>>,
    #[serde(default, alias = "grammarNotes")]
    grammar_notes: Option<String>,
}

impl TryFrom<WordPayload> for WordInsight {
    type Error = OpenAiError;

    fn try_from(payload: WordPayload) -> Result<Self, Self::Error> {
        let explanation = payload
            .explanation
            .filter(|e| !e.trim().is_empty())
            .ok_or_else(|| OpenAiError::ParseError("missing explanation".to_string()))?;

        Ok(WordInsight {
            translation: payload.translation.unwrap_or_default(),
            explanation,
            examples: payload.examples.unwrap_or_default(),
            grammar_notes: payload.grammar_notes.filter(|g| !g.trim().is_empty()),
        })
    }
}

#[async_trait]
impl ExplanationGenerator for OpenAiClient {
    async fn generate(
        &self,
        words: &[String],
        context: &PhraseContext,
    ) -> lingo_common::Result<Vec<CandidateExplanation>> {
        let prompt = explanation_prompt(words, context);
        let payload: ExplanationsPayload = self.chat_parsed(&prompt, EXPLANATION_TEMPERATURE).await?;

        info!(
            phrase_id = %context.phrase_id,
            requested = words.len(),
            received = payload.word_explanations.len(),
            "Received generated explanations"
        );

        Ok(payload.word_explanations)
    }
}

#[async_trait]
impl TutorService for OpenAiClient {
    async fn generate_phrases(&self, request: &PhraseRequest) -> lingo_common::Result<Vec<GeneratedPhrase>> {
        let prompt = phrase_prompt(request);
        let payload: PhrasesPayload = self.chat_parsed(&prompt, PHRASE_TEMPERATURE).await?;

        info!(
            requested = request.quantity,
            received = payload.phrases.len(),
            cefr = %request.cefr_level,
            "Received generated phrases"
        );

        Ok(payload.phrases)
    }

    async fn verify_answer(&self, check: &AnswerCheck) -> lingo_common::Result<Verification> {
        let payload: GradingPayload = self
            .chat_parsed(&grading_prompt(check), GRADING_TEMPERATURE)
            .await?;
        Ok(payload.into())
    }

    async fn explain_grammar(
        &self,
        phrase: &Phrase,
        native_language: &Language,
        learning_language: &Language,
        word: &str,
    ) -> lingo_common::Result<String> {
        let prompt = grammar_prompt(phrase, native_language, learning_language, word);
        let payload: GrammarPayload = self.chat_parsed(&prompt, EXPLANATION_TEMPERATURE).await?;

        payload
            .grammar_explanation
            .filter(|g| !g.trim().is_empty())
            .ok_or_else(|| OpenAiError::ParseError("missing grammarExplanation".to_string()).into())
    }

    async fn explain_word(
        &self,
        phrase: &Phrase,
        native_language: &Language,
        learning_language: &Language,
        word: &str,
        position: Option<usize>,
    ) -> lingo_common::Result<WordInsight> {
        let prompt = word_prompt(phrase, native_language, learning_language, word, position);
        let payload: WordPayload = self.chat_parsed(&prompt, EXPLANATION_TEMPERATURE).await?;
        Ok(WordInsight::try_from(payload)?)
    }

    async fn synthesize_speech(&self, text: &str) -> lingo_common::Result<Vec<u8>> {
        let response = self
            .http_client
            .post(format!("{}/audio/speech", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({
                "model": &self.tts_model,
                "voice": &self.tts_voice,
                "input": text,
                "response_format": "mp3"
            }))
            .send()
            .await
            .map_err(|e| OpenAiError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(OpenAiError::ApiError(status.as_u16(), error_text).into());
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| OpenAiError::NetworkError(e.to_string()))?;

        debug!(bytes = bytes.len(), "Synthesized speech");
        Ok(bytes.to_vec())
    }
}
