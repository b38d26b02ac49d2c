//! Database models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Language {
    pub id: Uuid,
    pub code: String,
    pub name: String,
}

/// CEFR proficiency level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CefrLevel {
    A1,
    A2,
    B1,
    B2,
    C1,
    C2,
}

impl CefrLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            CefrLevel::A1 => "A1",
            CefrLevel::A2 => "A2",
            CefrLevel::B1 => "B1",
            CefrLevel::B2 => "B2",
            CefrLevel::C1 => "C1",
            CefrLevel::C2 => "C2",
        }
    }

    /// Coarse difficulty bucket for a CEFR level
    pub fn difficulty(&self) -> Difficulty {
        match self {
            CefrLevel::A1 | CefrLevel::A2 => Difficulty::Beginner,
            CefrLevel::B1 | CefrLevel::B2 => Difficulty::Intermediate,
            CefrLevel::C1 | CefrLevel::C2 => Difficulty::Advanced,
        }
    }
}

impl fmt::Display for CefrLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CefrLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "A1" => Ok(CefrLevel::A1),
            "A2" => Ok(CefrLevel::A2),
            "B1" => Ok(CefrLevel::B1),
            "B2" => Ok(CefrLevel::B2),
            "C1" => Ok(CefrLevel::C1),
            "C2" => Ok(CefrLevel::C2),
            other => Err(Error::InvalidInput(format!(
                "Invalid CEFR level '{}': must be A1, A2, B1, B2, C1 or C2",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Beginner => "BEGINNER",
            Difficulty::Intermediate => "INTERMEDIATE",
            Difficulty::Advanced => "ADVANCED",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "BEGINNER" => Ok(Difficulty::Beginner),
            "INTERMEDIATE" => Ok(Difficulty::Intermediate),
            "ADVANCED" => Ok(Difficulty::Advanced),
            other => Err(Error::InvalidInput(format!("Invalid difficulty '{}'", other))),
        }
    }
}

/// A practice phrase in one native/learning language pair
///
/// `learning_text` is the sentence whose words carry explanations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Phrase {
    pub id: Uuid,
    pub native_language_id: Uuid,
    pub learning_language_id: Uuid,
    pub native_text: String,
    pub learning_text: String,
    /// Optional situation or usage note given to the explanation generator
    pub context: Option<String>,
    pub difficulty: Difficulty,
    pub cefr_level: CefrLevel,
    pub category: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Fields required to insert a phrase
#[derive(Debug, Clone)]
pub struct NewPhrase {
    pub native_language_id: Uuid,
    pub learning_language_id: Uuid,
    pub native_text: String,
    pub learning_text: String,
    pub context: Option<String>,
    pub difficulty: Difficulty,
    pub cefr_level: CefrLevel,
    pub category: Option<String>,
}

/// Example sentence pair attached to a word explanation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamplePair {
    #[serde(default, alias = "learningText")]
    pub learning_text: String,
    #[serde(default, alias = "nativeText")]
    pub native_text: String,
}

/// Stored explanation of one normalized word of a phrase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WordExplanation {
    pub id: Uuid,
    pub phrase_id: Uuid,
    pub word: String,
    pub native_language_id: Uuid,
    pub learning_language_id: Uuid,
    pub translation: String,
    pub explanation: String,
    pub examples: Vec<ExamplePair>,
    pub grammar_explanation: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    User,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::User => "USER",
            UserRole::Admin => "ADMIN",
        }
    }
}

impl FromStr for UserRole {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "USER" => Ok(UserRole::User),
            "ADMIN" => Ok(UserRole::Admin),
            other => Err(Error::InvalidInput(format!("Invalid role '{}'", other))),
        }
    }
}

/// Learner profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub role: UserRole,
    /// Language code, e.g. "es"
    pub native_language: String,
    /// Language code, e.g. "de"
    pub learning_language: String,
    pub created_at: DateTime<Utc>,
}

/// One answer attempt by a user on a phrase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhraseProgress {
    pub id: Uuid,
    pub user_id: Uuid,
    pub phrase_id: Uuid,
    pub user_answer: String,
    pub ai_feedback: String,
    pub is_correct: bool,
    pub accuracy_score: i64,
    pub words_learned: Vec<String>,
    pub words_forgotten: Vec<String>,
    pub created_at: DateTime<Utc>,
}
