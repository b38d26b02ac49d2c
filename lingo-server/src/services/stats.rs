//! Learner statistics

use chrono::{DateTime, Utc};
use lingo_common::db::progress::ProgressEntry;
use lingo_common::Difficulty;
use serde::Serialize;
use std::collections::HashSet;
use uuid::Uuid;

/// Attempts listed under `recent_progress`
pub const RECENT_ATTEMPTS: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DifficultyCount {
    pub difficulty: Difficulty,
    pub total: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecentAttempt {
    pub id: Uuid,
    pub phrase: String,
    pub user_answer: String,
    pub is_correct: bool,
    pub accuracy_score: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserStats {
    pub total_attempts: usize,
    pub correct_attempts: usize,
    /// Percentage of correct attempts, 2 decimals
    pub accuracy: f64,
    /// Mean accuracy score, 2 decimals
    pub average_score: f64,
    /// Distinct phrases answered correctly at least once
    pub learned_phrases_count: usize,
    pub words_learned: Vec<String>,
    pub words_forgotten: Vec<String>,
    pub phrases_by_difficulty: Vec<DifficultyCount>,
    pub recent_progress: Vec<RecentAttempt>,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Union of word lists in first-seen order
fn union_words<'a>(lists: impl Iterator<Item = &'a Vec<String>>) -> Vec<String> {
    let mut seen: HashSet<&String> = HashSet::new();
    lists
        .flatten()
        .filter(|w| seen.insert(*w))
        .cloned()
        .collect()
}

/// Compute statistics from a user's attempts (newest first)
pub fn compute_stats(entries: &[ProgressEntry], phrases_by_difficulty: Vec<(Difficulty, i64)>) -> UserStats {
    let total_attempts = entries.len();
    let correct: Vec<&ProgressEntry> = entries.iter().filter(|e| e.progress.is_correct).collect();
    let correct_attempts = correct.len();

    let (accuracy, average_score) = if total_attempts == 0 {
        (0.0, 0.0)
    } else {
        let score_sum: i64 = entries.iter().map(|e| e.progress.accuracy_score).sum();
        (
            round2(correct_attempts as f64 / total_attempts as f64 * 100.0),
            round2(score_sum as f64 / total_attempts as f64),
        )
    };

    let learned_phrases_count = correct
        .iter()
        .map(|e| e.progress.phrase_id)
        .collect::<HashSet<_>>()
        .len();

    UserStats {
        total_attempts,
        correct_attempts,
        accuracy,
        average_score,
        learned_phrases_count,
        words_learned: union_words(entries.iter().map(|e| &e.progress.words_learned)),
        words_forgotten: union_words(entries.iter().map(|e| &e.progress.words_forgotten)),
        phrases_by_difficulty: phrases_by_difficulty
            .into_iter()
            .map(|(difficulty, total)| DifficultyCount { difficulty, total })
            .collect(),
        recent_progress: entries
            .iter()
            .take(RECENT_ATTEMPTS)
            .map(|e| RecentAttempt {
                id: e.progress.id,
                phrase: e.phrase_native_text.clone(),
                user_answer: e.progress.user_answer.clone(),
                is_correct: e.progress.is_correct,
                accuracy_score: e.progress.accuracy_score,
                created_at: e.progress.created_at,
            })
            .collect(),
    }
}
