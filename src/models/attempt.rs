use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::test::Section;

/// The immutable outcome of one scored submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptResult {
    pub id: Uuid,
    pub test_id: Uuid,
    pub total_score: u32,
    pub listening_score: u32,
    pub reading_score: u32,
    pub listening_correct: u32,
    pub reading_correct: u32,
    pub correct_count: u32,
    pub total_questions: u32,
    pub details: Vec<QuestionResult>,
    pub parts: Vec<PartBreakdown>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionResult {
    pub question_id: i64,
    pub question_number: i32,
    pub part_number: u8,
    pub section: Section,
    /// `None` when the question was left unanswered.
    pub selected: Option<String>,
    pub correct_answer: String,
    pub is_correct: bool,
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartBreakdown {
    pub part_number: u8,
    pub correct: u32,
    pub total: u32,
}
