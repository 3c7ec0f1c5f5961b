use serde::{Deserialize, Serialize};

/// A single item of a test. `number` is the global question number
/// (1..=200 on a full test) and drives result ordering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,
    pub number: i32,
    #[serde(default)]
    pub content: String,
    pub correct_answer: String,
    pub explanation: Option<String>,
    /// Overrides the group transcript when present.
    pub transcript: Option<String>,
    pub answers: Vec<Answer>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub label: String,
    pub content: String,
}

impl Question {
    pub fn answer(&self, label: &str) -> Option<&Answer> {
        self.answers.iter().find(|a| a.label == label)
    }
}

/// Everything the explanation pipeline needs to know about one question,
/// resolved from its position in the test tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionContext {
    pub question: Question,
    pub part_number: u8,
    pub transcript: Option<String>,
    pub passage: Option<String>,
}
