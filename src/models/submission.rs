use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A user's selections for one test. Unanswered questions are absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    pub test_id: Uuid,
    pub selections: Vec<Selection>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub question_id: i64,
    pub selected: String,
}

impl Submission {
    pub fn new(test_id: Uuid) -> Self {
        Self {
            test_id,
            selections: Vec::new(),
        }
    }

    pub fn select(mut self, question_id: i64, selected: impl Into<String>) -> Self {
        self.selections.push(Selection {
            question_id,
            selected: selected.into(),
        });
        self
    }
}
