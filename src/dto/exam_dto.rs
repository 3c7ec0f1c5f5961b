use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::attempt::AttemptResult;
use crate::models::submission::{Selection, Submission};
use crate::services::explanation_service::ExplanationOutcome;
use crate::services::score_service::ScoreReport;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SubmitAnswer {
    pub question_id: i64,
    #[validate(length(min = 1, max = 1))]
    pub selected: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SubmitTestRequest {
    #[validate(nested)]
    pub answers: Vec<SubmitAnswer>,
}

impl SubmitTestRequest {
    pub fn into_submission(self, test_id: Uuid) -> Submission {
        Submission {
            test_id,
            selections: self
                .answers
                .into_iter()
                .map(|a| Selection {
                    question_id: a.question_id,
                    selected: a.selected,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptDetailResponse {
    pub attempt: AttemptResult,
    pub score: ScoreReport,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreQuery {
    pub listening: u32,
    pub reading: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ExplanationsRequest {
    #[validate(length(min = 1, max = 50))]
    pub question_ids: Vec<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplanationResponse {
    pub question_id: i64,
    pub status: String,
    pub short: String,
    pub full: String,
}

impl ExplanationResponse {
    pub fn new(question_id: i64, outcome: ExplanationOutcome) -> Self {
        let status = if outcome.is_ok() { "ok" } else { "failed" };
        let pair = outcome.into_pair();
        Self {
            question_id,
            status: status.to_string(),
            short: pair.short,
            full: pair.full,
        }
    }
}
