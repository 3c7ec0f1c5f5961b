use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::Utc;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::attempt::{AttemptResult, PartBreakdown, QuestionResult};
use crate::models::submission::Submission;
use crate::models::test::{Section, Test};
use crate::services::score_service::ScoreService;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerKeyEntry {
    pub question_id: i64,
    pub question_number: i32,
    pub part_number: u8,
    pub correct_answer: String,
    pub explanation: Option<String>,
}

/// Correct options for every question of a test, in question-number order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerKey {
    test_id: Uuid,
    part_numbers: Vec<u8>,
    entries: Vec<AnswerKeyEntry>,
}

impl AnswerKey {
    pub fn from_test(test: &Test) -> Result<Self> {
        test.validate_structure()?;

        let mut entries: Vec<AnswerKeyEntry> = test
            .questions()
            .map(|(part, _, q)| AnswerKeyEntry {
                question_id: q.id,
                question_number: q.number,
                part_number: part.part_number,
                correct_answer: q.correct_answer.clone(),
                explanation: q.explanation.clone(),
            })
            .collect();
        entries.sort_by_key(|e| (e.question_number, e.question_id));

        let mut part_numbers: Vec<u8> = test.parts.iter().map(|p| p.part_number).collect();
        part_numbers.sort_unstable();

        Ok(Self {
            test_id: test.id,
            part_numbers,
            entries,
        })
    }

    pub fn test_id(&self) -> Uuid {
        self.test_id
    }

    /// Part numbers of the test, ascending, including parts without questions.
    pub fn part_numbers(&self) -> &[u8] {
        &self.part_numbers
    }

    pub fn entries(&self) -> &[AnswerKeyEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Per-question outcome of a submission before scaled scoring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradedSubmission {
    pub details: Vec<QuestionResult>,
    pub parts: Vec<PartBreakdown>,
    pub listening_correct: u32,
    pub reading_correct: u32,
}

impl GradedSubmission {
    pub fn correct_count(&self) -> u32 {
        self.listening_correct + self.reading_correct
    }
}

/// Rejects duplicate selections and question ids the key does not know.
fn index_selections<'a>(
    key: &AnswerKey,
    submission: &'a Submission,
) -> Result<HashMap<i64, &'a str>> {
    if submission.test_id != key.test_id {
        return Err(Error::InvalidSubmission(format!(
            "Submission for test {} cannot be scored against test {}",
            submission.test_id, key.test_id
        )));
    }

    let known: HashSet<i64> = key.entries.iter().map(|e| e.question_id).collect();
    let mut selections = HashMap::with_capacity(submission.selections.len());

    for selection in &submission.selections {
        if !known.contains(&selection.question_id) {
            return Err(Error::InvalidSubmission(format!(
                "Question {} does not belong to test {}",
                selection.question_id, key.test_id
            )));
        }
        if selections
            .insert(selection.question_id, selection.selected.as_str())
            .is_some()
        {
            return Err(Error::InvalidSubmission(format!(
                "Question {} was answered more than once",
                selection.question_id
            )));
        }
    }

    Ok(selections)
}

/// Pure grading of a submission against an answer key. Unanswered questions
/// are graded incorrect; labels compare exactly.
pub fn grade(key: &AnswerKey, submission: &Submission) -> Result<GradedSubmission> {
    let selections = index_selections(key, submission)?;

    let mut details = Vec::with_capacity(key.len());
    let mut per_part: BTreeMap<u8, PartBreakdown> = key
        .part_numbers
        .iter()
        .map(|&part_number| {
            (
                part_number,
                PartBreakdown {
                    part_number,
                    correct: 0,
                    total: 0,
                },
            )
        })
        .collect();
    let mut listening_correct = 0;
    let mut reading_correct = 0;

    for entry in &key.entries {
        let selected = selections.get(&entry.question_id).map(|s| s.to_string());
        let is_correct = selected.as_deref() == Some(entry.correct_answer.as_str());
        let section = Section::of_part(entry.part_number);

        let part = per_part.entry(entry.part_number).or_insert(PartBreakdown {
            part_number: entry.part_number,
            correct: 0,
            total: 0,
        });
        part.total += 1;

        if is_correct {
            part.correct += 1;
            match section {
                Section::Listening => listening_correct += 1,
                Section::Reading => reading_correct += 1,
            }
        }

        details.push(QuestionResult {
            question_id: entry.question_id,
            question_number: entry.question_number,
            part_number: entry.part_number,
            section,
            selected,
            correct_answer: entry.correct_answer.clone(),
            is_correct,
            explanation: entry.explanation.clone(),
        });
    }

    Ok(GradedSubmission {
        details,
        parts: per_part.into_values().collect(),
        listening_correct,
        reading_correct,
    })
}

#[derive(Clone)]
pub struct ScoringService {
    scores: ScoreService,
}

impl ScoringService {
    pub fn new(scores: ScoreService) -> Self {
        Self { scores }
    }

    pub fn scores(&self) -> &ScoreService {
        &self.scores
    }

    /// Grades the submission and converts the section counts to scaled scores.
    /// Nothing is produced when the submission is rejected.
    pub fn score_submission(&self, test: &Test, submission: &Submission) -> Result<AttemptResult> {
        let key = AnswerKey::from_test(test)?;
        let graded = grade(&key, submission)?;
        let report = self
            .scores
            .calculate_score(graded.listening_correct, graded.reading_correct);

        tracing::info!(
            test_id = %test.id,
            questions = key.len(),
            answered = submission.selections.len(),
            listening_correct = graded.listening_correct,
            reading_correct = graded.reading_correct,
            total_score = report.total_score,
            "Scored submission"
        );

        Ok(AttemptResult {
            id: Uuid::new_v4(),
            test_id: test.id,
            total_score: report.total_score,
            listening_score: report.listening_score(),
            reading_score: report.reading_score(),
            listening_correct: graded.listening_correct,
            reading_correct: graded.reading_correct,
            correct_count: graded.correct_count(),
            total_questions: key.len() as u32,
            details: graded.details,
            parts: graded.parts,
            created_at: Utc::now(),
        })
    }
}
