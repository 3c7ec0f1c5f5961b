use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::attempt::{AttemptResult, PartBreakdown, QuestionResult};
use crate::models::question::{Answer, Question};
use crate::models::score_conversion::ScoreConversionEntry;
use crate::models::test::{Group, Part, Test};

/// Storage the scoring and explanation flows read content from and hand
/// finished attempts to.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContentRepository: Send + Sync {
    /// Full content tree including correct-option labels.
    async fn get_test_with_answer_key(&self, test_id: Uuid) -> Result<Test>;

    async fn get_score_conversion_table(&self) -> Result<Vec<ScoreConversionEntry>>;

    async fn save_attempt(&self, attempt: &AttemptResult) -> Result<()>;

    async fn get_attempt(&self, attempt_id: Uuid) -> Result<AttemptResult>;
}

#[derive(Clone)]
pub struct PgContentRepository {
    pool: PgPool,
}

impl PgContentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct TestRow {
    id: Uuid,
    title: String,
    duration_minutes: i32,
}

#[derive(FromRow)]
struct PartRow {
    id: i64,
    name: String,
    part_number: i16,
}

#[derive(FromRow)]
struct GroupRow {
    id: i64,
    part_id: i64,
    passage: Option<String>,
    image_url: Option<String>,
    audio_url: Option<String>,
    transcript: Option<String>,
}

#[derive(FromRow)]
struct QuestionRow {
    id: i64,
    group_id: i64,
    number: i32,
    content: String,
    correct_answer: String,
    explanation: Option<String>,
    transcript: Option<String>,
}

#[derive(FromRow)]
struct AnswerRow {
    question_id: i64,
    label: String,
    content: String,
}

#[derive(FromRow)]
struct ScoreConversionRow {
    correct_count: i32,
    listening_score: i32,
    reading_score: i32,
}

#[derive(FromRow)]
struct AttemptRow {
    id: Uuid,
    test_id: Uuid,
    total_score: i32,
    listening_score: i32,
    reading_score: i32,
    listening_correct: i32,
    reading_correct: i32,
    correct_count: i32,
    total_questions: i32,
    details: Json<Vec<QuestionResult>>,
    parts: Json<Vec<PartBreakdown>>,
    created_at: DateTime<Utc>,
}

impl From<AttemptRow> for AttemptResult {
    fn from(row: AttemptRow) -> Self {
        Self {
            id: row.id,
            test_id: row.test_id,
            total_score: row.total_score.max(0) as u32,
            listening_score: row.listening_score.max(0) as u32,
            reading_score: row.reading_score.max(0) as u32,
            listening_correct: row.listening_correct.max(0) as u32,
            reading_correct: row.reading_correct.max(0) as u32,
            correct_count: row.correct_count.max(0) as u32,
            total_questions: row.total_questions.max(0) as u32,
            details: row.details.0,
            parts: row.parts.0,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl ContentRepository for PgContentRepository {
    async fn get_test_with_answer_key(&self, test_id: Uuid) -> Result<Test> {
        let test = sqlx::query_as::<_, TestRow>(
            r#"SELECT id, title, duration_minutes FROM tests WHERE id = $1"#,
        )
        .bind(test_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Test {} not found", test_id)))?;

        let parts = sqlx::query_as::<_, PartRow>(
            r#"SELECT id, name, part_number FROM parts WHERE test_id = $1 ORDER BY part_number"#,
        )
        .bind(test_id)
        .fetch_all(&self.pool)
        .await?;

        let groups = sqlx::query_as::<_, GroupRow>(
            r#"
            SELECT g.id, g.part_id, g.passage, g.image_url, g.audio_url, g.transcript
            FROM question_groups g
            JOIN parts p ON p.id = g.part_id
            WHERE p.test_id = $1
            ORDER BY g.part_id, g.position, g.id
            "#,
        )
        .bind(test_id)
        .fetch_all(&self.pool)
        .await?;

        let questions = sqlx::query_as::<_, QuestionRow>(
            r#"
            SELECT q.id, q.group_id, q.number, q.content, q.correct_answer, q.explanation, q.transcript
            FROM questions q
            JOIN question_groups g ON g.id = q.group_id
            JOIN parts p ON p.id = g.part_id
            WHERE p.test_id = $1
            ORDER BY q.number
            "#,
        )
        .bind(test_id)
        .fetch_all(&self.pool)
        .await?;

        let answers = sqlx::query_as::<_, AnswerRow>(
            r#"
            SELECT a.question_id, a.label, a.content
            FROM answers a
            JOIN questions q ON q.id = a.question_id
            JOIN question_groups g ON g.id = q.group_id
            JOIN parts p ON p.id = g.part_id
            WHERE p.test_id = $1
            ORDER BY a.question_id, a.label
            "#,
        )
        .bind(test_id)
        .fetch_all(&self.pool)
        .await?;

        assemble_test(test, parts, groups, questions, answers)
    }

    async fn get_score_conversion_table(&self) -> Result<Vec<ScoreConversionEntry>> {
        let rows = sqlx::query_as::<_, ScoreConversionRow>(
            r#"SELECT correct_count, listening_score, reading_score FROM score_conversions ORDER BY correct_count"#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| ScoreConversionEntry {
                correct_count: r.correct_count.max(0) as u32,
                listening_score: r.listening_score.max(0) as u32,
                reading_score: r.reading_score.max(0) as u32,
            })
            .collect())
    }

    async fn save_attempt(&self, attempt: &AttemptResult) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO attempt_results (
                id, test_id, total_score, listening_score, reading_score,
                listening_correct, reading_correct, correct_count, total_questions,
                details, parts, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(attempt.id)
        .bind(attempt.test_id)
        .bind(attempt.total_score as i32)
        .bind(attempt.listening_score as i32)
        .bind(attempt.reading_score as i32)
        .bind(attempt.listening_correct as i32)
        .bind(attempt.reading_correct as i32)
        .bind(attempt.correct_count as i32)
        .bind(attempt.total_questions as i32)
        .bind(Json(&attempt.details))
        .bind(Json(&attempt.parts))
        .bind(attempt.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_attempt(&self, attempt_id: Uuid) -> Result<AttemptResult> {
        let row = sqlx::query_as::<_, AttemptRow>(r#"SELECT * FROM attempt_results WHERE id = $1"#)
            .bind(attempt_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Attempt {} not found", attempt_id)))?;

        Ok(row.into())
    }
}

fn assemble_test(
    test: TestRow,
    parts: Vec<PartRow>,
    groups: Vec<GroupRow>,
    questions: Vec<QuestionRow>,
    answers: Vec<AnswerRow>,
) -> Result<Test> {
    let mut answers_by_question: HashMap<i64, Vec<Answer>> = HashMap::new();
    for a in answers {
        answers_by_question.entry(a.question_id).or_default().push(Answer {
            label: a.label,
            content: a.content,
        });
    }

    let mut questions_by_group: HashMap<i64, Vec<Question>> = HashMap::new();
    for q in questions {
        questions_by_group.entry(q.group_id).or_default().push(Question {
            id: q.id,
            number: q.number,
            content: q.content,
            correct_answer: q.correct_answer,
            explanation: q.explanation,
            transcript: q.transcript,
            answers: answers_by_question.remove(&q.id).unwrap_or_default(),
        });
    }

    let mut groups_by_part: HashMap<i64, Vec<Group>> = HashMap::new();
    for g in groups {
        groups_by_part.entry(g.part_id).or_default().push(Group {
            id: g.id,
            passage: g.passage,
            image_url: g.image_url,
            audio_url: g.audio_url,
            transcript: g.transcript,
            questions: questions_by_group.remove(&g.id).unwrap_or_default(),
        });
    }

    let parts = parts
        .into_iter()
        .map(|p| {
            let part_number = u8::try_from(p.part_number).map_err(|_| {
                Error::Internal(format!("Part {} has invalid part number {}", p.id, p.part_number))
            })?;
            Ok(Part {
                id: p.id,
                name: p.name,
                part_number,
                groups: groups_by_part.remove(&p.id).unwrap_or_default(),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Test {
        id: test.id,
        title: test.title,
        duration_minutes: test.duration_minutes,
        parts,
    })
}
