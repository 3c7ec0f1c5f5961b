use axum::{
    extract::{Path, State},
    response::{IntoResponse, Json, Response},
};
use uuid::Uuid;
use validator::Validate;

use crate::dto::exam_dto::{ExplanationResponse, ExplanationsRequest};
use crate::error::Error;
use crate::models::question::QuestionContext;
use crate::models::test::Test;
use crate::AppState;

fn context_for(test: &Test, question_id: i64) -> crate::error::Result<QuestionContext> {
    test.question_context(question_id).ok_or_else(|| {
        Error::NotFound(format!(
            "Question {} not found in test {}",
            question_id, test.id
        ))
    })
}

#[axum::debug_handler]
pub async fn explain_question(
    State(state): State<AppState>,
    Path((test_id, question_id)): Path<(Uuid, i64)>,
) -> crate::error::Result<Response> {
    let test = state.repository.get_test_with_answer_key(test_id).await?;
    let ctx = context_for(&test, question_id)?;

    let outcome = state.explanation_service.generate_explanation(&ctx).await;
    Ok(Json(ExplanationResponse::new(question_id, outcome)).into_response())
}

#[axum::debug_handler]
pub async fn explain_questions(
    State(state): State<AppState>,
    Path(test_id): Path<Uuid>,
    Json(req): Json<ExplanationsRequest>,
) -> crate::error::Result<Response> {
    req.validate()?;
    let test = state.repository.get_test_with_answer_key(test_id).await?;
    let contexts = req
        .question_ids
        .iter()
        .map(|id| context_for(&test, *id))
        .collect::<crate::error::Result<Vec<_>>>()?;

    tracing::info!(test_id = %test_id, count = contexts.len(), "Generating explanations");
    let results: Vec<ExplanationResponse> = state
        .explanation_service
        .explain_many(contexts)
        .await
        .into_iter()
        .map(|(id, outcome)| ExplanationResponse::new(id, outcome))
        .collect();

    Ok(Json(results).into_response())
}
