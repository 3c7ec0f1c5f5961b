use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use uuid::Uuid;
use validator::Validate;

use crate::dto::exam_dto::{AttemptDetailResponse, ScoreQuery, SubmitTestRequest};
use crate::AppState;

#[axum::debug_handler]
pub async fn submit_test(
    State(state): State<AppState>,
    Path(test_id): Path<Uuid>,
    Json(req): Json<SubmitTestRequest>,
) -> crate::error::Result<Response> {
    req.validate()?;
    let test = state.repository.get_test_with_answer_key(test_id).await?;
    let submission = req.into_submission(test_id);

    let result = match state.scoring_service.score_submission(&test, &submission) {
        Ok(result) => result,
        Err(e) => {
            tracing::warn!(test_id = %test_id, error = %e, "Rejected submission");
            return Err(e);
        }
    };

    state.repository.save_attempt(&result).await?;
    tracing::info!(attempt_id = %result.id, test_id = %test_id, "Saved attempt result");

    Ok((StatusCode::CREATED, Json(result)).into_response())
}

#[axum::debug_handler]
pub async fn get_attempt(
    State(state): State<AppState>,
    Path(attempt_id): Path<Uuid>,
) -> crate::error::Result<Response> {
    let attempt = state.repository.get_attempt(attempt_id).await?;
    let score = state
        .scoring_service
        .scores()
        .calculate_score(attempt.listening_correct, attempt.reading_correct);

    Ok(Json(AttemptDetailResponse { attempt, score }).into_response())
}

#[axum::debug_handler]
pub async fn calculate_score(
    State(state): State<AppState>,
    Query(query): Query<ScoreQuery>,
) -> crate::error::Result<Response> {
    let report = state
        .scoring_service
        .scores()
        .calculate_score(query.listening, query.reading);
    Ok(Json(report).into_response())
}
