pub mod exam;
pub mod explanation;
pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::AppState;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/api/tests/:test_id/submissions", post(exam::submit_test))
        .route("/api/attempts/:attempt_id", get(exam::get_attempt))
        .route("/api/scores", get(exam::calculate_score))
        .route(
            "/api/tests/:test_id/questions/:question_id/explanation",
            post(explanation::explain_question),
        )
        .route(
            "/api/tests/:test_id/explanations",
            post(explanation::explain_questions),
        )
        .with_state(state)
}
