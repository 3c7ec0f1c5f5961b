use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::AppState;

#[axum::debug_handler]
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let table = state.scoring_service.scores().table();
    let body = json!({
        "status": "ok",
        "score_table_entries": table.len(),
    });
    (StatusCode::OK, Json(body))
}
