use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

/// Liveness probe: 200 for as long as the process can answer at all.
pub async fn live() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "ok" })))
}
