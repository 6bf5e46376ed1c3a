use axum::{Json, response::IntoResponse};
use chrono::Utc;

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "OK",
        "message": "Server is running",
        "timestamp": Utc::now(),
    }))
}
