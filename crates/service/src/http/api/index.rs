use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

/// Placeholder for the indexing endpoint. Events are consumed by the
/// in-process worker instead.
pub async fn handler() -> Response {
    let msg = serde_json::json!({"message": "Not yet implemented"});
    (StatusCode::NOT_IMPLEMENTED, Json(msg)).into_response()
}
