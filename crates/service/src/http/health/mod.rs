use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::ServiceState;

mod data_source;
mod readiness;
mod version;

pub fn router(state: ServiceState) -> Router<ServiceState> {
    Router::new()
        .route("/livez", get(liveness))
        .route("/readyz", get(readiness::handler))
        .route("/version", get(version::handler))
        .with_state(state)
}

/// The process is up and serving requests.
async fn liveness() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({"status": "ok"})))
}
