use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tokio::time::timeout;

use super::data_source::*;

const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Serialize)]
struct ReadinessReport {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

#[tracing::instrument]
pub async fn handler(data_src: StateDataSource) -> Response {
    let outcome = timeout(HEALTH_CHECK_TIMEOUT, data_src.is_ready())
        .await
        .unwrap_or(Err(DataSourceError::TimedOut));

    match outcome {
        Ok(()) => {
            let report = ReadinessReport {
                status: "ok",
                message: None,
            };
            (StatusCode::OK, Json(report)).into_response()
        }
        Err(err) => {
            tracing::warn!(reason = %err, "service not ready");
            let report = ReadinessReport {
                status: "failure",
                message: Some(err.to_string()),
            };
            (StatusCode::SERVICE_UNAVAILABLE, Json(report)).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::to_bytes;

    use super::*;

    use crate::http::health::data_source::tests::*;

    async fn check(readiness: MockReadiness) -> (StatusCode, serde_json::Value) {
        let response = handler(StateDataSource::new(Arc::new(readiness))).await;
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_handler_direct() {
        let (status, body) = check(MockReadiness::Ready).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!({"status": "ok"}));

        let (status, body) = check(MockReadiness::DependencyFailure).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            body,
            serde_json::json!({"status": "failure", "message": "object store isn't available"})
        );

        let (status, body) = check(MockReadiness::ShuttingDown).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["message"], "service is shutting down");
    }
}
