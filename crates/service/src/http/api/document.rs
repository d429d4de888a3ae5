use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use common::prelude::{DocumentError, ErrorKind, StoreRequest, StoredDocument};

use crate::ServiceState;

/// Marks the body as base64 encoded when set to `base64`.
pub const TRANSFER_ENCODING_HEADER: &str = "content-transfer-encoding";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreDocumentResponse {
    pub message: &'static str,
    #[serde(flatten)]
    pub document: StoredDocument,
}

pub async fn handler(
    State(state): State<ServiceState>,
    Path(document_url): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    tracing::debug!(document_url = %document_url, body_len = body.len(), "document submission");
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());
    let is_base64 = headers
        .get(TRANSFER_ENCODING_HEADER)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.trim().eq_ignore_ascii_case("base64"));

    let document = state
        .documents()
        .store(StoreRequest {
            document_url: &document_url,
            body: &body,
            content_type,
            is_base64,
        })
        .await?;

    Ok((
        StatusCode::OK,
        Json(StoreDocumentResponse {
            message: "Document stored successfully",
            document,
        }),
    ))
}

/// Maps a [`DocumentError`] onto the response contract of the document route.
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct ApiError(#[from] DocumentError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self.0.kind() {
            ErrorKind::Validation => {
                tracing::info!(error = %self.0, "rejected document submission");
                let msg = serde_json::json!({"error": self.0.detail()});
                (StatusCode::BAD_REQUEST, Json(msg)).into_response()
            }
            ErrorKind::Auth => {
                let msg = serde_json::json!({"error": "Unauthorized"});
                (StatusCode::UNAUTHORIZED, Json(msg)).into_response()
            }
            ErrorKind::Storage | ErrorKind::Publish => {
                // Object-store detail stays in the log
                tracing::error!(error = %self.0, "failed to store document");
                let msg = serde_json::json!({
                    "error": "Internal server error",
                    "message": "Failed to store document",
                });
                (StatusCode::INTERNAL_SERVER_ERROR, Json(msg)).into_response()
            }
        }
    }
}
