use axum::extract::{Request, State};
use axum::http::{header, HeaderMap};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use common::prelude::DocumentError;

use crate::http::api::ApiError;
use crate::ServiceState;

const BEARER_PREFIX: &str = "Bearer ";

/// Reject the request with 401 unless it carries the configured bearer token.
pub async fn require_bearer_token(
    State(state): State<ServiceState>,
    request: Request,
    next: Next,
) -> Response {
    let err = match bearer_credential(request.headers()) {
        Some(token) if state.token().matches(token) => return next.run(request).await,
        Some(_) => DocumentError::auth("bearer credential mismatch"),
        None => DocumentError::auth("missing bearer credential"),
    };

    tracing::warn!(path = %request.uri().path(), error = %err, "rejected unauthorized request");
    ApiError::from(err).into_response()
}

fn bearer_credential(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix(BEARER_PREFIX)
}
