use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use http::StatusCode;
use serde::Serialize;

use common::prelude::{build_info, BuildInfo};

use crate::ServiceState;

/// Build details plus the storage layout this instance writes to.
#[derive(Debug, Serialize)]
struct ServiceVersion<'a> {
    #[serde(flatten)]
    build: BuildInfo,
    object_store: &'static str,
    documents_folder: &'a str,
}

#[tracing::instrument(skip(state))]
pub async fn handler(State(state): State<ServiceState>) -> Response {
    let version = ServiceVersion {
        build: build_info(),
        object_store: state.object_store(),
        documents_folder: state.documents_folder(),
    };
    (StatusCode::OK, Json(version)).into_response()
}
