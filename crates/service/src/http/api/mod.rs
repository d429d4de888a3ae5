use axum::middleware;
use axum::routing::{post, put};
use axum::Router;

use crate::auth::require_bearer_token;
use crate::ServiceState;

pub mod document;
pub mod index;

pub use document::ApiError;

pub fn router(state: ServiceState) -> Router<ServiceState> {
    let documents = Router::new()
        .route("/document/:document_url", put(document::handler))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_bearer_token,
        ));

    Router::new()
        .merge(documents)
        .route("/index-document", post(index::handler))
        .with_state(state)
}
