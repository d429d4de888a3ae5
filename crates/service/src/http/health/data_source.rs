use std::fmt::Debug;
use std::ops::Deref;
use std::sync::Arc;

use axum::async_trait;
use axum::extract::FromRequestParts;
use http::request::Parts;

use common::prelude::Storage;

use crate::ServiceState;

#[async_trait]
pub trait DataSource {
    /// Perform various checks on the system to ensure its healthy and ready to accept requests.
    async fn is_ready(&self) -> Result<(), DataSourceError>;
}

#[derive(Debug, thiserror::Error)]
pub enum DataSourceError {
    #[error("object store isn't available")]
    DependencyFailure,

    #[error("service is shutting down")]
    ShuttingDown,

    #[error("health check timed out")]
    TimedOut,
}

pub type DynDataSource = Arc<dyn DataSource + Send + Sync>;

pub struct StateDataSource(DynDataSource);

impl Debug for StateDataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateDataSource").finish()
    }
}

impl StateDataSource {
    pub fn new(dds: DynDataSource) -> Self {
        Self(dds)
    }
}

impl Deref for StateDataSource {
    type Target = DynDataSource;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Ready when the service is not draining and the object store answers a listing.
struct StorageSource {
    storage: Storage,
    shutting_down: bool,
}

#[async_trait]
impl DataSource for StorageSource {
    async fn is_ready(&self) -> Result<(), DataSourceError> {
        if self.shutting_down {
            return Err(DataSourceError::ShuttingDown);
        }
        self.storage.ping().await.map_err(|e| {
            tracing::warn!(error = %e, "object store readiness probe failed");
            DataSourceError::DependencyFailure
        })
    }
}

#[async_trait]
impl FromRequestParts<ServiceState> for StateDataSource {
    type Rejection = ();

    async fn from_request_parts(
        _parts: &mut Parts,
        state: &ServiceState,
    ) -> Result<Self, Self::Rejection> {
        Ok(StateDataSource(Arc::new(StorageSource {
            storage: state.storage().clone(),
            shutting_down: state.is_shutting_down(),
        })))
    }
}
