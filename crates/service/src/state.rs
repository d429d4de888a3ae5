use object_store::path::Path;
use tokio::sync::watch;

use common::prelude::{DocumentStore, Storage, StorageError};

use super::config::Config;
use super::event_bus::{self, EventBusSetupError, EventReceiver};
use super::secrets::{BearerToken, SecretError};

/// Main service state, cheap to clone into every handler.
#[derive(Clone, Debug)]
pub struct State {
    documents: DocumentStore,
    token: BearerToken,
    object_store: &'static str,
    documents_folder: String,
    shutdown: watch::Receiver<()>,
}

impl State {
    /// Build the state from configuration.
    ///
    /// The bearer secret is fetched here, once. The returned receiver is the
    /// consuming end of the in-process event queue, if that bus is configured.
    /// `shutdown` fires (or closes) once the process starts shutting down.
    pub async fn from_config(
        config: &Config,
        shutdown: watch::Receiver<()>,
    ) -> Result<(Self, Option<EventReceiver>), StateSetupError> {
        // 1. Setup object storage
        let storage = Storage::new(&config.object_store).await?;
        let object_store = config.object_store.backend_name();
        tracing::info!(backend = object_store, "object store ready");

        // 2. Setup event delivery
        let (publisher, receiver) = event_bus::from_config(&config.events, &config.event_bus_name)?;

        // 3. Fetch the bearer secret
        let token = config.auth.provider().bearer_token().await?;
        tracing::debug!("bearer secret loaded");

        let documents_folder = config.documents_folder.trim_matches('/').to_string();
        let documents = DocumentStore::new(storage, Path::from(documents_folder.as_str()), publisher);

        let state = Self {
            documents,
            token,
            object_store,
            documents_folder,
            shutdown,
        };
        Ok((state, receiver))
    }

    pub fn documents(&self) -> &DocumentStore {
        &self.documents
    }

    pub fn storage(&self) -> &Storage {
        self.documents.storage()
    }

    pub fn token(&self) -> &BearerToken {
        &self.token
    }

    /// Name of the configured object store backend.
    pub fn object_store(&self) -> &'static str {
        self.object_store
    }

    pub fn documents_folder(&self) -> &str {
        &self.documents_folder
    }

    pub fn is_shutting_down(&self) -> bool {
        // A closed channel means the signal task is gone as well
        !matches!(self.shutdown.has_changed(), Ok(false))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StateSetupError {
    #[error("Object store setup error: {0}")]
    Storage(#[from] StorageError),
    #[error("Event bus setup error: {0}")]
    EventBus(#[from] EventBusSetupError),
    #[error("Secret lookup error: {0}")]
    Secret(#[from] SecretError),
}
