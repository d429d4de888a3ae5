//! Event bus implementations of [`EventPublisher`].
//!
//! - **queue**: bounded in-process channel drained by the indexing worker
//! - **webhook**: POSTs the event envelope as JSON
//! - **disabled**: logs and drops

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use common::prelude::{DocumentError, DocumentStored, EventEnvelope, EventPublisher};

const DEFAULT_QUEUE_SIZE: usize = 1000;
const DEFAULT_WEBHOOK_TIMEOUT_SECS: u64 = 10;

/// Event delivery configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventsConfig {
    /// Deliver to the in-process indexing worker
    Queue {
        /// Maximum number of undelivered events
        #[serde(default = "default_queue_size")]
        max_queue_size: usize,
    },
    /// POST every event to an HTTP endpoint
    Webhook {
        url: Url,
        #[serde(default = "default_webhook_timeout_secs")]
        timeout_secs: u64,
    },
    /// Do not deliver events
    Disabled,
}

fn default_queue_size() -> usize {
    DEFAULT_QUEUE_SIZE
}

fn default_webhook_timeout_secs() -> u64 {
    DEFAULT_WEBHOOK_TIMEOUT_SECS
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self::Queue {
            max_queue_size: DEFAULT_QUEUE_SIZE,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EventBusSetupError {
    #[error("failed to build webhook client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Build the publisher for `config`. The receiver is only returned for the
/// queue bus and must be handed to the indexing worker.
pub fn from_config(
    config: &EventsConfig,
    event_bus_name: &str,
) -> Result<(Arc<dyn EventPublisher>, Option<EventReceiver>), EventBusSetupError> {
    match config {
        EventsConfig::Queue { max_queue_size } => {
            let (bus, receiver) = QueuedEventBus::new(event_bus_name, *max_queue_size);
            Ok((Arc::new(bus), Some(receiver)))
        }
        EventsConfig::Webhook { url, timeout_secs } => {
            let bus = WebhookEventBus::new(
                event_bus_name,
                url.clone(),
                Duration::from_secs(*timeout_secs),
            )?;
            Ok((Arc::new(bus), None))
        }
        EventsConfig::Disabled => Ok((Arc::new(DisabledEventBus), None)),
    }
}

/// Queue-based event bus.
///
/// Publishing never waits: a full queue is reported as a publish failure
/// instead of stalling the request that stored the document.
#[derive(Debug, Clone)]
pub struct QueuedEventBus {
    event_bus_name: String,
    tx: flume::Sender<EventEnvelope>,
}

impl QueuedEventBus {
    /// Returns the bus and the receiver the worker consumes.
    pub fn new(event_bus_name: impl Into<String>, max_queue_size: usize) -> (Self, EventReceiver) {
        tracing::info!("Creating bounded event queue with size {}", max_queue_size);
        let (tx, rx) = flume::bounded(max_queue_size);
        (
            Self {
                event_bus_name: event_bus_name.into(),
                tx,
            },
            EventReceiver { rx },
        )
    }
}

#[async_trait]
impl EventPublisher for QueuedEventBus {
    async fn publish(&self, event: &DocumentStored) -> Result<(), DocumentError> {
        let envelope = EventEnvelope::document_stored(&self.event_bus_name, event.clone());
        tracing::debug!(folder_path = %event.folder_path, "queueing document stored event");
        self.tx.try_send(envelope).map_err(|e| match e {
            flume::TrySendError::Full(_) => {
                DocumentError::publish("event queue is full - indexer may be overloaded")
            }
            flume::TrySendError::Disconnected(_) => {
                DocumentError::publish("event queue worker has been stopped")
            }
        })
    }
}

/// Receiving end of the [`QueuedEventBus`].
#[derive(Debug)]
pub struct EventReceiver {
    rx: flume::Receiver<EventEnvelope>,
}

impl EventReceiver {
    /// Convert to an async stream for use in tokio::select!
    pub fn into_async(self) -> flume::r#async::RecvStream<'static, EventEnvelope> {
        self.rx.into_stream()
    }
}

/// Delivers events to an HTTP endpoint.
#[derive(Debug, Clone)]
pub struct WebhookEventBus {
    event_bus_name: String,
    url: Url,
    client: reqwest::Client,
}

impl WebhookEventBus {
    pub fn new(
        event_bus_name: impl Into<String>,
        url: Url,
        timeout: Duration,
    ) -> Result<Self, EventBusSetupError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            event_bus_name: event_bus_name.into(),
            url,
            client,
        })
    }
}

#[async_trait]
impl EventPublisher for WebhookEventBus {
    async fn publish(&self, event: &DocumentStored) -> Result<(), DocumentError> {
        let envelope = EventEnvelope::document_stored(&self.event_bus_name, event.clone());
        let response = self
            .client
            .post(self.url.clone())
            .json(&envelope)
            .send()
            .await
            .map_err(|e| DocumentError::publish(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DocumentError::publish(format!(
                "webhook {} answered {}",
                self.url, status
            )));
        }
        tracing::debug!(url = %self.url, folder_path = %event.folder_path, "delivered event");
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DisabledEventBus;

#[async_trait]
impl EventPublisher for DisabledEventBus {
    async fn publish(&self, event: &DocumentStored) -> Result<(), DocumentError> {
        tracing::debug!(
            folder_path = %event.folder_path,
            "event delivery disabled, dropping document stored event"
        );
        Ok(())
    }
}
