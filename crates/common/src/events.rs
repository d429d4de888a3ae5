use std::fmt::Debug;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::DocumentError;

/// Source identifying events emitted by the document store.
pub const EVENT_SOURCE: &str = "linkstash.document-storage";
/// Detail type of the event emitted after a document was stored.
pub const DOCUMENT_STORED_DETAIL_TYPE: &str = "Document stored";

/// Payload announcing that a document folder was (re)written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentStored {
    pub folder_path: String,
    pub document_url: String,
}

/// Wire shape of an event on a named bus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventEnvelope {
    pub source: String,
    pub detail_type: String,
    pub detail: DocumentStored,
    pub event_bus_name: String,
}

impl EventEnvelope {
    pub fn document_stored(event_bus_name: impl Into<String>, detail: DocumentStored) -> Self {
        Self {
            source: EVENT_SOURCE.to_string(),
            detail_type: DOCUMENT_STORED_DETAIL_TYPE.to_string(),
            detail,
            event_bus_name: event_bus_name.into(),
        }
    }
}

/// Best-effort notification sink, called only after a successful write.
///
/// Failures are reported as [`DocumentError::Publish`]; callers log them and
/// move on since the document is already stored.
#[async_trait]
pub trait EventPublisher: Send + Sync + Debug {
    async fn publish(&self, event: &DocumentStored) -> Result<(), DocumentError>;
}
