//! Background consumer of document stored events.
//!
//! Indexing itself is not implemented yet; the worker acknowledges every
//! event with a log line so the delivery path can be exercised end to end.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::watch;

use common::prelude::EventEnvelope;

use crate::event_bus::EventReceiver;

/// Number of events the worker has taken off the queue.
#[derive(Debug, Clone, Default)]
pub struct IndexerStats {
    processed: Arc<AtomicU64>,
}

impl IndexerStats {
    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }
}

/// Drain `receiver` until shutdown is signalled or every sender is gone.
pub async fn run_worker(
    receiver: EventReceiver,
    stats: IndexerStats,
    mut shutdown_rx: watch::Receiver<()>,
) {
    let mut events = receiver.into_async();
    tracing::info!("Starting indexing worker");

    loop {
        tokio::select! {
            next = events.next() => match next {
                Some(envelope) => {
                    handle_event(&envelope);
                    stats.processed.fetch_add(1, Ordering::Relaxed);
                }
                // All senders dropped
                None => {
                    tracing::info!("Event queue closed, shutting down indexing worker");
                    break;
                }
            },

            _ = shutdown_rx.changed() => {
                tracing::info!("Indexing worker received shutdown signal");
                break;
            }
        }
    }

    tracing::info!(processed = stats.processed(), "Indexing worker stopped");
}

fn handle_event(envelope: &EventEnvelope) {
    tracing::info!(
        source = %envelope.source,
        detail_type = %envelope.detail_type,
        folder_path = %envelope.detail.folder_path,
        document_url = %envelope.detail.document_url,
        "received document for indexing (indexing not yet implemented)"
    );
}
