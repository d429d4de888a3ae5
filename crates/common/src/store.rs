use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use object_store::path::Path;
use serde::Serialize;

use crate::entrypoint::{self, Entrypoint};
use crate::error::DocumentError;
use crate::events::{DocumentStored, EventPublisher};
use crate::folder::replace_folder;
use crate::ingest::{self, FileParts};
use crate::keyer::DocumentKey;
use crate::metadata::{content_type_for, Metadata, METADATA_FILE_NAME};
use crate::storage::{Storage, StorageError};

/// A document submission as it arrives at the edge.
#[derive(Debug, Clone, Copy)]
pub struct StoreRequest<'a> {
    pub document_url: &'a str,
    pub body: &'a [u8],
    pub content_type: Option<&'a str>,
    pub is_base64: bool,
}

/// Outcome of a successful store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredDocument {
    pub folder_path: String,
    pub entrypoint: Entrypoint,
    pub files: Vec<String>,
}

/// Ingests submissions and writes them to `<root>/<key>/`.
#[derive(Debug, Clone)]
pub struct DocumentStore {
    storage: Storage,
    root: Path,
    publisher: Arc<dyn EventPublisher>,
}

impl DocumentStore {
    pub fn new(storage: Storage, root: Path, publisher: Arc<dyn EventPublisher>) -> Self {
        Self {
            storage,
            root,
            publisher,
        }
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Folder holding every file of the document identified by `document_url`.
    pub fn folder_for(&self, document_url: &str) -> Path {
        let key = DocumentKey::derive(document_url);
        self.root.child(key.as_str())
    }

    /// Parse, classify and transactionally write a submission, then announce it.
    ///
    /// Validation failures return before the store is touched. A failed
    /// announcement is logged and does not affect the result.
    pub async fn store(&self, request: StoreRequest<'_>) -> Result<StoredDocument, DocumentError> {
        let parts = ingest::parse(request.body, request.content_type, request.is_base64).await?;
        tracing::debug!(
            document_url = request.document_url,
            parts = ?parts.names(),
            "parsed document submission"
        );

        let (entrypoint, parts) = entrypoint::resolve(parts)?;
        let files = parts.names();
        let metadata = Metadata::build(request.document_url, entrypoint, files.clone(), Utc::now());

        let folder = self.folder_for(request.document_url);
        let target = folder.clone();
        replace_folder(&self.storage, &folder, move |storage| {
            write_document(storage, target, parts, metadata)
        })
        .await?;

        let folder_path = folder.to_string();
        tracing::info!(
            document_url = request.document_url,
            folder_path = %folder_path,
            entrypoint = %entrypoint,
            files = files.len(),
            "stored document"
        );

        let event = DocumentStored {
            folder_path: folder_path.clone(),
            document_url: request.document_url.to_string(),
        };
        if let Err(e) = self.publisher.publish(&event).await {
            tracing::error!(
                folder_path = %folder_path,
                error = %e,
                "failed to publish document stored event"
            );
        }

        Ok(StoredDocument {
            folder_path,
            entrypoint,
            files,
        })
    }
}

/// Put every part, then the manifest last.
async fn write_document(
    storage: Storage,
    folder: Path,
    parts: FileParts,
    metadata: Metadata,
) -> Result<(), StorageError> {
    for part in parts {
        let path = folder.child(part.name.as_str());
        storage
            .put(&path, part.content, &content_type_for(&part.name))
            .await?;
    }

    let manifest = metadata.to_json_pretty()?;
    storage
        .put(
            &folder.child(METADATA_FILE_NAME),
            Bytes::from(manifest),
            &content_type_for(METADATA_FILE_NAME),
        )
        .await
}
