//! Shared test utilities for document storage integration tests
#![allow(dead_code)]

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use object_store::memory::InMemory;
use object_store::path::Path;
use object_store::{
    GetOptions, GetResult, ListResult, MultipartUpload, ObjectMeta, ObjectStore,
    PutMultipartOpts, PutOptions, PutPayload, PutResult,
};

use ::common::prelude::*;

pub const BOUNDARY: &str = "linkstash-test-boundary";

/// In-memory object store with injectable failures.
#[derive(Debug, Default)]
pub struct FaultyStore {
    inner: InMemory,
    /// Copies allowed to succeed before every further copy fails.
    copies_before_failure: Option<usize>,
    /// Copies whose source contains this fragment fail.
    fail_copies_from: Option<String>,
    /// Puts whose destination contains this fragment fail.
    fail_puts_containing: Option<String>,
    /// Deletes whose location contains this fragment fail.
    fail_deletes_containing: Option<String>,
    /// How many matching deletes fail before deletes succeed again.
    delete_failures_left: Option<AtomicUsize>,
    /// Yield to the scheduler before every mutating call.
    yield_between_ops: bool,
    copies: AtomicUsize,
    deleted: Mutex<Vec<Path>>,
}

impl FaultyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_copy_after(mut self, successful_copies: usize) -> Self {
        self.copies_before_failure = Some(successful_copies);
        self
    }

    pub fn fail_copies_from(mut self, fragment: &str) -> Self {
        self.fail_copies_from = Some(fragment.to_string());
        self
    }

    pub fn fail_puts_containing(mut self, fragment: &str) -> Self {
        self.fail_puts_containing = Some(fragment.to_string());
        self
    }

    /// Every delete of a location containing `fragment` fails.
    pub fn fail_deletes_containing(mut self, fragment: &str) -> Self {
        self.fail_deletes_containing = Some(fragment.to_string());
        self
    }

    /// Only the first `failures` matching deletes fail.
    pub fn fail_deletes_containing_times(mut self, fragment: &str, failures: usize) -> Self {
        self.fail_deletes_containing = Some(fragment.to_string());
        self.delete_failures_left = Some(AtomicUsize::new(failures));
        self
    }

    pub fn yielding(mut self) -> Self {
        self.yield_between_ops = true;
        self
    }

    /// Every path passed to `delete`, in call order.
    pub fn deleted(&self) -> Vec<Path> {
        self.deleted.lock().unwrap().clone()
    }

    async fn pause(&self) {
        if self.yield_between_ops {
            tokio::task::yield_now().await;
        }
    }

    fn delete_should_fail(&self, location: &Path) -> bool {
        let Some(fragment) = &self.fail_deletes_containing else {
            return false;
        };
        if !location.as_ref().contains(fragment.as_str()) {
            return false;
        }
        match &self.delete_failures_left {
            Some(left) => left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok(),
            None => true,
        }
    }

    fn injected(what: &str, location: &Path) -> object_store::Error {
        object_store::Error::Generic {
            store: "FaultyStore",
            source: format!("injected {what} failure at {location}").into(),
        }
    }
}

impl fmt::Display for FaultyStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FaultyStore({})", self.inner)
    }
}

#[async_trait]
impl ObjectStore for FaultyStore {
    async fn put_opts(
        &self,
        location: &Path,
        payload: PutPayload,
        opts: PutOptions,
    ) -> object_store::Result<PutResult> {
        self.pause().await;
        if let Some(fragment) = &self.fail_puts_containing {
            if location.as_ref().contains(fragment.as_str()) {
                return Err(Self::injected("put", location));
            }
        }
        self.inner.put_opts(location, payload, opts).await
    }

    async fn put_multipart_opts(
        &self,
        location: &Path,
        opts: PutMultipartOpts,
    ) -> object_store::Result<Box<dyn MultipartUpload>> {
        self.inner.put_multipart_opts(location, opts).await
    }

    async fn get_opts(
        &self,
        location: &Path,
        options: GetOptions,
    ) -> object_store::Result<GetResult> {
        self.inner.get_opts(location, options).await
    }

    async fn delete(&self, location: &Path) -> object_store::Result<()> {
        self.pause().await;
        self.deleted.lock().unwrap().push(location.clone());
        if self.delete_should_fail(location) {
            return Err(Self::injected("delete", location));
        }
        self.inner.delete(location).await
    }

    fn list(&self, prefix: Option<&Path>) -> BoxStream<'_, object_store::Result<ObjectMeta>> {
        self.inner.list(prefix)
    }

    async fn list_with_delimiter(&self, prefix: Option<&Path>) -> object_store::Result<ListResult> {
        self.inner.list_with_delimiter(prefix).await
    }

    async fn copy(&self, from: &Path, to: &Path) -> object_store::Result<()> {
        self.pause().await;
        let attempt = self.copies.fetch_add(1, Ordering::SeqCst);
        if let Some(allowed) = self.copies_before_failure {
            if attempt >= allowed {
                return Err(Self::injected("copy", from));
            }
        }
        if let Some(fragment) = &self.fail_copies_from {
            if from.as_ref().contains(fragment.as_str()) {
                return Err(Self::injected("copy", from));
            }
        }
        self.inner.copy(from, to).await
    }

    async fn copy_if_not_exists(&self, from: &Path, to: &Path) -> object_store::Result<()> {
        self.inner.copy_if_not_exists(from, to).await
    }
}

/// Wrap a store for use by the code under test.
pub fn storage_over(store: &Arc<FaultyStore>) -> Storage {
    Storage::from_store(store.clone())
}

/// Every object under `prefix`, keyed by full path.
pub async fn contents(storage: &Storage, prefix: &str) -> BTreeMap<String, Bytes> {
    let mut out = BTreeMap::new();
    for key in storage.list_keys(&Path::from(prefix)).await.unwrap() {
        let bytes = storage.get(&key).await.unwrap().unwrap();
        out.insert(key.to_string(), bytes);
    }
    out
}

/// Whether any key in the whole store lives under a backup folder.
pub async fn has_backup_residue(storage: &Storage) -> bool {
    storage
        .list_keys(&Path::from(""))
        .await
        .unwrap()
        .iter()
        .any(|key| key.parts().any(|part| part.as_ref().ends_with(".bak")))
}

/// Seed objects directly, bypassing the transaction.
pub async fn seed(storage: &Storage, objects: &[(&str, &'static str)]) {
    for (key, data) in objects {
        storage
            .put(&Path::from(*key), Bytes::from(*data), &mime::TEXT_PLAIN)
            .await
            .unwrap();
    }
}

pub fn injected_failure() -> StorageError {
    StorageError::ObjectStore(object_store::Error::Generic {
        store: "test",
        source: "write action failed".into(),
    })
}

/// Multipart body with one part per `(name, content)` pair.
pub fn multipart_body(fields: &[(&str, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, content) in fields {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
        );
        body.extend_from_slice(content);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub fn multipart_content_type() -> String {
    format!("multipart/form-data; boundary={BOUNDARY}")
}

/// Publisher that records events and can be told to fail.
#[derive(Debug, Default)]
pub struct RecordingPublisher {
    pub fail: bool,
    pub events: Mutex<Vec<DocumentStored>>,
}

impl RecordingPublisher {
    pub fn failing() -> Self {
        Self {
            fail: true,
            events: Mutex::default(),
        }
    }

    pub fn events(&self) -> Vec<DocumentStored> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventPublisher for RecordingPublisher {
    async fn publish(&self, event: &DocumentStored) -> Result<(), DocumentError> {
        self.events.lock().unwrap().push(event.clone());
        if self.fail {
            return Err(DocumentError::publish("event bus unavailable"));
        }
        Ok(())
    }
}
