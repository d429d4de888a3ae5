//! Transactional folder replace.
//!
//! Object stores have no multi-key atomicity. [`replace_folder`] emulates an
//! atomic replace of everything under one prefix:
//!
//! 1. **Probe** the folder for existing content (one listing entry).
//! 2. **Backup** existing content to `<folder>.bak/`. A failed copy aborts
//!    before anything under the folder is deleted.
//! 3. **Clear** the folder.
//! 4. **Write** by running the caller's action.
//!
//! On success the backup is deleted (best effort). If clear or write fails,
//! or the action panics, partial writes are deleted and the backup is copied
//! back before the triggering error is returned. The backup is only deleted
//! once both steps succeed; otherwise it stays in place and the failure is
//! logged. Rollback problems never replace the original error.
//!
//! Nothing here prevents two transactions on the same folder from
//! interleaving. The last writer to finish its write phase wins.

use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use object_store::path::Path;

use crate::error::DocumentError;
use crate::storage::{Storage, StorageError};

/// Suffix appended to the folder's last path segment to name its backup.
pub const BACKUP_SUFFIX: &str = ".bak";

/// Failure of a folder transaction, tagged with the phase it happened in.
#[derive(Debug, thiserror::Error)]
pub enum TransactionError {
    #[error("probe failed: {0}")]
    Probe(#[source] StorageError),
    #[error("backup failed: {0}")]
    Backup(#[source] StorageError),
    #[error("clear failed: {0}")]
    Clear(#[source] StorageError),
    #[error("write failed: {0}")]
    Write(#[source] StorageError),
}

impl From<TransactionError> for DocumentError {
    fn from(err: TransactionError) -> Self {
        DocumentError::storage(err.to_string())
    }
}

/// Path of the backup folder for `folder`.
pub fn backup_path(folder: &Path) -> Path {
    Path::from(format!("{folder}{BACKUP_SUFFIX}"))
}

/// Replace the contents of `folder` with whatever `action` writes.
///
/// `action` receives a handle to the same storage and is expected to put every
/// new object under `folder`. Its error, or a failure while clearing the old
/// content, triggers a rollback to the pre-call state.
///
/// # Panics
///
/// A panic inside `action` is resumed after the rollback has run.
pub async fn replace_folder<F, Fut, T>(
    storage: &Storage,
    folder: &Path,
    action: F,
) -> Result<T, TransactionError>
where
    F: FnOnce(Storage) -> Fut,
    Fut: Future<Output = Result<T, StorageError>>,
{
    let backup = backup_path(folder);

    let existed = storage
        .has_any(folder)
        .await
        .map_err(TransactionError::Probe)?;
    tracing::debug!(folder = %folder, existed, "probed document folder");

    if existed {
        create_backup(storage, folder, &backup)
            .await
            .map_err(TransactionError::Backup)?;
    }
    let backup_created = existed;

    let outcome = AssertUnwindSafe(async {
        if existed {
            let cleared = storage
                .delete_prefix(folder)
                .await
                .map_err(TransactionError::Clear)?;
            tracing::debug!(folder = %folder, cleared, "cleared document folder");
        }
        action(storage.clone()).await.map_err(TransactionError::Write)
    })
    .catch_unwind()
    .await;

    match outcome {
        Ok(Ok(value)) => {
            if backup_created {
                if let Err(e) = storage.delete_prefix(&backup).await {
                    tracing::warn!(
                        backup = %backup,
                        error = %e,
                        "failed to delete backup after successful write"
                    );
                }
            }
            Ok(value)
        }
        Ok(Err(err)) => {
            tracing::warn!(folder = %folder, error = %err, "folder transaction failed, rolling back");
            rollback(storage, folder, &backup, backup_created).await;
            Err(err)
        }
        Err(panic) => {
            tracing::error!(folder = %folder, "write action panicked, rolling back");
            rollback(storage, folder, &backup, backup_created).await;
            std::panic::resume_unwind(panic)
        }
    }
}

async fn create_backup(
    storage: &Storage,
    folder: &Path,
    backup: &Path,
) -> Result<(), StorageError> {
    // Leftovers from an interrupted transaction must not be restored later.
    let stale = storage.delete_prefix(backup).await?;
    if stale > 0 {
        tracing::warn!(backup = %backup, stale, "removed stale backup entries");
    }

    let copied = copy_tree(storage, folder, backup).await;
    match copied {
        Ok(count) => {
            tracing::debug!(folder = %folder, backup = %backup, count, "backed up document folder");
            Ok(())
        }
        Err(e) => {
            if let Err(cleanup) = storage.delete_prefix(backup).await {
                tracing::warn!(
                    backup = %backup,
                    error = %cleanup,
                    "failed to remove partial backup"
                );
            }
            Err(e)
        }
    }
}

async fn rollback(storage: &Storage, folder: &Path, backup: &Path, backup_created: bool) {
    let partial_removed = match storage.delete_prefix(folder).await {
        Ok(removed) => {
            tracing::debug!(folder = %folder, removed, "removed partial writes");
            true
        }
        Err(e) => {
            tracing::error!(folder = %folder, error = %e, "failed to remove partial writes");
            false
        }
    };

    if !backup_created {
        return;
    }

    match copy_tree(storage, backup, folder).await {
        Ok(restored) if partial_removed => {
            tracing::info!(folder = %folder, restored, "restored document folder from backup");
            if let Err(e) = storage.delete_prefix(backup).await {
                tracing::warn!(backup = %backup, error = %e, "failed to delete backup after restore");
            }
        }
        // The folder may still hold new objects next to the restored ones.
        Ok(restored) => {
            tracing::error!(
                folder = %folder,
                backup = %backup,
                restored,
                "document folder restored over leftover partial writes, backup retained"
            );
        }
        Err(e) => {
            tracing::error!(
                folder = %folder,
                backup = %backup,
                error = %e,
                "failed to restore document folder, backup retained"
            );
        }
    }
}

/// Copy every key under `from` to the same relative key under `to`.
async fn copy_tree(storage: &Storage, from: &Path, to: &Path) -> Result<usize, StorageError> {
    let keys = storage.list_keys(from).await?;
    let mut copied = 0;
    for key in &keys {
        let Some(target) = relocate(key, from, to) else {
            tracing::warn!(key = %key, prefix = %from, "listed key outside of prefix, skipping");
            continue;
        };
        storage.copy(key, &target).await?;
        copied += 1;
    }
    Ok(copied)
}

fn relocate(key: &Path, from: &Path, to: &Path) -> Option<Path> {
    let rest = key.prefix_match(from)?;
    Some(to.parts().chain(rest).collect())
}
