/**
 * Error kinds surfaced at the edge of the core.
 */
pub mod error;
/**
 * Hash-derived storage keys for document identifiers.
 */
pub mod keyer;
/**
 * Parsing of multipart submissions into named file parts.
 */
pub mod ingest;
/**
 * Classification of parsed parts into an entry file
 *  plus auxiliary files.
 */
pub mod entrypoint;
/**
 * Light wrapper around the `object_store` crate.
 *  Handles backend selection (memory, local, S3)
 *  and the prefix-level primitives the folder
 *  transaction is built on.
 */
pub mod storage;
/**
 * Backup / clear / write / restore over a
 *  non-transactional object store.
 */
pub mod folder;
/**
 * The manifest written next to every stored document.
 */
pub mod metadata;
/**
 * Downstream notification after a successful write.
 */
pub mod events;
/**
 * The end-to-end write pipeline.
 */
pub mod store;
/**
 * Helper for reporting build version information.
 */
pub mod version;

pub mod prelude {
    pub use crate::entrypoint::Entrypoint;
    pub use crate::error::{DocumentError, ErrorKind};
    pub use crate::events::{DocumentStored, EventEnvelope, EventPublisher};
    pub use crate::folder::{replace_folder, TransactionError};
    pub use crate::ingest::{FilePart, FileParts};
    pub use crate::keyer::DocumentKey;
    pub use crate::metadata::Metadata;
    pub use crate::storage::{ObjectStoreConfig, Storage, StorageError};
    pub use crate::store::{DocumentStore, StoreRequest, StoredDocument};
    pub use crate::version::{build_info, BuildInfo};
}
