//! Error kinds for the document pipeline.
//!
//! Every failure that leaves the core is one of four kinds, each carrying a
//! human-readable detail string:
//!
//! - **Validation**: the submission is malformed or incomplete (user-correctable)
//! - **Auth**: the bearer credential is missing or wrong
//! - **Storage**: an object-store operation failed during the folder transaction
//! - **Publish**: the downstream notification failed (logged, never surfaced)

use serde::Serialize;

/// Closed set of error kinds, useful for matching without caring about detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Auth,
    Storage,
    Publish,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DocumentError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("unauthorized: {0}")]
    Auth(String),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("publish error: {0}")]
    Publish(String),
}

impl DocumentError {
    pub fn validation(detail: impl Into<String>) -> Self {
        Self::Validation(detail.into())
    }

    pub fn auth(detail: impl Into<String>) -> Self {
        Self::Auth(detail.into())
    }

    pub fn storage(detail: impl Into<String>) -> Self {
        Self::Storage(detail.into())
    }

    pub fn publish(detail: impl Into<String>) -> Self {
        Self::Publish(detail.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Auth(_) => ErrorKind::Auth,
            Self::Storage(_) => ErrorKind::Storage,
            Self::Publish(_) => ErrorKind::Publish,
        }
    }

    /// The detail string without the kind prefix.
    pub fn detail(&self) -> &str {
        match self {
            Self::Validation(detail)
            | Self::Auth(detail)
            | Self::Storage(detail)
            | Self::Publish(detail) => detail,
        }
    }
}
