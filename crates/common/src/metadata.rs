use chrono::{DateTime, Utc};
use mime::Mime;
use serde::{Deserialize, Serialize};

use crate::entrypoint::Entrypoint;

/// Object name of the manifest inside every document folder.
pub const METADATA_FILE_NAME: &str = ".metadata.json";

/// Manifest describing the files written for one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    pub document_url: String,
    pub entrypoint: Entrypoint,
    /// Names of the files written in the same transaction, in submission
    /// order. Never includes the manifest itself.
    pub files: Vec<String>,
    /// Epoch milliseconds.
    pub timestamp: i64,
}

impl Metadata {
    pub fn build(
        document_url: impl Into<String>,
        entrypoint: Entrypoint,
        files: Vec<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            document_url: document_url.into(),
            entrypoint,
            files,
            timestamp: now.timestamp_millis(),
        }
    }

    pub fn to_json_pretty(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec_pretty(self)
    }
}

/// Content type a stored file is tagged with.
pub fn content_type_for(file_name: &str) -> Mime {
    if file_name == METADATA_FILE_NAME {
        mime::APPLICATION_JSON
    } else if file_name.ends_with(".html") {
        mime::TEXT_HTML
    } else {
        mime::TEXT_PLAIN
    }
}
