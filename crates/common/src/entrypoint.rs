use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::DocumentError;
use crate::ingest::{FileParts, DOCUMENT_PART, HTML_DOCUMENT_PART, TEXT_DOCUMENT_PART};

/// The file a reader should open first to render a stored document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Entrypoint {
    #[serde(rename = "document.html")]
    Html,
    #[serde(rename = "document.txt")]
    Text,
}

impl Entrypoint {
    pub fn file_name(&self) -> &'static str {
        match self {
            Entrypoint::Html => HTML_DOCUMENT_PART,
            Entrypoint::Text => TEXT_DOCUMENT_PART,
        }
    }

    /// Substring check for `<html` or `<body`, ignoring ASCII case.
    ///
    /// Intentionally naive: text that merely mentions those tags (escaped
    /// markup, quoted snippets) is classified as HTML too.
    pub fn sniff(content: &[u8]) -> Self {
        let lowered = content.to_ascii_lowercase();
        let looks_like_html = [b"<html".as_slice(), b"<body".as_slice()]
            .iter()
            .any(|tag| lowered.windows(tag.len()).any(|window| window == *tag));
        if looks_like_html {
            Entrypoint::Html
        } else {
            Entrypoint::Text
        }
    }
}

impl fmt::Display for Entrypoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}

/// Pick the entrypoint for a set of parts.
///
/// An explicit `document.html` wins over `document.txt`. A generic `document`
/// part is only consulted when neither is present; it is classified by
/// [`Entrypoint::sniff`], removed, and re-added at the end under its
/// file-like name.
pub fn resolve(mut parts: FileParts) -> Result<(Entrypoint, FileParts), DocumentError> {
    if parts.contains(HTML_DOCUMENT_PART) {
        return Ok((Entrypoint::Html, parts));
    }
    if parts.contains(TEXT_DOCUMENT_PART) {
        return Ok((Entrypoint::Text, parts));
    }

    let content = parts
        .remove(DOCUMENT_PART)
        .ok_or_else(|| DocumentError::validation("missing document part"))?;
    let entrypoint = Entrypoint::sniff(&content);
    parts.insert(entrypoint.file_name(), content);
    Ok((entrypoint, parts))
}
