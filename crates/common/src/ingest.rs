//! Multipart form data ingestion.
//!
//! Turns a raw `multipart/form-data` request body into an ordered set of named
//! byte parts with `multer`. The parser works on the already-collected body; it
//! never touches storage and never logs, leaving observability to the caller.

use std::convert::Infallible;

use base64::Engine;
use bytes::Bytes;
use object_store::path::PathPart;

use crate::error::DocumentError;
use crate::metadata::METADATA_FILE_NAME;

/// Generic document part, classified by content.
pub const DOCUMENT_PART: &str = "document";
/// Explicit HTML document part.
pub const HTML_DOCUMENT_PART: &str = "document.html";
/// Explicit plain-text document part.
pub const TEXT_DOCUMENT_PART: &str = "document.txt";

const DOCUMENT_PART_NAMES: [&str; 3] = [DOCUMENT_PART, HTML_DOCUMENT_PART, TEXT_DOCUMENT_PART];

/// A single named part of a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    pub name: String,
    pub content: Bytes,
}

/// Named parts in insertion order. Names are unique.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileParts {
    parts: Vec<FilePart>,
}

impl FileParts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a part. Re-using a name replaces the earlier content but keeps
    /// its original position.
    pub fn insert(&mut self, name: impl Into<String>, content: impl Into<Bytes>) {
        let name = name.into();
        let content = content.into();
        match self.parts.iter_mut().find(|part| part.name == name) {
            Some(existing) => existing.content = content,
            None => self.parts.push(FilePart { name, content }),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Bytes> {
        self.parts
            .iter()
            .find(|part| part.name == name)
            .map(|part| &part.content)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn remove(&mut self, name: &str) -> Option<Bytes> {
        let idx = self.parts.iter().position(|part| part.name == name)?;
        Some(self.parts.remove(idx).content)
    }

    /// Part names in insertion order.
    pub fn names(&self) -> Vec<String> {
        self.parts.iter().map(|part| part.name.clone()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FilePart> {
        self.parts.iter()
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}

impl IntoIterator for FileParts {
    type Item = FilePart;
    type IntoIter = std::vec::IntoIter<FilePart>;

    fn into_iter(self) -> Self::IntoIter {
        self.parts.into_iter()
    }
}

impl<N, C> FromIterator<(N, C)> for FileParts
where
    N: Into<String>,
    C: Into<Bytes>,
{
    fn from_iter<I: IntoIterator<Item = (N, C)>>(iter: I) -> Self {
        let mut parts = FileParts::new();
        for (name, content) in iter {
            parts.insert(name, content);
        }
        parts
    }
}

/// Parse a multipart submission into named parts.
///
/// Parts without a name (or with `name=""`) are dropped.
///
/// # Errors
///
/// Returns [`DocumentError::Validation`] when the content type is missing or
/// not `multipart/form-data`, the body is empty, a base64 body fails to
/// decode, the boundary is missing, the body is not well-formed multipart,
/// a part name is unusable as a file name, or none of `document`,
/// `document.html`, `document.txt` is present.
pub async fn parse(
    body: &[u8],
    content_type: Option<&str>,
    is_base64: bool,
) -> Result<FileParts, DocumentError> {
    let content_type = content_type
        .filter(|value| is_multipart_form(value))
        .ok_or_else(|| DocumentError::validation("not multipart"))?;
    if body.is_empty() {
        return Err(DocumentError::validation("not multipart"));
    }

    let body = if is_base64 {
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(body)
            .map_err(|_| DocumentError::validation("bad encoding"))?;
        Bytes::from(decoded)
    } else {
        Bytes::copy_from_slice(body)
    };

    let boundary = multer::parse_boundary(content_type)
        .ok()
        .filter(|boundary| !boundary.is_empty())
        .ok_or_else(|| DocumentError::validation("missing boundary"))?;

    let stream = futures::stream::once(async move { Ok::<_, Infallible>(body) });
    let mut multipart = multer::Multipart::new(stream, boundary);

    let mut parts = FileParts::new();
    while let Some(field) = multipart.next_field().await.map_err(malformed)? {
        let name = field.name().map(str::to_owned);
        let content = field.bytes().await.map_err(malformed)?;
        let Some(name) = name.filter(|name| !name.is_empty()) else {
            continue;
        };
        validate_part_name(&name)?;
        parts.insert(name, content);
    }

    if !DOCUMENT_PART_NAMES.iter().any(|name| parts.contains(name)) {
        return Err(DocumentError::validation("missing document part"));
    }

    Ok(parts)
}

fn is_multipart_form(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .is_some_and(|media_type| media_type.trim().eq_ignore_ascii_case("multipart/form-data"))
}

fn malformed(err: multer::Error) -> DocumentError {
    DocumentError::validation(format!("malformed multipart: {err}"))
}

/// Part names become object names inside the document folder, verbatim.
fn validate_part_name(name: &str) -> Result<(), DocumentError> {
    if name == METADATA_FILE_NAME {
        return Err(DocumentError::validation(format!(
            "invalid part name: {name} is reserved"
        )));
    }
    // `/`, `.`, `..` and characters such as `%`, `[` or a backslash would be stored
    // under a percent-encoded key that no longer matches the manifest.
    if PathPart::from(name).as_ref() != name {
        return Err(DocumentError::validation(format!(
            "invalid part name: {name}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOUNDARY: &str = "----linkstash7MA4YWxkTrZu0gW";

    fn content_type() -> String {
        format!("multipart/form-data; boundary={BOUNDARY}")
    }

    fn form(fields: &[(&str, &[u8])]) -> Vec<u8> {
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

    fn validation_detail(result: Result<FileParts, DocumentError>) -> String {
        match result {
            Err(DocumentError::Validation(detail)) => detail,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_parse_named_parts_in_order() {
        let body = form(&[
            ("document.html", b"<html><body>hi</body></html>"),
            ("style.css", b"body { color: red }"),
        ]);
        let parts = parse(&body, Some(&content_type()), false).await.unwrap();

        assert_eq!(parts.names(), vec!["document.html", "style.css"]);
        assert_eq!(
            parts.get("document.html").unwrap().as_ref(),
            b"<html><body>hi</body></html>"
        );
        assert_eq!(parts.get("style.css").unwrap().as_ref(), b"body { color: red }");
    }

    #[tokio::test]
    async fn test_parse_preserves_binary_and_crlf_content() {
        let payload: &[u8] = b"line one\r\nline two\r\n\x00\x01\xff";
        let body = form(&[("document", payload)]);
        let parts = parse(&body, Some(&content_type()), false).await.unwrap();
        assert_eq!(parts.get("document").unwrap().as_ref(), payload);
    }

    #[tokio::test]
    async fn test_boundary_text_without_delimiter_prefix_is_content() {
        let payload = format!("see --{BOUNDARY} inline");
        let body = form(&[("document.txt", payload.as_bytes())]);
        let parts = parse(&body, Some(&content_type()), false).await.unwrap();
        assert_eq!(parts.get("document.txt").unwrap().as_ref(), payload.as_bytes());
    }

    #[tokio::test]
    async fn test_parse_quoted_boundary_and_preamble() {
        let mut body = b"this is a preamble\r\n".to_vec();
        body.extend_from_slice(&form(&[("document.txt", b"hello")]));
        let ct = format!("Multipart/Form-Data; charset=utf-8; boundary=\"{BOUNDARY}\"");
        let parts = parse(&body, Some(&ct), false).await.unwrap();
        assert_eq!(parts.get("document.txt").unwrap().as_ref(), b"hello");
    }

    #[tokio::test]
    async fn test_parse_filename_before_name() {
        let body = format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; filename=\"page.html\"; name=\"document\"\r\n\
             Content-Type: text/html\r\n\
             \r\n\
             <p>hi</p>\r\n\
             --{BOUNDARY}--\r\n"
        );
        let parts = parse(body.as_bytes(), Some(&content_type()), false).await.unwrap();
        assert_eq!(parts.names(), vec!["document"]);
        assert_eq!(parts.get("document").unwrap().as_ref(), b"<p>hi</p>");
    }

    #[tokio::test]
    async fn test_unnamed_parts_are_dropped() {
        let body = format!(
            "--{BOUNDARY}\r\n\
             Content-Type: text/plain\r\n\
             \r\n\
             orphan\r\n\
             --{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"document.txt\"\r\n\
             \r\n\
             kept\r\n\
             --{BOUNDARY}--\r\n"
        );
        let parts = parse(body.as_bytes(), Some(&content_type()), false).await.unwrap();
        assert_eq!(parts.names(), vec!["document.txt"]);
    }

    #[tokio::test]
    async fn test_duplicate_name_replaces_in_place() {
        let body = form(&[
            ("document.txt", b"first"),
            ("notes.md", b"notes"),
            ("document.txt", b"second"),
        ]);
        let parts = parse(&body, Some(&content_type()), false).await.unwrap();
        assert_eq!(parts.names(), vec!["document.txt", "notes.md"]);
        assert_eq!(parts.get("document.txt").unwrap().as_ref(), b"second");
    }

    #[tokio::test]
    async fn test_truncated_body_is_rejected() {
        let body = format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"document.txt\"\r\n\
             \r\n\
             truncated\r\n"
        );
        let result = parse(body.as_bytes(), Some(&content_type()), false).await;
        let detail = validation_detail(result);
        assert!(detail.starts_with("malformed multipart"), "{detail}");
    }

    #[tokio::test]
    async fn test_empty_name_is_dropped() {
        let body = form(&[("document.txt", b"hi"), ("", b"x")]);
        let parts = parse(&body, Some(&content_type()), false).await.unwrap();
        assert_eq!(parts.names(), vec!["document.txt"]);
    }

    #[tokio::test]
    async fn test_parse_base64_body() {
        let body = form(&[("document", b"hello")]);
        let encoded = base64::engine::general_purpose::STANDARD.encode(&body);
        let parts = parse(encoded.as_bytes(), Some(&content_type()), true).await.unwrap();
        assert_eq!(parts.get("document").unwrap().as_ref(), b"hello");
    }

    #[tokio::test]
    async fn test_bad_base64_is_rejected() {
        let result = parse(b"%%%not base64%%%", Some(&content_type()), true).await;
        let detail = validation_detail(result);
        assert_eq!(detail, "bad encoding");
    }

    #[tokio::test]
    async fn test_missing_or_wrong_content_type_is_rejected() {
        let body = form(&[("document", b"hello")]);
        assert_eq!(validation_detail(parse(&body, None, false).await), "not multipart");
        assert_eq!(
            validation_detail(parse(&body, Some("application/json"), false).await),
            "not multipart"
        );
        assert_eq!(
            validation_detail(parse(&body, Some("multipart/mixed; boundary=x"), false).await),
            "not multipart"
        );
    }

    #[tokio::test]
    async fn test_empty_body_is_rejected() {
        assert_eq!(
            validation_detail(parse(b"", Some(&content_type()), false).await),
            "not multipart"
        );
    }

    #[tokio::test]
    async fn test_missing_boundary_is_rejected() {
        let body = form(&[("document", b"hello")]);
        assert_eq!(
            validation_detail(parse(&body, Some("multipart/form-data"), false).await),
            "missing boundary"
        );
        assert_eq!(
            validation_detail(
                parse(&body, Some("multipart/form-data; boundary=\"\""), false).await
            ),
            "missing boundary"
        );
    }

    #[tokio::test]
    async fn test_unrelated_part_only_is_rejected() {
        let body = form(&[("foo", b"bar")]);
        assert_eq!(
            validation_detail(parse(&body, Some(&content_type()), false).await),
            "missing document part"
        );
    }

    #[tokio::test]
    async fn test_reserved_and_path_like_names_are_rejected() {
        for name in [
            ".metadata.json",
            ".",
            "..",
            "nested/file.txt",
            "..\\evil",
            "img[1].png",
            "100%.txt",
            "notes~1.md",
        ] {
            let body = form(&[("document", b"hello"), (name, b"x")]);
            let detail = validation_detail(parse(&body, Some(&content_type()), false).await);
            assert!(detail.starts_with("invalid part name"), "{name}: {detail}");
        }
    }

    #[test]
    fn test_file_parts_remove_and_collect() {
        let mut parts: FileParts = [("a", "1"), ("b", "2")].into_iter().collect();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts.remove("a").unwrap().as_ref(), b"1");
        assert!(!parts.contains("a"));
        assert!(parts.remove("a").is_none());
        assert_eq!(parts.names(), vec!["b"]);
    }
}
