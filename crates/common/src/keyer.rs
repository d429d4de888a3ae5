use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Storage key for a document, derived from its identifier.
///
/// The key is the lowercase hex encoding of the SHA-256 digest of the
/// identifier's UTF-8 bytes. It is stable across processes and platforms,
/// and safe to use as a single object-store path segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentKey(String);

impl DocumentKey {
    pub fn derive(identifier: &str) -> Self {
        let digest = Sha256::digest(identifier.as_bytes());
        Self(hex::encode(digest))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for DocumentKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_digests() {
        assert_eq!(
            DocumentKey::derive("").as_str(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(
            DocumentKey::derive("abc").as_str(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_derive_is_deterministic() {
        let url = "https://example.com/articles/1?ref=feed";
        assert_eq!(DocumentKey::derive(url), DocumentKey::derive(url));
    }

    #[test]
    fn test_distinct_identifiers_get_distinct_keys() {
        let a = DocumentKey::derive("https://example.com/a");
        let b = DocumentKey::derive("https://example.com/b");
        let upper = DocumentKey::derive("https://EXAMPLE.com/a");
        assert_ne!(a, b);
        assert_ne!(a, upper);
    }

    #[test]
    fn test_key_is_lowercase_hex() {
        let key = DocumentKey::derive("Grüße aus Köln");
        assert_eq!(key.as_str().len(), 64);
        assert!(key
            .as_str()
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }
}
