//! SHA-256 content hashing.
//!
//! `title_hash`, `content_hash`, `canonical_url_hash`, and the ingest
//! `payload_hash` all go through [`sha256_hex`] — a single plain SHA-256 over
//! UTF-8 bytes, hex-encoded lowercase. There is deliberately no version
//! discriminator byte here: the version-sensitivity lives in
//! [`crate::normalize`] and [`crate::canonicalize_url`] upstream of hashing,
//! so that a `content_hash` is directly comparable across callers without
//! needing to know which normalize version produced it.

use sha2::{Digest, Sha256};

/// Returns the lowercase hex SHA-256 digest of `input`.
pub fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

/// `content_hash = SHA-256(normalized_title + "\n\n" + normalized_text)`.
pub fn content_hash(normalized_title: &str, normalized_text: &str) -> String {
    sha256_hex(&format!("{normalized_title}\n\n{normalized_text}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_hex_is_deterministic() {
        assert_eq!(sha256_hex("abc"), sha256_hex("abc"));
        assert_ne!(sha256_hex("abc"), sha256_hex("abd"));
    }

    #[test]
    fn content_hash_distinguishes_title_from_body() {
        let a = content_hash("title", "body");
        let b = content_hash("tit", "letitle body");
        assert_ne!(a, b);
    }

    #[test]
    fn known_sha256_vector() {
        assert_eq!(
            sha256_hex("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
