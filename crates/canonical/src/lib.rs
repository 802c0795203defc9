//! Text and URL normalization, content hashing, and simhash fingerprinting.
//!
//! This crate is the deterministic core shared by the normalizer and the
//! dedup cascade: it turns raw scraped fields into the comparable forms
//! (`normalized_title`, `normalized_text`, `canonical_url`, hashes, simhash)
//! that every later stage keys off. It is pure — no I/O, no wall-clock
//! dependence — so the same input always produces the same output.
//!
//! ```text
//! raw_arrival ──▶ normalize/canonicalize_url/hash/simhash ──▶ article
//! ```

mod hash;
mod simhash;
mod text;
mod token;
mod url;

pub use hash::{content_hash, sha256_hex};
pub use simhash::{hamming_distance, simhash64};
pub use text::{collapse_whitespace, normalize};
pub use token::{token_jaccard, trigram_jaccard, trigrams, word_tokens};
pub use url::canonicalize_url;
