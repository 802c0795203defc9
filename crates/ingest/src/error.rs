//! Error types produced by the `ingest` crate.

use thiserror::Error;

/// Payload validation failures (the spec's `ValidationError`). Surfaced to
/// the caller before any database write — no partial state ever results
/// from one of these.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ValidationError {
    #[error("unsupported payload_version: {0} (expected \"v1\")")]
    UnsupportedVersion(String),
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("title is empty after trim")]
    EmptyTitle,
    #[error("invalid RFC3339 timestamp in field {field}: {value}")]
    InvalidTimestamp { field: &'static str, value: String },
    #[error("invalid URI in field {field}: {value}")]
    InvalidUri { field: &'static str, value: String },
}
