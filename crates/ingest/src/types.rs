//! The canonical v1 ingest payload (see the external interfaces section of
//! the design notes for the wire schema).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One raw item as submitted by a scraper. `source_metadata` tolerates
/// extra keys beyond the four required ones — they are preserved verbatim
/// in `raw_payload` but otherwise ignored by validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestPayload {
    pub payload_version: String,
    pub source: String,
    pub source_item_id: String,
    pub title: String,
    pub source_metadata: SourceMetadata,

    #[serde(default)]
    pub canonical_url: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub published_at: Option<String>,
    #[serde(default)]
    pub body_text: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub source_domain: Option<String>,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceMetadata {
    pub collection: String,
    pub job_name: String,
    pub job_run_id: String,
    pub scraped_at: String,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// A payload that has passed [`crate::validate::validate`]: every required
/// field is present and well-formed, and RFC3339 timestamps have been parsed.
#[derive(Debug, Clone)]
pub struct ValidatedPayload {
    pub raw: IngestPayload,
    pub scraped_at: DateTime<Utc>,
    pub published_at: Option<DateTime<Utc>>,
}

impl ValidatedPayload {
    pub fn collection(&self) -> &str {
        &self.raw.source_metadata.collection
    }
}

/// Outcome of one `Ingest` call, matching the command surface's key/value
/// output (`run_uuid`, `raw_arrival_id?`, `inserted`, `payload_hash`).
#[derive(Debug, Clone, Serialize)]
pub struct IngestOutcome {
    pub run_uuid: uuid::Uuid,
    pub raw_arrival_uuid: Option<uuid::Uuid>,
    pub inserted: bool,
    pub payload_hash_hex: String,
    pub status: String,
}
