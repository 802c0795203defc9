//! Payload validation: turns a parsed [`IngestPayload`] into a
//! [`ValidatedPayload`] or rejects it outright. No database write happens
//! until this passes — a rejected payload never reaches the store.

use chrono::{DateTime, Utc};
use url::Url;

use crate::error::ValidationError;
use crate::types::{IngestPayload, ValidatedPayload};

const SUPPORTED_VERSION: &str = "v1";

pub fn validate(raw: IngestPayload) -> Result<ValidatedPayload, ValidationError> {
    if raw.payload_version != SUPPORTED_VERSION {
        return Err(ValidationError::UnsupportedVersion(raw.payload_version));
    }

    require_nonempty(&raw.source, "source")?;
    require_nonempty(&raw.source_item_id, "source_item_id")?;
    require_nonempty(&raw.source_metadata.collection, "source_metadata.collection")?;
    require_nonempty(&raw.source_metadata.job_name, "source_metadata.job_name")?;
    require_nonempty(&raw.source_metadata.job_run_id, "source_metadata.job_run_id")?;
    require_nonempty(&raw.source_metadata.scraped_at, "source_metadata.scraped_at")?;

    if raw.title.trim().is_empty() {
        return Err(ValidationError::EmptyTitle);
    }

    let scraped_at = parse_timestamp(&raw.source_metadata.scraped_at, "source_metadata.scraped_at")?;

    let published_at = match &raw.published_at {
        Some(s) if !s.trim().is_empty() => Some(parse_timestamp(s, "published_at")?),
        _ => None,
    };

    if let Some(u) = &raw.canonical_url {
        require_uri(u, "canonical_url")?;
    }
    if let Some(u) = &raw.image_url {
        require_uri(u, "image_url")?;
    }

    Ok(ValidatedPayload {
        raw,
        scraped_at,
        published_at,
    })
}

fn require_nonempty(value: &str, field: &'static str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::MissingField(field));
    }
    Ok(())
}

fn parse_timestamp(value: &str, field: &'static str) -> Result<DateTime<Utc>, ValidationError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| ValidationError::InvalidTimestamp {
            field,
            value: value.to_string(),
        })
}

fn require_uri(value: &str, field: &'static str) -> Result<(), ValidationError> {
    Url::parse(value)
        .map(|_| ())
        .map_err(|_| ValidationError::InvalidUri {
            field,
            value: value.to_string(),
        })
}
