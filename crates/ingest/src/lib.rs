//! Ingest Recorder
//!
//! Validates one scraper payload, computes its `payload_hash`, and records
//! it as a `raw_arrivals` row — one transaction per call, idempotent on
//! `(source, source_item_id, payload_hash)`. Turning a raw arrival into an
//! `article` is the normalizer's job, not this crate's.
//!
//! ## Main entry point
//!
//! Call [`ingest`] with the raw scraper JSON and a pool; get back an
//! [`IngestOutcome`]. Errors are typed so the caller can map them to the
//! command surface's exit codes.

use std::time::Instant;

use serde_json::Value;
use sqlx::PgPool;
use thiserror::Error;
use tracing::{info, warn, Level};

mod error;
mod hash;
mod types;
mod validate;

use store::repo::ingest as ingest_repo;
use store::StoreError;

pub use crate::error::ValidationError;
pub use crate::hash::payload_hash;
pub use crate::types::{IngestOutcome, IngestPayload, SourceMetadata, ValidatedPayload};

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("invalid payload: {0}")]
    Validation(#[from] ValidationError),
    #[error("payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Validates `raw_json` as a v1 ingest payload and records it. Returns
/// `inserted = false` on a duplicate resubmission — that is success, not
/// an error.
pub async fn ingest(
    pool: &PgPool,
    raw_json: &[u8],
    triggered_by_topic: Option<&str>,
) -> Result<IngestOutcome, IngestError> {
    let start = Instant::now();

    match ingest_inner(pool, raw_json, triggered_by_topic).await {
        Ok(outcome) => {
            info!(
                run_uuid = %outcome.run_uuid,
                inserted = outcome.inserted,
                payload_hash = %outcome.payload_hash_hex,
                elapsed_micros = start.elapsed().as_micros(),
                "ingest_success"
            );
            Ok(outcome)
        }
        Err(err) => {
            warn!(error = %err, elapsed_micros = start.elapsed().as_micros(), "ingest_failure");
            Err(err)
        }
    }
}

async fn ingest_inner(
    pool: &PgPool,
    raw_json: &[u8],
    triggered_by_topic: Option<&str>,
) -> Result<IngestOutcome, IngestError> {
    let payload: IngestPayload = serde_json::from_slice(raw_json)?;
    let validated = validate::validate(payload)?;
    let hash = hash::payload_hash(&validated.raw);
    let raw_value: Value = serde_json::to_value(&validated.raw)?;

    // The run row is committed on its own, before any of the work it
    // describes is attempted, so a failure downstream still has a `run_id`
    // to record `failed` against instead of rolling the run itself away.
    let mut start_tx = ingest_repo::begin(pool).await?;
    let (run_id, run_uuid) =
        ingest_repo::start_run(&mut start_tx, &validated.raw.source, triggered_by_topic).await?;
    start_tx.commit().await.map_err(StoreError::from)?;

    match record_arrival(pool, run_id, &validated, &raw_value, &hash).await {
        Ok(insert_outcome) => {
            let status = if insert_outcome.inserted {
                "inserted"
            } else {
                "duplicate"
            };

            Ok(IngestOutcome {
                run_uuid,
                raw_arrival_uuid: Some(insert_outcome.uuid),
                inserted: insert_outcome.inserted,
                payload_hash_hex: hash,
                status: status.to_string(),
            })
        }
        Err(err) => {
            if let Ok(mut conn) = pool.acquire().await {
                let _ = ingest_repo::fail_run(&mut conn, run_id, &err.to_string()).await;
            }
            Err(err)
        }
    }
}

async fn record_arrival(
    pool: &PgPool,
    run_id: i64,
    validated: &crate::types::ValidatedPayload,
    raw_value: &Value,
    hash: &str,
) -> Result<store::types::RawArrivalInsert, IngestError> {
    let mut tx = ingest_repo::begin(pool).await?;

    let insert_outcome = ingest_repo::insert_raw_arrival(
        &mut tx,
        run_id,
        &validated.raw.source,
        &validated.raw.source_item_id,
        validated.collection(),
        validated.raw.canonical_url.as_deref(),
        validated.published_at,
        raw_value,
        hash,
        None,
    )
    .await?;

    let items_inserted = if insert_outcome.inserted { 1 } else { 0 };
    ingest_repo::complete_run(&mut tx, run_id, items_inserted).await?;
    tx.commit().await.map_err(StoreError::from)?;

    Ok(insert_outcome)
}

/// Runs [`ingest`] and, on success, advances the source checkpoint so the
/// next scheduled run knows where it left off.
pub async fn ingest_and_checkpoint(
    pool: &PgPool,
    raw_json: &[u8],
    triggered_by_topic: Option<&str>,
    cursor: &Value,
) -> Result<IngestOutcome, IngestError> {
    let payload: IngestPayload = serde_json::from_slice(raw_json)?;
    let source = payload.source.clone();
    let source_item_id = payload.source_item_id.clone();

    let outcome = ingest(pool, raw_json, triggered_by_topic).await?;

    let mut conn = pool.acquire().await.map_err(StoreError::from)?;
    ingest_repo::upsert_checkpoint(&mut conn, &source, Some(&source_item_id), cursor).await?;

    Ok(outcome)
}
