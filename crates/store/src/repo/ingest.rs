//! `ingest_runs`, `raw_arrivals`, and `source_checkpoints` access.

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{PgConnection, Postgres, Row, Transaction};

use uuid::Uuid;

use crate::error::StoreResult;
use crate::types::{IngestRun, RawArrivalInsert};

/// Inserts a new `running` ingest-run row and returns its id and uuid.
pub async fn start_run(
    conn: &mut PgConnection,
    source: &str,
    triggered_by_topic: Option<&str>,
) -> StoreResult<(i64, Uuid)> {
    let row = sqlx::query(
        r#"
        INSERT INTO news.ingest_runs (source, triggered_by_topic, status)
        VALUES ($1, $2, 'running')
        RETURNING id, uuid
        "#,
    )
    .bind(source)
    .bind(triggered_by_topic)
    .fetch_one(conn)
    .await?;

    Ok((row.get("id"), row.get("uuid")))
}

/// Marks a run `completed` with the number of rows it inserted (0 or 1).
pub async fn complete_run(
    conn: &mut PgConnection,
    run_id: i64,
    items_inserted: i32,
) -> StoreResult<()> {
    sqlx::query(
        r#"
        UPDATE news.ingest_runs
        SET status = 'completed', items_inserted = $2, finished_at = now()
        WHERE id = $1
        "#,
    )
    .bind(run_id)
    .bind(items_inserted)
    .execute(conn)
    .await?;

    Ok(())
}

/// Marks a run `failed`, truncating the error message to 4000 chars.
pub async fn fail_run(conn: &mut PgConnection, run_id: i64, error: &str) -> StoreResult<()> {
    let truncated: String = error.chars().take(4000).collect();

    sqlx::query(
        r#"
        UPDATE news.ingest_runs
        SET status = 'failed', error_message = $2, finished_at = now()
        WHERE id = $1
        "#,
    )
    .bind(run_id)
    .bind(truncated)
    .execute(conn)
    .await?;

    Ok(())
}

pub async fn get_run(conn: &mut PgConnection, run_id: i64) -> StoreResult<Option<IngestRun>> {
    let row = sqlx::query_as::<_, IngestRun>(
        r#"SELECT id, uuid, source, triggered_by_topic, status, items_inserted,
                  error_message, started_at, finished_at
           FROM news.ingest_runs WHERE id = $1"#,
    )
    .bind(run_id)
    .fetch_optional(conn)
    .await?;

    Ok(row)
}

/// Inserts a raw arrival, no-op-ing on a duplicate `(source, source_item_id,
/// payload_hash)`. Idempotent: a duplicate re-submit returns `inserted = false`
/// without being treated as an error.
#[allow(clippy::too_many_arguments)]
pub async fn insert_raw_arrival(
    conn: &mut PgConnection,
    run_id: i64,
    source: &str,
    source_item_id: &str,
    collection: &str,
    source_item_url: Option<&str>,
    source_published_at: Option<DateTime<Utc>>,
    raw_payload: &Value,
    payload_hash: &str,
    response_headers: Option<&Value>,
) -> StoreResult<RawArrivalInsert> {
    let existing = sqlx::query(
        r#"SELECT id, uuid FROM news.raw_arrivals
           WHERE source = $1 AND source_item_id = $2 AND payload_hash = $3"#,
    )
    .bind(source)
    .bind(source_item_id)
    .bind(payload_hash)
    .fetch_optional(&mut *conn)
    .await?;

    if let Some(existing) = existing {
        return Ok(RawArrivalInsert {
            id: existing.get("id"),
            uuid: existing.get("uuid"),
            inserted: false,
        });
    }

    let inserted = sqlx::query(
        r#"
        INSERT INTO news.raw_arrivals (
            run_id, source, source_item_id, collection, source_item_url,
            source_published_at, raw_payload, payload_hash, response_headers
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        ON CONFLICT (source, source_item_id, payload_hash) DO NOTHING
        RETURNING id, uuid
        "#,
    )
    .bind(run_id)
    .bind(source)
    .bind(source_item_id)
    .bind(collection)
    .bind(source_item_url)
    .bind(source_published_at)
    .bind(raw_payload)
    .bind(payload_hash)
    .bind(response_headers)
    .fetch_optional(&mut *conn)
    .await?;

    match inserted {
        Some(row) => Ok(RawArrivalInsert {
            id: row.get("id"),
            uuid: row.get("uuid"),
            inserted: true,
        }),
        // Lost the race against a concurrent identical insert between the
        // lookup above and the insert; re-read so the caller still gets an id.
        None => {
            let row = sqlx::query(
                r#"SELECT id, uuid FROM news.raw_arrivals
                   WHERE source = $1 AND source_item_id = $2 AND payload_hash = $3"#,
            )
            .bind(source)
            .bind(source_item_id)
            .bind(payload_hash)
            .fetch_one(conn)
            .await?;
            Ok(RawArrivalInsert {
                id: row.get("id"),
                uuid: row.get("uuid"),
                inserted: false,
            })
        }
    }
}

/// Upserts the per-source cursor used by the next ingest run.
pub async fn upsert_checkpoint(
    conn: &mut PgConnection,
    source: &str,
    last_source_item_id: Option<&str>,
    cursor: &Value,
) -> StoreResult<()> {
    sqlx::query(
        r#"
        INSERT INTO news.source_checkpoints (source, last_source_item_id, cursor, updated_at)
        VALUES ($1, $2, $3, now())
        ON CONFLICT (source) DO UPDATE
        SET last_source_item_id = EXCLUDED.last_source_item_id,
            cursor = EXCLUDED.cursor,
            updated_at = now()
        "#,
    )
    .bind(source)
    .bind(last_source_item_id)
    .bind(cursor)
    .execute(conn)
    .await?;

    Ok(())
}

pub async fn begin(pool: &sqlx::PgPool) -> StoreResult<Transaction<'_, Postgres>> {
    Ok(pool.begin().await?)
}
