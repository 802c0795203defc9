use std::path::Path;

use sqlx::PgPool;

use super::{CliError, CliResult};

pub async fn run(pool: &PgPool, payload_file: &Path, triggered_by_topic: Option<&str>) -> CliResult {
    let raw_json = std::fs::read(payload_file).map_err(|err| {
        CliError::Validation(format!(
            "cannot read payload file {}: {err}",
            payload_file.display()
        ))
    })?;

    let outcome = ingest::ingest(pool, &raw_json, triggered_by_topic)
        .await
        .map_err(|err| match err {
            ingest::IngestError::Validation(_) | ingest::IngestError::Json(_) => {
                CliError::Validation(err.to_string())
            }
            ingest::IngestError::Store(_) => CliError::Runtime(err.to_string()),
        })?;

    println!("run_uuid={}", outcome.run_uuid);
    if let Some(raw_arrival_id) = outcome.raw_arrival_uuid {
        println!("raw_arrival_id={raw_arrival_id}");
    }
    println!("inserted={}", outcome.inserted);
    println!("payload_hash={}", outcome.payload_hash_hex);
    println!("status={}", outcome.status);

    Ok(())
}
