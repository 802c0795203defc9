use sqlx::PgPool;

use super::{CliError, CliResult};

pub async fn run(pool: &PgPool, limit: u32) -> CliResult {
    let stats = normalize::normalize_pending(pool, limit)
        .await
        .map_err(|err| CliError::Runtime(err.to_string()))?;

    println!("processed={}", stats.processed);
    println!("inserted={}", stats.inserted);

    Ok(())
}
