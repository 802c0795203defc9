use sqlx::PgPool;

use super::{CliError, CliResult};

pub async fn run(pool: &PgPool, limit: u32, params: &dedup::DedupParams<'_>) -> CliResult {
    let stats = dedup::dedup_pending(pool, limit, params)
        .await
        .map_err(|err| CliError::Runtime(err.to_string()))?;

    println!("processed={}", stats.processed);
    println!("new_stories={}", stats.new_stories);
    println!("auto_merges={}", stats.auto_merges);
    println!("gray_zones={}", stats.gray_zones);

    Ok(())
}
