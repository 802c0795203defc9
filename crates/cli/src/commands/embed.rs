use std::time::Duration;

use sqlx::PgPool;

use super::{CliError, CliResult};

pub struct Args<'a> {
    pub limit: u32,
    pub batch_size: i64,
    pub endpoint: &'a str,
    pub model_name: &'a str,
    pub model_version: &'a str,
    pub max_length: Option<u32>,
    pub request_timeout: Duration,
}

pub async fn run(pool: &PgPool, args: &Args<'_>) -> CliResult {
    let params = embedder::EmbedParams {
        limit: args.limit,
        batch_size: args.batch_size,
        endpoint: args.endpoint,
        model_name: args.model_name,
        model_version: args.model_version,
        max_length: args.max_length,
        request_timeout: args.request_timeout,
    };

    let stats = embedder::embed_pending(pool, &params)
        .await
        .map_err(|err| CliError::Runtime(err.to_string()))?;

    println!("processed={}", stats.processed);
    println!("embedded={}", stats.embedded);
    println!("skipped={}", stats.skipped);
    println!("failed={}", stats.failed);

    Ok(())
}
