use std::time::Duration;

use sqlx::PgPool;
use tracing::info;

use super::{CliError, CliResult};

pub struct Args<'a> {
    pub until_empty: bool,
    pub max_cycles: Option<u32>,
    pub limit: u32,
    pub batch_size: i64,
    pub endpoint: &'a str,
    pub model_name: &'a str,
    pub model_version: &'a str,
    pub lookback_days: i64,
    pub request_timeout: Duration,
}

/// Runs normalize, embed, and dedup once per cycle, in that order, since
/// each stage's output feeds the next. Stops when `max_cycles` is reached,
/// or when `until_empty` is set and a whole cycle processes nothing.
pub async fn run(pool: &PgPool, args: &Args<'_>) -> CliResult {
    let mut cycles = 0u32;
    let mut total_processed = 0u64;

    loop {
        if let Some(max) = args.max_cycles {
            if cycles >= max {
                break;
            }
        }

        let normalize_stats = normalize::normalize_pending(pool, args.limit)
            .await
            .map_err(|err| CliError::Runtime(err.to_string()))?;

        let embed_params = embedder::EmbedParams {
            limit: args.limit,
            batch_size: args.batch_size,
            endpoint: args.endpoint,
            model_name: args.model_name,
            model_version: args.model_version,
            max_length: None,
            request_timeout: args.request_timeout,
        };
        let embed_stats = embedder::embed_pending(pool, &embed_params)
            .await
            .map_err(|err| CliError::Runtime(err.to_string()))?;

        let dedup_params = dedup::DedupParams {
            model_name: args.model_name,
            model_version: args.model_version,
            lookback_days: args.lookback_days,
        };
        let dedup_stats = dedup::dedup_pending(pool, args.limit, &dedup_params)
            .await
            .map_err(|err| CliError::Runtime(err.to_string()))?;

        let cycle_processed = normalize_stats.processed as u64
            + embed_stats.processed as u64
            + dedup_stats.processed as u64;
        total_processed += cycle_processed;
        cycles += 1;

        info!(
            cycle = cycles,
            normalized = normalize_stats.processed,
            embedded = embed_stats.embedded,
            deduped = dedup_stats.processed,
            "process_cycle_done"
        );

        if !args.until_empty || cycle_processed == 0 {
            break;
        }
    }

    println!("cycles={cycles}");
    println!("processed={total_processed}");

    Ok(())
}
