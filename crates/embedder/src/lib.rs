//! Embedder
//!
//! Produces vectors for articles that have none yet for a given
//! `(model_name, model_version)`. Batches are sequential per worker;
//! parallelism comes from running multiple workers, each claiming a
//! disjoint batch via `article_id` ordering.

mod client;
mod error;
pub mod retry;
mod serde_millis;
mod types;

use std::time::Duration;

use chrono::Utc;
use sqlx::PgPool;
use tracing::{debug, info, warn};

pub use crate::client::EmbeddingClient;
pub use crate::error::EmbedError;
pub use crate::types::EMBEDDING_DIM;

#[derive(Debug, Clone, Copy, Default)]
pub struct EmbedStats {
    pub processed: u32,
    pub embedded: u32,
    pub skipped: u32,
    pub failed: u32,
}

pub struct EmbedParams<'a> {
    pub limit: u32,
    pub batch_size: i64,
    pub endpoint: &'a str,
    pub model_name: &'a str,
    pub model_version: &'a str,
    pub max_length: Option<u32>,
    pub request_timeout: Duration,
}

/// Embeds up to `limit` pending articles in batches of `batch_size`.
pub async fn embed_pending(pool: &PgPool, params: &EmbedParams<'_>) -> Result<EmbedStats, EmbedError> {
    let client = EmbeddingClient::new(
        params.endpoint.to_string(),
        params.max_length,
        params.request_timeout,
    );

    let mut stats = EmbedStats::default();

    while stats.processed < params.limit {
        let remaining = (params.limit - stats.processed) as i64;
        let batch_size = remaining.min(params.batch_size);

        let mut conn = pool.acquire().await.map_err(store::StoreError::from)?;
        let articles = store::repo::embedding::select_pending_batch(
            &mut conn,
            params.model_name,
            params.model_version,
            batch_size,
        )
        .await?;
        drop(conn);

        if articles.is_empty() {
            break;
        }

        let texts: Vec<String> = articles
            .iter()
            .map(|article| {
                if article.normalized_text.is_empty() {
                    article.normalized_title.clone()
                } else {
                    format!("{}\n\n{}", article.normalized_title, article.normalized_text)
                }
            })
            .collect();

        stats.processed += articles.len() as u32;

        let vectors = match client.embed(&texts).await {
            Ok(vectors) => vectors,
            Err(err) => {
                warn!(error = %err, batch_size = articles.len(), "embed_batch_failed");
                stats.failed += articles.len() as u32;
                continue;
            }
        };

        let embedded_at = Utc::now();
        let mut tx = pool.begin().await.map_err(store::StoreError::from)?;
        for (article, vector) in articles.iter().zip(vectors.iter()) {
            let inserted = store::repo::embedding::insert_embedding(
                &mut tx,
                article.id,
                params.model_name,
                params.model_version,
                vector,
                params.endpoint,
                embedded_at,
            )
            .await?;

            if inserted {
                stats.embedded += 1;
                debug!(article_id = article.id, "embedded");
            } else {
                stats.skipped += 1;
            }
        }
        tx.commit().await.map_err(store::StoreError::from)?;
    }

    info!(
        processed = stats.processed,
        embedded = stats.embedded,
        skipped = stats.skipped,
        failed = stats.failed,
        "embed_pending_done"
    );

    Ok(stats)
}
