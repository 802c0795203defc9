//! Normalizer
//!
//! Turns `raw_arrivals` into `articles`: text and URL canonicalization,
//! content hashing, and SimHash fingerprinting. Runs as a claim-and-process
//! loop — one transaction per raw arrival, so workers can run in parallel
//! over disjoint rows without coordinating.

mod build;
mod error;

use sqlx::PgPool;
use tracing::{debug, info};

pub use crate::build::build_article;
pub use crate::error::NormalizeError;

#[derive(Debug, Clone, Copy, Default)]
pub struct NormalizeStats {
    pub processed: u32,
    pub inserted: u32,
}

/// Claims up to `limit` raw arrivals that have no article yet and builds
/// one for each. A raw arrival that fails validation upstream never reaches
/// here — it is just text transformation, so it cannot fail mid-article;
/// `inserted` can still be less than `processed` when two workers race for
/// the same row and one loses the `ON CONFLICT DO NOTHING`.
pub async fn normalize_pending(pool: &PgPool, limit: u32) -> Result<NormalizeStats, NormalizeError> {
    let mut stats = NormalizeStats::default();

    for _ in 0..limit {
        let mut tx = pool.begin().await.map_err(store::StoreError::from)?;

        let Some(raw_arrival) = store::repo::article::claim_unprocessed_raw_arrival(&mut tx).await?
        else {
            tx.commit().await.map_err(store::StoreError::from)?;
            break;
        };

        stats.processed += 1;
        let new_article = build_article(&raw_arrival);
        let inserted = store::repo::article::insert_article(&mut tx, &new_article).await?;
        tx.commit().await.map_err(store::StoreError::from)?;

        if inserted.is_some() {
            stats.inserted += 1;
            debug!(raw_arrival_id = raw_arrival.id, "normalized");
        }
    }

    info!(processed = stats.processed, inserted = stats.inserted, "normalize_pending_done");
    Ok(stats)
}
