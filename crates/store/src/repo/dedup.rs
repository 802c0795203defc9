//! `dedup_events` access — the audit row written once per processed article.

use sqlx::PgConnection;

use crate::error::StoreResult;
use crate::types::DedupOutcome;

/// Records the cascade's decision for one article. No-ops if an event for
/// this article already exists (unique on `article_id`), which makes
/// re-running a committed decision safe.
pub async fn insert_event(
    conn: &mut PgConnection,
    article_id: i64,
    outcome: &DedupOutcome,
) -> StoreResult<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO news.dedup_events (
            article_id, decision, chosen_story_id, best_candidate_story_id,
            best_cosine, title_overlap, entity_date_consistency, composite_score, exact_signal
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        ON CONFLICT (article_id) DO NOTHING
        "#,
    )
    .bind(article_id)
    .bind(outcome.decision.as_str())
    .bind(outcome.story_id)
    .bind(outcome.best_candidate_story_id)
    .bind(outcome.best_cosine)
    .bind(outcome.title_overlap)
    .bind(outcome.entity_date_consistency)
    .bind(outcome.composite_score)
    .bind(&outcome.exact_signal)
    .execute(conn)
    .await?;

    Ok(result.rows_affected() > 0)
}
