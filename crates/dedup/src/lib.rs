//! Deduper — the core algorithm.
//!
//! Runs the decision cascade (exact URL → exact source identity → exact
//! content hash → lexical → semantic) for one article per transaction,
//! writes exactly one `story_article` and one `dedup_event`, and commits.
//! Every candidate query is scoped to the article's `collection` and to
//! `status = 'active'` stories — cross-collection merges are impossible by
//! construction.

mod cascade;
mod error;
mod thresholds;

use sqlx::PgPool;
use store::types::{Decision, MatchType};
use tracing::{debug, info};

pub use crate::cascade::{is_gray_zone, Cascade, Merge, SemanticBest};
pub use crate::error::DedupError;

#[derive(Debug, Clone, Copy, Default)]
pub struct DedupStats {
    pub processed: u32,
    pub new_stories: u32,
    pub auto_merges: u32,
    pub gray_zones: u32,
}

pub struct DedupParams<'a> {
    pub model_name: &'a str,
    pub model_version: &'a str,
    pub lookback_days: i64,
}

/// Claims up to `limit` articles that have an embedding for
/// `(model_name, model_version)` and no `story_article` row, and makes one
/// decision per article.
pub async fn dedup_pending(
    pool: &PgPool,
    limit: u32,
    params: &DedupParams<'_>,
) -> Result<DedupStats, DedupError> {
    let mut stats = DedupStats::default();

    for _ in 0..limit {
        let mut tx = pool.begin().await.map_err(store::StoreError::from)?;

        let Some(article) = store::repo::story::claim_article_pending_dedup(
            &mut tx,
            params.model_name,
            params.model_version,
        )
        .await?
        else {
            tx.commit().await.map_err(store::StoreError::from)?;
            break;
        };

        stats.processed += 1;

        let Some(embedding) = store::repo::embedding::get_embedding(
            &mut tx,
            article.id,
            params.model_name,
            params.model_version,
        )
        .await?
        else {
            // Claimed via a join on article_embeddings, so this should not
            // happen; skip defensively and let the next cycle retry.
            tx.rollback().await.map_err(store::StoreError::from)?;
            continue;
        };

        let decision = cascade::run(
            &mut tx,
            &article,
            &embedding,
            params.model_name,
            params.model_version,
            params.lookback_days,
        )
        .await?;

        let outcome = match decision {
            Cascade::Merge(merge) => {
                store::repo::story::link_article(
                    &mut tx,
                    merge.story_id,
                    article.id,
                    merge.match_type,
                    Some(merge.score),
                    &merge.details,
                )
                .await?;
                store::repo::story::refresh_story_aggregates(&mut tx, merge.story_id, article.seen_at())
                    .await?;

                stats.auto_merges += 1;
                debug!(article_id = article.id, story_id = merge.story_id, match_type = merge.match_type.as_str(), "auto_merge");

                store::types::DedupOutcome {
                    decision: Decision::AutoMerge,
                    story_id: Some(merge.story_id),
                    match_type: Some(merge.match_type),
                    match_score: Some(merge.score),
                    match_details: merge.details,
                    best_candidate_story_id: None,
                    best_cosine: None,
                    title_overlap: None,
                    entity_date_consistency: None,
                    composite_score: None,
                    exact_signal: exact_signal_label(merge.match_type),
                }
            }
            Cascade::NoMatch { best_semantic } => {
                let story = store::repo::story::create_story(&mut tx, &article).await?;
                store::repo::story::link_article(
                    &mut tx,
                    story.id,
                    article.id,
                    MatchType::Seed,
                    None,
                    &serde_json::json!({}),
                )
                .await?;

                let gray_zone = best_semantic
                    .as_ref()
                    .map(|b| is_gray_zone(b.cosine))
                    .unwrap_or(false);

                if gray_zone {
                    stats.gray_zones += 1;
                } else {
                    stats.new_stories += 1;
                }
                debug!(article_id = article.id, story_id = story.id, gray_zone, "new_story");

                let best = best_semantic.filter(|_| gray_zone);
                store::types::DedupOutcome {
                    decision: if gray_zone {
                        Decision::GrayZone
                    } else {
                        Decision::NewStory
                    },
                    story_id: Some(story.id),
                    match_type: None,
                    match_score: None,
                    match_details: serde_json::json!({}),
                    best_candidate_story_id: best.as_ref().map(|b| b.story_id),
                    best_cosine: best.as_ref().map(|b| b.cosine),
                    title_overlap: best.as_ref().map(|b| b.title_overlap),
                    entity_date_consistency: best.as_ref().map(|b| b.date_consistency),
                    composite_score: best.as_ref().map(|b| b.composite),
                    exact_signal: None,
                }
            }
        };

        store::repo::dedup::insert_event(&mut tx, article.id, &outcome).await?;
        tx.commit().await.map_err(store::StoreError::from)?;
    }

    info!(
        processed = stats.processed,
        new_stories = stats.new_stories,
        auto_merges = stats.auto_merges,
        gray_zones = stats.gray_zones,
        "dedup_pending_done"
    );

    Ok(stats)
}

fn exact_signal_label(match_type: MatchType) -> Option<String> {
    match match_type {
        MatchType::ExactUrl
        | MatchType::ExactSourceId
        | MatchType::ExactContentHash
        | MatchType::Semantic => Some(match_type.as_str().to_string()),
        _ => None,
    }
}
