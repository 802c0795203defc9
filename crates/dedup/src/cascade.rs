//! The decision cascade: E1 → E2 → E3 → L → S, first match wins.

use chrono::{DateTime, Duration, Utc};
use sqlx::PgConnection;
use store::types::{Article, MatchType, StoryLexicalCandidate, StorySemanticCandidate};
use store::StoreResult;

use crate::thresholds::*;

/// An auto-merge candidate chosen by one of the cascade stages.
#[derive(Debug, Clone)]
pub struct Merge {
    pub story_id: i64,
    pub match_type: MatchType,
    pub score: f64,
    pub details: serde_json::Value,
}

/// The best semantic candidate seen, whether or not it triggered a merge —
/// carried forward so a near-miss can still be recorded as a gray zone.
#[derive(Debug, Clone)]
pub struct SemanticBest {
    pub story_id: i64,
    pub cosine: f64,
    pub title_overlap: f64,
    pub date_consistency: f64,
    pub composite: f64,
}

#[derive(Debug, Clone)]
pub enum Cascade {
    Merge(Merge),
    NoMatch { best_semantic: Option<SemanticBest> },
}

/// Runs the full cascade for `article` against its embedding, returning the
/// first matching stage or a `NoMatch` carrying the best semantic near-miss.
pub async fn run(
    conn: &mut PgConnection,
    article: &Article,
    embedding: &[f32],
    model_name: &str,
    model_version: &str,
    lookback_days: i64,
) -> StoreResult<Cascade> {
    if let Some(story_id) = exact_url(conn, article).await? {
        return Ok(Cascade::Merge(Merge {
            story_id,
            match_type: MatchType::ExactUrl,
            score: 1.0,
            details: serde_json::json!({}),
        }));
    }

    if let Some(story_id) = exact_source_identity(conn, article).await? {
        return Ok(Cascade::Merge(Merge {
            story_id,
            match_type: MatchType::ExactSourceId,
            score: 1.0,
            details: serde_json::json!({}),
        }));
    }

    if let Some(story_id) = exact_content_hash(conn, article).await? {
        return Ok(Cascade::Merge(Merge {
            story_id,
            match_type: MatchType::ExactContentHash,
            score: 1.0,
            details: serde_json::json!({}),
        }));
    }

    let cutoff = article.seen_at() - Duration::days(lookback_days);

    if let Some(merge) = lexical(conn, article, cutoff).await? {
        return Ok(Cascade::Merge(merge));
    }

    let (merge, best_semantic) = semantic(
        conn,
        article,
        embedding,
        model_name,
        model_version,
        cutoff,
    )
    .await?;

    if let Some(merge) = merge {
        return Ok(Cascade::Merge(merge));
    }

    Ok(Cascade::NoMatch { best_semantic })
}

async fn exact_url(conn: &mut PgConnection, article: &Article) -> StoreResult<Option<i64>> {
    let Some(hash) = &article.canonical_url_hash else {
        return Ok(None);
    };
    store::repo::article::find_story_by_url_hash(conn, &article.collection, hash).await
}

async fn exact_source_identity(
    conn: &mut PgConnection,
    article: &Article,
) -> StoreResult<Option<i64>> {
    store::repo::article::find_story_by_source_identity(
        conn,
        &article.collection,
        &article.source,
        &article.source_item_id,
    )
    .await
}

async fn exact_content_hash(
    conn: &mut PgConnection,
    article: &Article,
) -> StoreResult<Option<i64>> {
    store::repo::article::find_story_by_content_hash(conn, &article.collection, &article.content_hash)
        .await
}

async fn lexical(
    conn: &mut PgConnection,
    article: &Article,
    cutoff: DateTime<Utc>,
) -> StoreResult<Option<Merge>> {
    let candidates = store::repo::story::lexical_candidates(
        conn,
        &article.collection,
        cutoff,
        LEXICAL_CANDIDATE_LIMIT,
    )
    .await?;

    if let Some(merge) = best_simhash_match(article, &candidates) {
        return Ok(Some(merge));
    }

    Ok(best_trigram_match(article, &candidates))
}

fn best_simhash_match(article: &Article, candidates: &[StoryLexicalCandidate]) -> Option<Merge> {
    let article_simhash = article.title_simhash? as u64;

    let mut best: Option<(u32, &StoryLexicalCandidate)> = None;
    for candidate in candidates {
        let Some(cand_simhash) = candidate.title_simhash else {
            continue;
        };
        let distance = canonical::hamming_distance(article_simhash, cand_simhash as u64);
        if distance > SIMHASH_MAX_DISTANCE {
            continue;
        }
        best = match best {
            None => Some((distance, candidate)),
            Some((best_distance, best_candidate)) => {
                if distance < best_distance
                    || (distance == best_distance
                        && candidate.last_seen_at > best_candidate.last_seen_at)
                {
                    Some((distance, candidate))
                } else {
                    Some((best_distance, best_candidate))
                }
            }
        };
    }

    best.map(|(distance, candidate)| Merge {
        story_id: candidate.story_id,
        match_type: MatchType::LexicalSimhash,
        score: 1.0 - (distance as f64 / 64.0),
        details: serde_json::json!({ "hamming_distance": distance }),
    })
}

fn best_trigram_match(article: &Article, candidates: &[StoryLexicalCandidate]) -> Option<Merge> {
    let published_at = article.published_at?;

    let mut best: Option<(f64, &StoryLexicalCandidate, f64)> = None;
    for candidate in candidates {
        let delta = (published_at - candidate.last_seen_at).num_seconds().abs();
        if delta > Duration::days(LEXICAL_DATE_WINDOW_DAYS).num_seconds() {
            continue;
        }

        let overlap = canonical::trigram_jaccard(&article.normalized_title, &candidate.title);
        if overlap < TRIGRAM_JACCARD_MIN {
            continue;
        }

        let date_consistency = date_consistency_scale(delta / 3600);
        let composite = 0.8 * overlap + 0.2 * date_consistency;

        best = match best {
            None => Some((composite, candidate, overlap)),
            Some((best_composite, _, _)) if composite > best_composite => {
                Some((composite, candidate, overlap))
            }
            other => other,
        };
    }

    best.map(|(composite, candidate, overlap)| Merge {
        story_id: candidate.story_id,
        match_type: MatchType::LexicalOverlap,
        score: composite,
        details: serde_json::json!({ "trigram_jaccard": overlap }),
    })
}

/// Shared date-consistency scale (hours since publication vs. candidate's
/// `last_seen_at`): `<=48h -> 1.0`, `<=7d -> 0.6`, else `0.0`.
fn date_consistency_scale(delta_hours: i64) -> f64 {
    if delta_hours <= 48 {
        1.0
    } else if delta_hours <= 24 * 7 {
        0.6
    } else {
        0.0
    }
}

async fn semantic(
    conn: &mut PgConnection,
    article: &Article,
    embedding: &[f32],
    model_name: &str,
    model_version: &str,
    cutoff: DateTime<Utc>,
) -> StoreResult<(Option<Merge>, Option<SemanticBest>)> {
    let candidates = store::repo::story::semantic_candidates(
        conn,
        &article.collection,
        model_name,
        model_version,
        embedding,
        cutoff,
        SEMANTIC_EF_SEARCH,
        SEMANTIC_K,
    )
    .await?;

    let mut best_semantic: Option<SemanticBest> = None;

    for candidate in &candidates {
        let scored = score_semantic_candidate(article, candidate);

        if best_semantic.is_none() {
            best_semantic = Some(scored.clone());
        }

        if scored.cosine >= SEMANTIC_COSINE_STRONG
            || (scored.cosine >= SEMANTIC_COSINE_WEAK
                && scored.title_overlap >= SEMANTIC_TITLE_OVERLAP_MIN)
        {
            let merge = Merge {
                story_id: scored.story_id,
                match_type: MatchType::Semantic,
                score: scored.composite,
                details: serde_json::json!({
                    "cosine": scored.cosine,
                    "title_overlap": scored.title_overlap,
                    "date_consistency": scored.date_consistency,
                }),
            };
            return Ok((Some(merge), best_semantic));
        }
    }

    Ok((None, best_semantic))
}

fn score_semantic_candidate(
    article: &Article,
    candidate: &StorySemanticCandidate,
) -> SemanticBest {
    let cosine = (1.0 - candidate.cosine_distance).clamp(-1.0, 1.0);
    let title_overlap = canonical::token_jaccard(&article.normalized_title, &candidate.title);
    let date_consistency = match article.published_at {
        None => 0.5,
        Some(published_at) => {
            date_consistency_scale((published_at - candidate.last_seen_at).num_hours().abs())
        }
    };
    let composite =
        (0.75 * cosine + 0.15 * title_overlap + 0.10 * date_consistency).clamp(0.0, 1.0);

    SemanticBest {
        story_id: candidate.story_id,
        cosine,
        title_overlap,
        date_consistency,
        composite,
    }
}

/// `true` if `cosine` falls in the gray zone band — recorded only when no
/// stage triggered an auto-merge.
pub fn is_gray_zone(cosine: f64) -> bool {
    (GRAY_ZONE_COSINE_LOW..GRAY_ZONE_COSINE_HIGH).contains(&cosine)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use uuid::Uuid;

    fn article(title: &str, published_at: Option<DateTime<Utc>>) -> Article {
        Article {
            id: 1,
            uuid: Uuid::nil(),
            raw_arrival_id: 1,
            source: "example-wire".to_string(),
            source_item_id: "abc-123".to_string(),
            collection: "world-news".to_string(),
            canonical_url: None,
            canonical_url_hash: None,
            normalized_title: canonical::normalize(title),
            normalized_text: String::new(),
            normalized_language: "en".to_string(),
            published_at,
            source_domain: None,
            title_simhash: canonical::simhash64(canonical::word_tokens(&canonical::normalize(title)))
                .map(|h| h as i64),
            text_simhash: None,
            title_hash: canonical::sha256_hex(title),
            content_hash: canonical::sha256_hex(title),
            token_count: 0,
            created_at: Utc.with_ymd_and_hms(2026, 7, 28, 0, 0, 0).unwrap(),
            updated_at: Utc.with_ymd_and_hms(2026, 7, 28, 0, 0, 0).unwrap(),
            deleted_at: None,
        }
    }

    fn lexical_candidate(story_id: i64, title: &str, last_seen_at: DateTime<Utc>) -> StoryLexicalCandidate {
        let normalized = canonical::normalize(title);
        StoryLexicalCandidate {
            story_id,
            last_seen_at,
            title_simhash: canonical::simhash64(canonical::word_tokens(&normalized)).map(|h| h as i64),
            title: normalized,
        }
    }

    #[test]
    fn simhash_wins_over_trigram_when_both_match() {
        let a = article("OpenAI releases GPT-6 with new reasoning mode", None);
        let now = Utc.with_ymd_and_hms(2026, 7, 28, 0, 0, 0).unwrap();
        let candidates = vec![lexical_candidate(
            42,
            "OpenAI releases GPT-6 with new reasoning mode",
            now,
        )];

        let merge = best_simhash_match(&a, &candidates).expect("expected simhash match");
        assert_eq!(merge.story_id, 42);
        assert_eq!(merge.match_type, MatchType::LexicalSimhash);
    }

    #[test]
    fn trigram_requires_non_null_published_at() {
        let a = article("Completely different headline text here", None);
        let now = Utc.with_ymd_and_hms(2026, 7, 28, 0, 0, 0).unwrap();
        let candidates = vec![lexical_candidate(7, "Completely different headline text", now)];

        assert!(best_trigram_match(&a, &candidates).is_none());
    }

    #[test]
    fn trigram_respects_the_date_window_gate() {
        let published = Utc.with_ymd_and_hms(2026, 7, 28, 0, 0, 0).unwrap();
        let a = article("A long headline about the world today", Some(published));
        let too_old = published - Duration::days(30);
        let candidates = vec![lexical_candidate(9, "A long headline about the world today", too_old)];

        assert!(best_trigram_match(&a, &candidates).is_none());
    }

    #[test]
    fn gray_zone_band_is_half_open() {
        assert!(!is_gray_zone(0.889));
        assert!(is_gray_zone(0.89));
        assert!(is_gray_zone(0.93));
        assert!(!is_gray_zone(0.935));
    }

    #[test]
    fn semantic_score_clamps_composite_into_unit_interval() {
        let a = article("Headline about something", Some(Utc.with_ymd_and_hms(2026, 7, 28, 0, 0, 0).unwrap()));
        let candidate = StorySemanticCandidate {
            story_id: 5,
            last_seen_at: Utc.with_ymd_and_hms(2026, 7, 28, 1, 0, 0).unwrap(),
            title: "Headline about something else entirely".to_string(),
            cosine_distance: 0.01,
        };

        let scored = score_semantic_candidate(&a, &candidate);
        assert!((0.0..=1.0).contains(&scored.composite));
        assert!(scored.cosine > 0.98);
    }
}
