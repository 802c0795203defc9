//! `stories` / `story_articles` access for the dedup cascade.

use chrono::{DateTime, Utc};
use pgvector::Vector;
use sqlx::{PgConnection, Row};

use crate::error::StoreResult;
use crate::types::{Article, MatchType, Story, StoryLexicalCandidate, StorySemanticCandidate};

/// Claims one article that has an embedding for `(model_name, model_version)`
/// and no `story_article` row yet. Locks the article row so concurrent
/// dedup workers claim disjoint rows.
pub async fn claim_article_pending_dedup(
    conn: &mut PgConnection,
    model_name: &str,
    model_version: &str,
) -> StoreResult<Option<Article>> {
    let row = sqlx::query_as::<_, Article>(
        r#"
        SELECT a.id, a.uuid, a.raw_arrival_id, a.source, a.source_item_id, a.collection,
               a.canonical_url, a.canonical_url_hash, a.normalized_title, a.normalized_text,
               a.normalized_language, a.published_at, a.source_domain, a.title_simhash,
               a.text_simhash, a.title_hash, a.content_hash, a.token_count,
               a.created_at, a.updated_at, a.deleted_at
        FROM news.articles a
        JOIN news.article_embeddings e
          ON e.article_id = a.id AND e.model_name = $1 AND e.model_version = $2
        LEFT JOIN news.story_articles sa ON sa.article_id = a.id
        WHERE sa.article_id IS NULL AND a.deleted_at IS NULL
        ORDER BY a.id ASC
        FOR UPDATE OF a SKIP LOCKED
        LIMIT 1
        "#,
    )
    .bind(model_name)
    .bind(model_version)
    .fetch_optional(conn)
    .await?;

    Ok(row)
}

/// Loads up to `limit` active stories in `collection` with
/// `last_seen_at >= cutoff`, most-recent-first, joined to their
/// representative article's title and title simhash (Stage L).
pub async fn lexical_candidates(
    conn: &mut PgConnection,
    collection: &str,
    cutoff: DateTime<Utc>,
    limit: i64,
) -> StoreResult<Vec<StoryLexicalCandidate>> {
    let rows = sqlx::query_as::<_, StoryLexicalCandidate>(
        r#"
        SELECT s.id AS story_id, s.last_seen_at, ra.normalized_title AS title, ra.title_simhash
        FROM news.stories s
        JOIN news.articles ra ON ra.id = s.representative_article_id
        WHERE s.collection = $1 AND s.status = 'active' AND s.last_seen_at >= $2
        ORDER BY s.last_seen_at DESC
        LIMIT $3
        "#,
    )
    .bind(collection)
    .bind(cutoff)
    .bind(limit)
    .fetch_all(conn)
    .await?;

    Ok(rows)
}

/// Retrieves the top `k` active same-collection stories by ascending cosine
/// distance against `query_embedding`, restricted to `last_seen_at >= cutoff`
/// and the given model (Stage S). Sets `hnsw.ef_search` for this transaction
/// only — it does not leak to other transactions on the same connection pool.
pub async fn semantic_candidates(
    conn: &mut PgConnection,
    collection: &str,
    model_name: &str,
    model_version: &str,
    query_embedding: &[f32],
    cutoff: DateTime<Utc>,
    ef_search: i32,
    k: i64,
) -> StoreResult<Vec<StorySemanticCandidate>> {
    sqlx::query(&format!("SET LOCAL hnsw.ef_search = {ef_search}"))
        .execute(&mut *conn)
        .await?;

    let query_vector = Vector::from(query_embedding.to_vec());

    let rows = sqlx::query_as::<_, StorySemanticCandidate>(
        r#"
        SELECT s.id AS story_id, s.last_seen_at, ra.normalized_title AS title,
               (e.embedding <=> $5) AS cosine_distance
        FROM news.stories s
        JOIN news.articles ra ON ra.id = s.representative_article_id
        JOIN news.article_embeddings e
          ON e.article_id = ra.id AND e.model_name = $2 AND e.model_version = $3
        WHERE s.collection = $1 AND s.status = 'active' AND s.last_seen_at >= $4
        ORDER BY e.embedding <=> $5 ASC
        LIMIT $6
        "#,
    )
    .bind(collection)
    .bind(model_name)
    .bind(model_version)
    .bind(cutoff)
    .bind(query_vector)
    .bind(k)
    .fetch_all(conn)
    .await?;

    Ok(rows)
}

/// Seeds a new story from `article`.
pub async fn create_story(
    conn: &mut PgConnection,
    article: &Article,
) -> StoreResult<Story> {
    let seen_at = article.seen_at();

    let row = sqlx::query_as::<_, Story>(
        r#"
        INSERT INTO news.stories (
            collection, canonical_title, canonical_url, canonical_url_hash,
            representative_article_id, first_seen_at, last_seen_at,
            source_count, article_count, status
        )
        VALUES ($1, $2, $3, $4, $5, $6, $6, 1, 1, 'active')
        RETURNING id, uuid, collection, canonical_title, canonical_url, canonical_url_hash,
                  representative_article_id, first_seen_at, last_seen_at,
                  source_count, article_count, status, created_at, updated_at, deleted_at
        "#,
    )
    .bind(&article.collection)
    .bind(&article.normalized_title)
    .bind(&article.canonical_url)
    .bind(&article.canonical_url_hash)
    .bind(article.id)
    .bind(seen_at)
    .fetch_one(conn)
    .await?;

    Ok(row)
}

/// Links an article to a story. No-ops if the article is already a member
/// of some story (unique on `article_id`), which makes re-running a
/// committed decision safe.
pub async fn link_article(
    conn: &mut PgConnection,
    story_id: i64,
    article_id: i64,
    match_type: MatchType,
    match_score: Option<f64>,
    match_details: &serde_json::Value,
) -> StoreResult<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO news.story_articles (story_id, article_id, match_type, match_score, match_details)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (article_id) DO NOTHING
        "#,
    )
    .bind(story_id)
    .bind(article_id)
    .bind(match_type.as_str())
    .bind(match_score)
    .bind(match_details)
    .execute(conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Recomputes `first_seen_at`/`last_seen_at`/`source_count`/`article_count`
/// over a story's current membership. The representative article and its
/// canonical title/URL are sticky to the seed and never touched here.
pub async fn refresh_story_aggregates(
    conn: &mut PgConnection,
    story_id: i64,
    seen_at: DateTime<Utc>,
) -> StoreResult<()> {
    sqlx::query(
        r#"
        UPDATE news.stories s
        SET first_seen_at = LEAST(s.first_seen_at, $2),
            last_seen_at = GREATEST(s.last_seen_at, $2),
            source_count = (
                SELECT COUNT(DISTINCT a.source)
                FROM news.story_articles sa
                JOIN news.articles a ON a.id = sa.article_id
                WHERE sa.story_id = s.id
            ),
            article_count = (
                SELECT COUNT(*)
                FROM news.story_articles sa
                WHERE sa.story_id = s.id
            ),
            updated_at = now()
        WHERE s.id = $1
        "#,
    )
    .bind(story_id)
    .bind(seen_at)
    .execute(conn)
    .await?;

    Ok(())
}

pub async fn get_story(conn: &mut PgConnection, story_id: i64) -> StoreResult<Option<Story>> {
    let row = sqlx::query_as::<_, Story>(
        r#"SELECT id, uuid, collection, canonical_title, canonical_url, canonical_url_hash,
                  representative_article_id, first_seen_at, last_seen_at,
                  source_count, article_count, status, created_at, updated_at, deleted_at
           FROM news.stories WHERE id = $1"#,
    )
    .bind(story_id)
    .fetch_optional(conn)
    .await?;

    Ok(row)
}

/// Row count over a story's membership, used by the property tests to
/// independently verify `article_count`/`source_count`.
pub async fn member_count(conn: &mut PgConnection, story_id: i64) -> StoreResult<i64> {
    let row = sqlx::query("SELECT COUNT(*) AS n FROM news.story_articles WHERE story_id = $1")
        .bind(story_id)
        .fetch_one(conn)
        .await?;
    Ok(row.get("n"))
}
