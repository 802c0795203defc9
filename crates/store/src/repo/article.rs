//! `articles` access, including the normalizer's claim-and-process query.

use sqlx::{PgConnection, Row};

use crate::error::StoreResult;
use crate::types::{Article, NewArticle, RawArrival};

/// Claims one raw arrival with no matching article, locking the row so
/// concurrent normalizer workers claim disjoint rows. Must run inside a
/// transaction; the lock is held until commit/rollback.
pub async fn claim_unprocessed_raw_arrival(
    conn: &mut PgConnection,
) -> StoreResult<Option<RawArrival>> {
    let row = sqlx::query_as::<_, RawArrival>(
        r#"
        SELECT ra.id, ra.uuid, ra.run_id, ra.source, ra.source_item_id, ra.collection,
               ra.source_item_url, ra.source_published_at, ra.fetched_at,
               ra.raw_payload, ra.payload_hash, ra.response_headers
        FROM news.raw_arrivals ra
        LEFT JOIN news.articles a ON a.raw_arrival_id = ra.id
        WHERE a.id IS NULL
        ORDER BY ra.id ASC
        FOR UPDATE OF ra SKIP LOCKED
        LIMIT 1
        "#,
    )
    .fetch_optional(conn)
    .await?;

    Ok(row)
}

/// Inserts the canonical article derived from a raw arrival. No-ops (returns
/// `None`) if a concurrent worker already inserted one for this arrival.
pub async fn insert_article(
    conn: &mut PgConnection,
    new: &NewArticle,
) -> StoreResult<Option<Article>> {
    let row = sqlx::query_as::<_, Article>(
        r#"
        INSERT INTO news.articles (
            raw_arrival_id, source, source_item_id, collection, canonical_url,
            canonical_url_hash, normalized_title, normalized_text, normalized_language,
            published_at, source_domain, title_simhash, text_simhash, title_hash,
            content_hash, token_count
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
        ON CONFLICT (raw_arrival_id) DO NOTHING
        RETURNING id, uuid, raw_arrival_id, source, source_item_id, collection,
                  canonical_url, canonical_url_hash, normalized_title, normalized_text,
                  normalized_language, published_at, source_domain, title_simhash,
                  text_simhash, title_hash, content_hash, token_count,
                  created_at, updated_at, deleted_at
        "#,
    )
    .bind(new.raw_arrival_id)
    .bind(&new.source)
    .bind(&new.source_item_id)
    .bind(&new.collection)
    .bind(&new.canonical_url)
    .bind(&new.canonical_url_hash)
    .bind(&new.normalized_title)
    .bind(&new.normalized_text)
    .bind(&new.normalized_language)
    .bind(new.published_at)
    .bind(&new.source_domain)
    .bind(new.title_simhash)
    .bind(new.text_simhash)
    .bind(&new.title_hash)
    .bind(&new.content_hash)
    .bind(new.token_count)
    .fetch_optional(conn)
    .await?;

    Ok(row)
}

pub async fn get_article(conn: &mut PgConnection, article_id: i64) -> StoreResult<Option<Article>> {
    let row = sqlx::query_as::<_, Article>(
        r#"SELECT id, uuid, raw_arrival_id, source, source_item_id, collection,
                  canonical_url, canonical_url_hash, normalized_title, normalized_text,
                  normalized_language, published_at, source_domain, title_simhash,
                  text_simhash, title_hash, content_hash, token_count,
                  created_at, updated_at, deleted_at
           FROM news.articles WHERE id = $1"#,
    )
    .bind(article_id)
    .fetch_optional(conn)
    .await?;

    Ok(row)
}

/// Finds a story in the same collection whose representative article has
/// the given `canonical_url_hash` (Stage E1).
pub async fn find_story_by_url_hash(
    conn: &mut PgConnection,
    collection: &str,
    url_hash: &str,
) -> StoreResult<Option<i64>> {
    let row = sqlx::query(
        r#"SELECT id FROM news.stories
           WHERE collection = $1 AND status = 'active' AND canonical_url_hash = $2
           LIMIT 1"#,
    )
    .bind(collection)
    .bind(url_hash)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.map(|r| r.get("id")))
}

/// Finds the story owning an existing member article with the same
/// `(collection, source, source_item_id)` (Stage E2).
pub async fn find_story_by_source_identity(
    conn: &mut PgConnection,
    collection: &str,
    source: &str,
    source_item_id: &str,
) -> StoreResult<Option<i64>> {
    let row = sqlx::query(
        r#"
        SELECT sa.story_id AS id
        FROM news.story_articles sa
        JOIN news.articles a ON a.id = sa.article_id
        JOIN news.stories s ON s.id = sa.story_id
        WHERE s.status = 'active' AND a.collection = $1
          AND a.source = $2 AND a.source_item_id = $3
        LIMIT 1
        "#,
    )
    .bind(collection)
    .bind(source)
    .bind(source_item_id)
    .fetch_optional(conn)
    .await?;

    Ok(row.map(|r| r.get("id")))
}

/// Finds the story owning an existing member article with the same
/// `content_hash` (Stage E3).
pub async fn find_story_by_content_hash(
    conn: &mut PgConnection,
    collection: &str,
    content_hash: &str,
) -> StoreResult<Option<i64>> {
    let row = sqlx::query(
        r#"
        SELECT sa.story_id AS id
        FROM news.story_articles sa
        JOIN news.articles a ON a.id = sa.article_id
        JOIN news.stories s ON s.id = sa.story_id
        WHERE s.status = 'active' AND a.collection = $1 AND a.content_hash = $2
        LIMIT 1
        "#,
    )
    .bind(collection)
    .bind(content_hash)
    .fetch_optional(conn)
    .await?;

    Ok(row.map(|r| r.get("id")))
}
