//! `article_embeddings` access.

use chrono::{DateTime, Utc};
use pgvector::Vector;
use sqlx::PgConnection;

use crate::error::StoreResult;
use crate::types::Article;

/// Selects up to `batch_size` articles that have no embedding row for
/// `(model_name, model_version)`, ordered by `article_id` ascending.
pub async fn select_pending_batch(
    conn: &mut PgConnection,
    model_name: &str,
    model_version: &str,
    batch_size: i64,
) -> StoreResult<Vec<Article>> {
    let rows = sqlx::query_as::<_, Article>(
        r#"
        SELECT a.id, a.uuid, a.raw_arrival_id, a.source, a.source_item_id, a.collection,
               a.canonical_url, a.canonical_url_hash, a.normalized_title, a.normalized_text,
               a.normalized_language, a.published_at, a.source_domain, a.title_simhash,
               a.text_simhash, a.title_hash, a.content_hash, a.token_count,
               a.created_at, a.updated_at, a.deleted_at
        FROM news.articles a
        LEFT JOIN news.article_embeddings e
          ON e.article_id = a.id AND e.model_name = $1 AND e.model_version = $2
        WHERE e.article_id IS NULL AND a.deleted_at IS NULL
        ORDER BY a.id ASC
        LIMIT $3
        "#,
    )
    .bind(model_name)
    .bind(model_version)
    .bind(batch_size)
    .fetch_all(conn)
    .await?;

    Ok(rows)
}

/// Persists one article's embedding, no-op-ing if a concurrent worker (or an
/// earlier cycle) already wrote it.
pub async fn insert_embedding(
    conn: &mut PgConnection,
    article_id: i64,
    model_name: &str,
    model_version: &str,
    embedding: &[f32],
    service_endpoint: &str,
    embedded_at: DateTime<Utc>,
) -> StoreResult<bool> {
    let vector = Vector::from(embedding.to_vec());

    let result = sqlx::query(
        r#"
        INSERT INTO news.article_embeddings
            (article_id, model_name, model_version, embedding, embedded_at, service_endpoint)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (article_id, model_name, model_version) DO NOTHING
        "#,
    )
    .bind(article_id)
    .bind(model_name)
    .bind(model_version)
    .bind(vector)
    .bind(embedded_at)
    .bind(service_endpoint)
    .execute(conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Fetches the embedding for one article, if present for this model/version.
pub async fn get_embedding(
    conn: &mut PgConnection,
    article_id: i64,
    model_name: &str,
    model_version: &str,
) -> StoreResult<Option<Vec<f32>>> {
    let row: Option<(Vector,)> = sqlx::query_as(
        r#"SELECT embedding FROM news.article_embeddings
           WHERE article_id = $1 AND model_name = $2 AND model_version = $3"#,
    )
    .bind(article_id)
    .bind(model_name)
    .bind(model_version)
    .fetch_optional(conn)
    .await?;

    Ok(row.map(|(v,)| v.to_vec()))
}
