//! End-to-end scenarios over a real Postgres instance: ingest a payload,
//! normalize it into an article, attach a controlled embedding, then run
//! the dedup cascade and check what it decided.
//!
//! Requires `DATABASE_URL` to point at a reachable Postgres with the
//! `news` schema migrated and `pgvector` installed. Skipped, not failed,
//! when it isn't set — these are integration tests, not unit tests.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use store::types::EMBEDDING_DIM;

async fn test_pool() -> Option<PgPool> {
    let url = std::env::var("DATABASE_URL").ok()?;
    match store::connect(&url, 5).await {
        Ok(pool) => Some(pool),
        Err(err) => {
            eprintln!("Skipping: could not connect to DATABASE_URL: {err}");
            None
        }
    }
}

/// A unit vector with `cos(theta)` on the first axis and `sin(theta)` on the
/// second, zero elsewhere. Two such vectors have cosine similarity
/// `cos(theta_a - theta_b)` — used to engineer exact cosine distances
/// against the `embedding <=> query` operator without a live embedding
/// service.
fn unit_vector_for_cosine(cosine: f64) -> Vec<f32> {
    let cosine = cosine.clamp(-1.0, 1.0);
    let sine = (1.0 - cosine * cosine).sqrt();
    let mut v = vec![0.0f32; EMBEDDING_DIM];
    v[0] = cosine as f32;
    v[1] = sine as f32;
    v
}

fn ingest_payload(
    source: &str,
    source_item_id: &str,
    collection: &str,
    title: &str,
    canonical_url: Option<&str>,
    body_text: &str,
    published_at: Option<DateTime<Utc>>,
) -> Vec<u8> {
    let body = serde_json::json!({
        "payload_version": "v1",
        "source": source,
        "source_item_id": source_item_id,
        "title": title,
        "source_metadata": {
            "collection": collection,
            "job_name": "integration-test",
            "job_run_id": uuid::Uuid::new_v4().to_string(),
            "scraped_at": Utc::now().to_rfc3339(),
        },
        "canonical_url": canonical_url,
        "body_text": body_text,
        "published_at": published_at.map(|dt| dt.to_rfc3339()),
    });
    serde_json::to_vec(&body).unwrap()
}

async fn article_id(pool: &PgPool, source: &str, source_item_id: &str) -> i64 {
    sqlx::query_scalar::<_, i64>(
        "SELECT id FROM news.articles WHERE source = $1 AND source_item_id = $2",
    )
    .bind(source)
    .bind(source_item_id)
    .fetch_one(pool)
    .await
    .expect("article should exist after normalize")
}

async fn attach_embedding(pool: &PgPool, article_id: i64, cosine_to_seed: f64) {
    let mut conn = pool.acquire().await.unwrap();
    store::repo::embedding::insert_embedding(
        &mut conn,
        article_id,
        "integration-test-model",
        "v1",
        &unit_vector_for_cosine(cosine_to_seed),
        "test://local",
        Utc::now(),
    )
    .await
    .unwrap();
}

async fn dedup_event(pool: &PgPool, article_id: i64) -> (String, Option<i64>, Option<String>) {
    let row: (String, Option<i64>, Option<String>) = sqlx::query_as(
        "SELECT decision, chosen_story_id, exact_signal FROM news.dedup_events WHERE article_id = $1",
    )
    .bind(article_id)
    .fetch_one(pool)
    .await
    .expect("dedup_event should exist after dedup_pending");
    row
}

async fn story_count(pool: &PgPool, collection: &str) -> i64 {
    sqlx::query_scalar::<_, i64>("SELECT count(*) FROM news.stories WHERE collection = $1")
        .bind(collection)
        .fetch_one(pool)
        .await
        .unwrap()
}

async fn member_count(pool: &PgPool, story_id: i64) -> i64 {
    sqlx::query_scalar::<_, i64>("SELECT count(*) FROM news.story_articles WHERE story_id = $1")
        .bind(story_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

fn dedup_params<'a>() -> dedup::DedupParams<'a> {
    dedup::DedupParams {
        model_name: "integration-test-model",
        model_version: "v1",
        lookback_days: 30,
    }
}

/// Ingests one payload through to a dedup decision, returning the article id.
async fn run_one(
    pool: &PgPool,
    source: &str,
    source_item_id: &str,
    collection: &str,
    title: &str,
    canonical_url: Option<&str>,
    body_text: &str,
    published_at: Option<DateTime<Utc>>,
    cosine_to_seed: f64,
) -> i64 {
    let raw = ingest_payload(source, source_item_id, collection, title, canonical_url, body_text, published_at);
    ingest::ingest(pool, &raw, None).await.expect("ingest should succeed");
    normalize::normalize_pending(pool, 10).await.expect("normalize should succeed");

    let id = article_id(pool, source, source_item_id).await;
    attach_embedding(pool, id, cosine_to_seed).await;

    dedup::dedup_pending(pool, 10, &dedup_params())
        .await
        .expect("dedup_pending should succeed");

    id
}

#[tokio::test]
async fn scenario_a_exact_url_merges_regardless_of_embedding() {
    let Some(pool) = test_pool().await else { return };
    let collection = format!("test-exact-url-{}", uuid::Uuid::new_v4());
    let url = "https://example.com/a/shared-story";
    let now = Utc::now();

    let seed_id = run_one(
        &pool, "wire-one", "item-1", &collection, "Quarterly Earnings Beat Expectations",
        Some(url), "Acme reported strong quarterly earnings.", Some(now), 1.0,
    ).await;

    let (decision, story_id, _) = dedup_event(&pool, seed_id).await;
    assert_eq!(decision, "new_story");
    let story_id = story_id.expect("seed article should have a story");

    // Different source, different title, unrelated embedding — only the
    // canonical URL matches.
    let dup_id = run_one(
        &pool, "wire-two", "item-9000", &collection, "Completely Unrelated Headline",
        Some(url), "Different words entirely, different wire.", Some(now), -1.0,
    ).await;

    let (decision, chosen_story_id, exact_signal) = dedup_event(&pool, dup_id).await;
    assert_eq!(decision, "auto_merge");
    assert_eq!(chosen_story_id, Some(story_id));
    assert_eq!(exact_signal.as_deref(), Some("exact_url"));
    assert_eq!(member_count(&pool, story_id).await, 2);
}

#[tokio::test]
async fn scenario_b_semantic_auto_merge_at_strong_cosine() {
    let Some(pool) = test_pool().await else { return };
    let collection = format!("test-semantic-strong-{}", uuid::Uuid::new_v4());
    let now = Utc::now();

    let seed_id = run_one(
        &pool, "wire-one", "item-1", &collection, "Wildfire Contained After Week Of Efforts",
        None, "Firefighters have contained the blaze near the ridge.", Some(now), 1.0,
    ).await;
    let (_, story_id, _) = dedup_event(&pool, seed_id).await;
    let story_id = story_id.unwrap();

    let dup_id = run_one(
        &pool, "wire-two", "item-2", &collection, "Quarterly Earnings Beat Expectations",
        None, "Acme reported results for the quarter today.", Some(now), 0.97,
    ).await;

    let (decision, chosen_story_id, exact_signal) = dedup_event(&pool, dup_id).await;
    assert_eq!(decision, "auto_merge");
    assert_eq!(chosen_story_id, Some(story_id));
    assert_eq!(exact_signal.as_deref(), Some("semantic"));
    assert_eq!(member_count(&pool, story_id).await, 2);
}

#[tokio::test]
async fn scenario_c_semantic_gray_zone_is_recorded_not_merged() {
    let Some(pool) = test_pool().await else { return };
    let collection = format!("test-gray-zone-{}", uuid::Uuid::new_v4());
    let now = Utc::now();

    run_one(
        &pool, "wire-one", "item-1", &collection, "Wildfire Contained After Week Of Efforts",
        None, "Firefighters have contained the blaze near the ridge.", Some(now), 1.0,
    ).await;

    let near_miss_id = run_one(
        &pool, "wire-two", "item-2", &collection, "Quarterly Earnings Beat Expectations",
        None, "Acme reported results for the quarter today.", Some(now), 0.905,
    ).await;

    let (decision, chosen_story_id, _) = dedup_event(&pool, near_miss_id).await;
    assert_eq!(decision, "gray_zone");
    assert_eq!(chosen_story_id, None, "a gray zone does not merge into the candidate");

    // The near-miss seeded its own story rather than joining the candidate.
    assert_eq!(story_count(&pool, &collection).await, 2);
}

#[tokio::test]
async fn scenario_d_cross_collection_never_merges() {
    let Some(pool) = test_pool().await else { return };
    let collection_a = format!("test-collection-a-{}", uuid::Uuid::new_v4());
    let collection_b = format!("test-collection-b-{}", uuid::Uuid::new_v4());
    let url = "https://example.com/shared-across-collections";
    let now = Utc::now();

    run_one(
        &pool, "wire-one", "item-1", &collection_a, "Shared Headline Text",
        Some(url), "Identical body text in both collections.", Some(now), 1.0,
    ).await;
    let other_id = run_one(
        &pool, "wire-one", "item-1-mirrored", &collection_b, "Shared Headline Text",
        Some(url), "Identical body text in both collections.", Some(now), 1.0,
    ).await;

    let (decision, chosen_story_id, _) = dedup_event(&pool, other_id).await;
    assert_eq!(decision, "new_story");
    assert!(chosen_story_id.is_some());
    assert_eq!(story_count(&pool, &collection_a).await, 1);
    assert_eq!(story_count(&pool, &collection_b).await, 1);
}

#[tokio::test]
async fn scenario_e_lexical_simhash_merges_before_semantic_is_consulted() {
    let Some(pool) = test_pool().await else { return };
    let collection = format!("test-lexical-simhash-{}", uuid::Uuid::new_v4());
    let title = "Central Bank Raises Interest Rates By Half A Point";
    let now = Utc::now();

    let seed_id = run_one(
        &pool, "wire-one", "item-1", &collection, title,
        Some("https://example.com/wire-one/rates"), "The central bank announced a rate increase.",
        Some(now), 1.0,
    ).await;
    let (_, story_id, _) = dedup_event(&pool, seed_id).await;
    let story_id = story_id.unwrap();

    // Identical title (so title_simhash matches exactly), different source,
    // URL, and body — and an orthogonal embedding, so a semantic match
    // would not fire if lexical matching didn't win first.
    let dup_id = run_one(
        &pool, "wire-two", "item-2", &collection, title,
        Some("https://example.com/wire-two/rates-coverage"),
        "A separate wire's coverage of the same rate decision, worded differently.",
        Some(now), 0.0,
    ).await;

    let (decision, chosen_story_id, exact_signal) = dedup_event(&pool, dup_id).await;
    assert_eq!(decision, "auto_merge");
    assert_eq!(chosen_story_id, Some(story_id));
    assert_eq!(exact_signal, None, "lexical matches are not exact-signal matches");
    assert_eq!(member_count(&pool, story_id).await, 2);
}

#[tokio::test]
async fn scenario_f_replay_of_the_same_payload_is_a_no_op() {
    let Some(pool) = test_pool().await else { return };
    let collection = format!("test-replay-{}", uuid::Uuid::new_v4());
    let now = Utc::now();

    let raw = ingest_payload(
        "wire-one", "item-replay", &collection, "A Story That Gets Resubmitted",
        Some("https://example.com/replay"), "Body text for the replay scenario.", Some(now),
    );

    let first = ingest::ingest(&pool, &raw, None).await.expect("first ingest should succeed");
    assert!(first.inserted);

    let second = ingest::ingest(&pool, &raw, None).await.expect("replayed ingest should succeed");
    assert!(!second.inserted, "resubmitting the identical payload is a duplicate, not an error");
    assert_eq!(first.raw_arrival_uuid, second.raw_arrival_uuid);
    assert_eq!(first.payload_hash_hex, second.payload_hash_hex);

    let normalize_stats = normalize::normalize_pending(&pool, 10).await.unwrap();
    assert_eq!(normalize_stats.processed, 1, "only one raw_arrival exists despite two ingest calls");

    let id = article_id(&pool, "wire-one", "item-replay").await;
    attach_embedding(&pool, id, 1.0).await;
    let dedup_stats = dedup::dedup_pending(&pool, 10, &dedup_params()).await.unwrap();
    assert_eq!(dedup_stats.processed, 1);

    // Running either stage again finds nothing left to claim.
    let normalize_stats = normalize::normalize_pending(&pool, 10).await.unwrap();
    assert_eq!(normalize_stats.processed, 0);
    let dedup_stats = dedup::dedup_pending(&pool, 10, &dedup_params()).await.unwrap();
    assert_eq!(dedup_stats.processed, 0);
}
