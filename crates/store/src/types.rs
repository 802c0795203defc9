//! Row types mirroring the `news` schema (see migrations/0001_init.sql).

use chrono::{DateTime, Utc};
use pgvector::Vector;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

pub const EMBEDDING_DIM: usize = 4096;

#[derive(Debug, Clone, FromRow)]
pub struct IngestRun {
    pub id: i64,
    pub uuid: Uuid,
    pub source: String,
    pub triggered_by_topic: Option<String>,
    pub status: String,
    pub items_inserted: Option<i32>,
    pub error_message: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, FromRow)]
pub struct RawArrival {
    pub id: i64,
    pub uuid: Uuid,
    pub run_id: i64,
    pub source: String,
    pub source_item_id: String,
    pub collection: String,
    pub source_item_url: Option<String>,
    pub source_published_at: Option<DateTime<Utc>>,
    pub fetched_at: DateTime<Utc>,
    pub raw_payload: Value,
    pub payload_hash: String,
    pub response_headers: Option<Value>,
}

/// Result of inserting (or no-op-ing on conflict into) `raw_arrivals`.
#[derive(Debug, Clone)]
pub struct RawArrivalInsert {
    pub id: i64,
    pub uuid: Uuid,
    pub inserted: bool,
}

#[derive(Debug, Clone, FromRow)]
pub struct Article {
    pub id: i64,
    pub uuid: Uuid,
    pub raw_arrival_id: i64,
    pub source: String,
    pub source_item_id: String,
    pub collection: String,
    pub canonical_url: Option<String>,
    pub canonical_url_hash: Option<String>,
    pub normalized_title: String,
    pub normalized_text: String,
    pub normalized_language: String,
    pub published_at: Option<DateTime<Utc>>,
    pub source_domain: Option<String>,
    pub title_simhash: Option<i64>,
    pub text_simhash: Option<i64>,
    pub title_hash: String,
    pub content_hash: String,
    pub token_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Article {
    /// `published_at` if set, else `created_at` — the spec's "effective
    /// seen-at" used for lookback windows and story aggregate refresh.
    pub fn seen_at(&self) -> DateTime<Utc> {
        self.published_at.unwrap_or(self.created_at)
    }
}

/// Fields derived by the normalizer for one raw arrival, prior to insertion.
#[derive(Debug, Clone)]
pub struct NewArticle {
    pub raw_arrival_id: i64,
    pub source: String,
    pub source_item_id: String,
    pub collection: String,
    pub canonical_url: Option<String>,
    pub canonical_url_hash: Option<String>,
    pub normalized_title: String,
    pub normalized_text: String,
    pub normalized_language: String,
    pub published_at: Option<DateTime<Utc>>,
    pub source_domain: Option<String>,
    pub title_simhash: Option<i64>,
    pub text_simhash: Option<i64>,
    pub title_hash: String,
    pub content_hash: String,
    pub token_count: i32,
}

#[derive(Debug, Clone, FromRow)]
pub struct ArticleEmbeddingRow {
    pub article_id: i64,
    pub model_name: String,
    pub model_version: String,
    pub embedding: Vector,
    pub embedded_at: DateTime<Utc>,
    pub service_endpoint: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct Story {
    pub id: i64,
    pub uuid: Uuid,
    pub collection: String,
    pub canonical_title: String,
    pub canonical_url: Option<String>,
    pub canonical_url_hash: Option<String>,
    pub representative_article_id: i64,
    pub first_seen_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
    pub source_count: i32,
    pub article_count: i32,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// A story candidate as retrieved by the lexical or semantic search, joined
/// with whatever fields that stage needs from the representative article.
#[derive(Debug, Clone, FromRow)]
pub struct StoryLexicalCandidate {
    pub story_id: i64,
    pub last_seen_at: DateTime<Utc>,
    pub title: String,
    pub title_simhash: Option<i64>,
}

#[derive(Debug, Clone, FromRow)]
pub struct StorySemanticCandidate {
    pub story_id: i64,
    pub last_seen_at: DateTime<Utc>,
    pub title: String,
    pub cosine_distance: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text")]
pub enum MatchType {
    #[sqlx(rename = "seed")]
    Seed,
    #[sqlx(rename = "exact_url")]
    ExactUrl,
    #[sqlx(rename = "exact_source_id")]
    ExactSourceId,
    #[sqlx(rename = "exact_content_hash")]
    ExactContentHash,
    #[sqlx(rename = "lexical_simhash")]
    LexicalSimhash,
    #[sqlx(rename = "lexical_overlap")]
    LexicalOverlap,
    #[sqlx(rename = "semantic")]
    Semantic,
    #[sqlx(rename = "manual")]
    Manual,
}

impl MatchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchType::Seed => "seed",
            MatchType::ExactUrl => "exact_url",
            MatchType::ExactSourceId => "exact_source_id",
            MatchType::ExactContentHash => "exact_content_hash",
            MatchType::LexicalSimhash => "lexical_simhash",
            MatchType::LexicalOverlap => "lexical_overlap",
            MatchType::Semantic => "semantic",
            MatchType::Manual => "manual",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    NewStory,
    AutoMerge,
    GrayZone,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::NewStory => "new_story",
            Decision::AutoMerge => "auto_merge",
            Decision::GrayZone => "gray_zone",
        }
    }
}

/// Everything the dedup cascade decided for one article, ready to persist
/// as a `story_articles` row and a `dedup_events` row in the same transaction.
#[derive(Debug, Clone)]
pub struct DedupOutcome {
    pub decision: Decision,
    pub story_id: Option<i64>,
    pub match_type: Option<MatchType>,
    pub match_score: Option<f64>,
    pub match_details: Value,
    pub best_candidate_story_id: Option<i64>,
    pub best_cosine: Option<f64>,
    pub title_overlap: Option<f64>,
    pub entity_date_consistency: Option<f64>,
    pub composite_score: Option<f64>,
    pub exact_signal: Option<String>,
}
