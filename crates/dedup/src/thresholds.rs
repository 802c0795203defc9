//! Tunable constants for the decision cascade. None of these are exposed as
//! CLI flags — they are algorithm constants, not operator knobs.

/// Stage L: SimHash Hamming distance at or below which two titles are
/// considered a lexical duplicate.
pub const SIMHASH_MAX_DISTANCE: u32 = 3;

/// Stage L: minimum trigram Jaccard similarity for the fallback lexical check.
pub const TRIGRAM_JACCARD_MIN: f64 = 0.88;

/// Stage L: the trigram check additionally requires the candidate and
/// article to be within this many days of each other.
pub const LEXICAL_DATE_WINDOW_DAYS: i64 = 14;

/// Stage L: number of most-recent active stories considered as candidates.
pub const LEXICAL_CANDIDATE_LIMIT: i64 = 300;

/// Stage S: `hnsw.ef_search` set for the candidate-retrieval transaction.
pub const SEMANTIC_EF_SEARCH: i32 = 64;

/// Stage S: number of nearest neighbors retrieved.
pub const SEMANTIC_K: i64 = 20;

/// Stage S: cosine similarity at or above which a candidate auto-merges
/// regardless of title overlap.
pub const SEMANTIC_COSINE_STRONG: f64 = 0.965;

/// Stage S: cosine similarity at or above which a candidate auto-merges
/// provided `title_overlap >= SEMANTIC_TITLE_OVERLAP_MIN`.
pub const SEMANTIC_COSINE_WEAK: f64 = 0.935;

/// Stage S: minimum title overlap paired with `SEMANTIC_COSINE_WEAK`.
pub const SEMANTIC_TITLE_OVERLAP_MIN: f64 = 0.30;

/// Gray zone: `[GRAY_ZONE_COSINE_LOW, SEMANTIC_COSINE_WEAK)`.
pub const GRAY_ZONE_COSINE_LOW: f64 = 0.89;
pub const GRAY_ZONE_COSINE_HIGH: f64 = SEMANTIC_COSINE_WEAK;
