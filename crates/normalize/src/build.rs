//! Derives a [`NewArticle`] from one raw arrival's stored payload.

use chrono::{DateTime, Utc};
use ingest::IngestPayload;
use store::types::{NewArticle, RawArrival};

const UNKNOWN_COLLECTION: &str = "unknown";

pub fn build_article(raw_arrival: &RawArrival) -> NewArticle {
    let payload: Option<IngestPayload> = serde_json::from_value(raw_arrival.raw_payload.clone()).ok();

    let title_source = payload
        .as_ref()
        .map(|p| p.title.as_str())
        .filter(|t| !t.trim().is_empty())
        .unwrap_or(&raw_arrival.source_item_id);
    let normalized_title = canonical::normalize(title_source);
    let normalized_title = if normalized_title.is_empty() {
        canonical::normalize(&raw_arrival.source_item_id)
    } else {
        normalized_title
    };

    let normalized_text = payload
        .as_ref()
        .and_then(|p| p.body_text.as_deref())
        .map(canonical::normalize)
        .unwrap_or_default();

    let canonical_url_raw = payload
        .as_ref()
        .and_then(|p| p.canonical_url.clone())
        .or_else(|| raw_arrival.source_item_url.clone());
    let canonical_url = canonical_url_raw
        .as_deref()
        .and_then(canonical::canonicalize_url);

    let source_domain = payload
        .as_ref()
        .and_then(|p| p.source_domain.clone())
        .or_else(|| canonical_url.as_deref().and_then(host_of));

    let collection = payload
        .as_ref()
        .map(|p| p.source_metadata.collection.trim().to_lowercase())
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| {
            let fallback = raw_arrival.collection.trim().to_lowercase();
            if fallback.is_empty() {
                UNKNOWN_COLLECTION.to_string()
            } else {
                fallback
            }
        });

    let published_at: Option<DateTime<Utc>> = payload
        .as_ref()
        .and_then(|p| p.published_at.as_deref())
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .or(raw_arrival.source_published_at);

    let title_hash = canonical::sha256_hex(&normalized_title);
    let content_hash = canonical::content_hash(&normalized_title, &normalized_text);
    let canonical_url_hash = canonical_url.as_deref().map(canonical::sha256_hex);

    let title_tokens = canonical::word_tokens(&normalized_title);
    let text_tokens = canonical::word_tokens(&normalized_text);
    let title_simhash = canonical::simhash64(title_tokens.iter().map(String::as_str));
    let text_simhash = canonical::simhash64(text_tokens.iter().map(String::as_str));
    let token_count = text_tokens.len() as i32;

    let normalized_language = payload
        .as_ref()
        .and_then(|p| p.language.clone())
        .unwrap_or_else(|| "und".to_string());

    NewArticle {
        raw_arrival_id: raw_arrival.id,
        source: raw_arrival.source.clone(),
        source_item_id: raw_arrival.source_item_id.clone(),
        collection,
        canonical_url,
        canonical_url_hash,
        normalized_title,
        normalized_text,
        normalized_language,
        published_at,
        source_domain,
        title_simhash: title_simhash.map(|h| h as i64),
        text_simhash: text_simhash.map(|h| h as i64),
        title_hash,
        content_hash,
        token_count,
    }
}

fn host_of(url: &str) -> Option<String> {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use uuid::Uuid;

    fn raw_arrival_with_payload(payload: serde_json::Value) -> RawArrival {
        RawArrival {
            id: 1,
            uuid: Uuid::nil(),
            run_id: 1,
            source: "example-wire".to_string(),
            source_item_id: "abc-123".to_string(),
            collection: "world-news".to_string(),
            source_item_url: None,
            source_published_at: None,
            fetched_at: Utc.with_ymd_and_hms(2026, 7, 28, 0, 0, 0).unwrap(),
            raw_payload: payload,
            payload_hash: "deadbeef".repeat(8),
            response_headers: None,
        }
    }

    #[test]
    fn derives_hashes_and_simhashes_from_payload() {
        let payload = serde_json::json!({
            "payload_version": "v1",
            "source": "example-wire",
            "source_item_id": "abc-123",
            "title": "OpenAI Releases GPT-6",
            "source_metadata": {
                "collection": "World-News",
                "job_name": "job",
                "job_run_id": "run-1",
                "scraped_at": "2026-07-28T00:00:00Z"
            },
            "canonical_url": "https://Example.COM:443/news/a/?utm_source=x",
            "body_text": "OpenAI released a new model today.",
            "published_at": "2026-07-27T12:00:00Z"
        });

        let article = build_article(&raw_arrival_with_payload(payload));

        assert_eq!(article.collection, "world-news");
        assert_eq!(article.canonical_url.as_deref(), Some("https://example.com/news/a"));
        assert!(article.canonical_url_hash.is_some());
        assert!(article.title_simhash.is_some());
        assert!(article.text_simhash.is_some());
        assert_eq!(article.source_domain.as_deref(), Some("example.com"));
        assert!(article.published_at.is_some());
    }

    #[test]
    fn falls_back_to_source_item_id_when_title_blank() {
        let payload = serde_json::json!({
            "payload_version": "v1",
            "source": "example-wire",
            "source_item_id": "abc-123",
            "title": "   ",
            "source_metadata": {
                "collection": "world-news",
                "job_name": "job",
                "job_run_id": "run-1",
                "scraped_at": "2026-07-28T00:00:00Z"
            }
        });

        let article = build_article(&raw_arrival_with_payload(payload));
        assert_eq!(article.normalized_title, canonical::normalize("abc-123"));
    }

    #[test]
    fn missing_collection_falls_back_to_raw_arrival_then_unknown() {
        let mut raw = raw_arrival_with_payload(serde_json::json!(null));
        raw.collection = "".to_string();
        let article = build_article(&raw);
        assert_eq!(article.collection, UNKNOWN_COLLECTION);
    }
}
