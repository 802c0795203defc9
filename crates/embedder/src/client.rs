//! HTTP client for the embedding service. Supports both wire formats named
//! in the external interfaces: the native `/embed` shape and an
//! OpenAI-compatible `/v1/embeddings` shape, selected by the endpoint path.

use std::time::Duration;

use reqwest::Client;
use tokio::time::sleep;

use crate::error::EmbedError;
use crate::retry::RetryConfig;
use crate::types::{
    EmbedRequest, EmbedResponse, OpenAiEmbedRequest, OpenAiEmbedResponse, EMBEDDING_DIM,
};

pub struct EmbeddingClient {
    http: Client,
    endpoint: String,
    max_length: Option<u32>,
    retry: RetryConfig,
}

impl EmbeddingClient {
    pub fn new(endpoint: String, max_length: Option<u32>, request_timeout: Duration) -> Self {
        let http = Client::builder()
            .timeout(request_timeout)
            .build()
            .expect("embedding HTTP client builds with a valid timeout");

        Self {
            http,
            endpoint,
            max_length,
            retry: RetryConfig::default(),
        }
    }

    /// Embeds `texts`, retrying transient request failures with exponential
    /// backoff. Every vector must come back with exactly [`EMBEDDING_DIM`]
    /// finite components or the whole batch is rejected.
    pub async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        let mut attempt = 0;
        loop {
            match self.embed_once(texts).await {
                Ok(vectors) => return Ok(vectors),
                Err(err) if attempt < self.retry.max_retries && is_retryable(&err) => {
                    attempt += 1;
                    let delay = self.retry.calculate_delay(attempt);
                    if delay > Duration::from_millis(0) {
                        sleep(delay).await;
                    }
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn embed_once(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        let vectors = if self.endpoint.ends_with("/v1/embeddings") {
            self.embed_openai(texts).await?
        } else {
            self.embed_native(texts).await?
        };

        validate(texts.len(), &vectors)?;
        Ok(vectors)
    }

    async fn embed_native(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        let request = EmbedRequest {
            texts,
            max_length: self.max_length,
        };
        let response: EmbedResponse = self
            .http
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(response.embeddings)
    }

    async fn embed_openai(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        let request = OpenAiEmbedRequest { input: texts };
        let response: OpenAiEmbedResponse = self
            .http
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let mut entries = response.data;
        entries.sort_by_key(|entry| entry.index);
        Ok(entries.into_iter().map(|entry| entry.embedding).collect())
    }
}

fn validate(expected: usize, vectors: &[Vec<f32>]) -> Result<(), EmbedError> {
    if vectors.len() != expected {
        return Err(EmbedError::CountMismatch {
            expected,
            count: vectors.len(),
        });
    }

    for (index, vector) in vectors.iter().enumerate() {
        if vector.len() != EMBEDDING_DIM {
            return Err(EmbedError::DimensionMismatch {
                index,
                got: vector.len(),
                expected: EMBEDDING_DIM,
            });
        }
        if vector.iter().any(|component| !component.is_finite()) {
            return Err(EmbedError::NonFinite { index });
        }
    }

    Ok(())
}

fn is_retryable(err: &EmbedError) -> bool {
    matches!(err, EmbedError::Request(e) if e.is_timeout() || e.is_connect() || e.status().map(|s| s.is_server_error()).unwrap_or(false))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_wrong_vector_count() {
        let vectors = vec![vec![0.0; EMBEDDING_DIM]];
        let err = validate(2, &vectors).unwrap_err();
        assert!(matches!(err, EmbedError::CountMismatch { expected: 2, count: 1 }));
    }

    #[test]
    fn rejects_wrong_dimension() {
        let vectors = vec![vec![0.0; EMBEDDING_DIM - 1]];
        let err = validate(1, &vectors).unwrap_err();
        assert!(matches!(err, EmbedError::DimensionMismatch { .. }));
    }

    #[test]
    fn rejects_non_finite_component() {
        let mut vector = vec![0.0; EMBEDDING_DIM];
        vector[10] = f32::NAN;
        let err = validate(1, &[vector]).unwrap_err();
        assert!(matches!(err, EmbedError::NonFinite { index: 0 }));
    }

    #[test]
    fn accepts_well_formed_batch() {
        let vectors = vec![vec![0.1; EMBEDDING_DIM]; 3];
        assert!(validate(3, &vectors).is_ok());
    }
}
