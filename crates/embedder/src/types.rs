//! Request/response shapes for the two embedding service wire formats.

use serde::{Deserialize, Serialize};

pub const EMBEDDING_DIM: usize = store::types::EMBEDDING_DIM;

#[derive(Debug, Clone, Serialize)]
pub struct EmbedRequest<'a> {
    pub texts: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbedResponse {
    pub embeddings: Vec<Vec<f32>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OpenAiEmbedRequest<'a> {
    pub input: &'a [String],
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiEmbedResponse {
    pub data: Vec<OpenAiEmbeddingEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiEmbeddingEntry {
    pub index: usize,
    pub embedding: Vec<f32>,
}
