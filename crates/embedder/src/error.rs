use thiserror::Error;

#[derive(Debug, Error)]
pub enum EmbedError {
    #[error("embedding request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("embedding service returned {count} vectors for {expected} inputs")]
    CountMismatch { expected: usize, count: usize },
    #[error("embedding for index {index} has {got} components, expected {expected}")]
    DimensionMismatch {
        index: usize,
        got: usize,
        expected: usize,
    },
    #[error("embedding for index {index} has a non-finite component")]
    NonFinite { index: usize },
    #[error(transparent)]
    Store(#[from] store::StoreError),
}
