use thiserror::Error;

/// Errors surfaced by the persistence layer.
///
/// This maps onto the pipeline's `TransientStoreError` / `AlgorithmFailure`
/// taxonomy: every variant here is something a caller decides whether to
/// retry, not something fixed inside the store itself.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("invariant violated: {0}")]
    Invariant(String),
}

pub type StoreResult<T> = Result<T, StoreError>;
