//! Postgres persistence for the ingestion-to-dedup pipeline.
//!
//! Every stage (ingest, normalize, embed, dedup) claims its own rows with
//! `SELECT ... FOR UPDATE SKIP LOCKED`, does its work, and commits a single
//! transaction — there is no in-memory queue between stages; the database
//! is the queue. The repository functions in [`repo`] are thin wrappers
//! around that discipline: each takes a `&mut PgConnection` so callers
//! control the transaction boundary.

pub mod error;
pub mod pool;
pub mod repo;
pub mod types;

pub use error::{StoreError, StoreResult};
pub use pool::connect;
