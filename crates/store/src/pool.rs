use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::PgPool;

use crate::error::StoreResult;

/// Connects to Postgres and runs pending migrations.
///
/// This is the only place the process keeps global mutable state: the pool
/// handle, created once at startup and shared by every worker loop.
pub async fn connect(database_url: &str, max_connections: u32) -> StoreResult<PgPool> {
    let options: PgConnectOptions = database_url.parse()?;
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await?;

    sqlx::migrate!("../../migrations").run(&pool).await?;

    Ok(pool)
}
