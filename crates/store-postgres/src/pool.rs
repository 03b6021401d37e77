use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use timeline_core::TimelineError;

/// Opens a connection pool and runs pending migrations. Called once at
/// startup; the resulting pool is shared (cheaply cloned) across every
/// `timeline-store-postgres` implementation.
pub async fn connect(database_url: &str) -> Result<PgPool, TimelineError> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
        .map_err(|e| TimelineError::StoreError { operation: format!("connect: {e}") })?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| TimelineError::StoreError { operation: format!("migrate: {e}") })?;

    Ok(pool)
}
