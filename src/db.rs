use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

/// Creates the PostgreSQL pool backing the user store and applies migrations
///
/// Acquiring a connection gives up after 3 seconds; the caller sees the
/// failure as an unavailable store rather than a hung request.
pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    tracing::debug!("Creating database connection pool");

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(3))
        .connect(database_url)
        .await?;

    tracing::info!("Database connection pool created successfully");

    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Migrations completed successfully");

    Ok(pool)
}
