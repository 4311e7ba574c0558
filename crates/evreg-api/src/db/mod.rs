//! # Database Persistence Layer
//!
//! Postgres persistence for participant records via SQLx.
//!
//! The database layer is **optional**. When `DATABASE_URL` is set, the
//! participant store is the `participants` table and the atomic check-in is
//! a single conditional `UPDATE`. When absent, the API runs on the in-memory
//! store (development, tests, single-door events).

pub mod participants;

use sqlx::postgres::{PgPool, PgPoolOptions};

pub use participants::PgParticipantStore;

/// Initialize the database connection pool and run migrations.
///
/// Returns `None` if no URL is configured (in-memory-only mode).
/// Returns `Err` if the URL is set but the connection or migration fails.
pub async fn init_pool(url: Option<&str>) -> Result<Option<PgPool>, sqlx::Error> {
    let Some(url) = url else {
        tracing::warn!(
            "DATABASE_URL not set, running in-memory only mode. \
             Check-ins will not survive restarts."
        );
        return Ok(None);
    };

    let pool = PgPoolOptions::new()
        .max_connections(20)
        .min_connections(2)
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect(url)
        .await?;

    tracing::info!("Connected to PostgreSQL");

    // Run embedded migrations.
    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Database migrations applied");

    Ok(Some(pool))
}
