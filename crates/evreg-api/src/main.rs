//! # evreg-api — Binary Entry Point
//!
//! Starts the Axum HTTP server for door check-in.
//! Binds to configurable port (default 8080).

use std::sync::Arc;

use evreg_api::db::PgParticipantStore;
use evreg_api::state::{AppConfig, AppState, LogFormat, StoreBackend};
use evreg_core::InMemoryParticipantStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Build configuration from environment.
    let config = AppConfig::from_env()?;

    // Initialize structured tracing.
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
    tracing::info!(?config, "configuration loaded");

    // Initialize database pool (optional; absent means in-memory only).
    let db_pool = evreg_api::db::init_pool(config.database_url.as_deref())
        .await
        .map_err(|e| {
            tracing::error!("Database initialization failed: {e}");
            e
        })?;

    let state = match db_pool {
        Some(pool) => {
            let store = PgParticipantStore::new(pool);
            if let Some(path) = &config.seed_path {
                let participants = evreg_api::seed::load_participants(path)?;
                let mut inserted = 0usize;
                for participant in &participants {
                    if store.insert_if_absent(participant).await? {
                        inserted += 1;
                    }
                }
                tracing::info!(
                    inserted,
                    skipped = participants.len() - inserted,
                    "seed file imported into database"
                );
            }
            AppState::with_store(config.clone(), Arc::new(store), StoreBackend::Postgres)
        }
        None => {
            let store = InMemoryParticipantStore::new();
            if let Some(path) = &config.seed_path {
                evreg_api::seed::seed_store(&store, path).map_err(|e| {
                    tracing::error!("Seeding failed: {e}");
                    e
                })?;
            }
            AppState::in_memory(config.clone(), store)
        }
    };
    tracing::info!(backend = state.backend.as_str(), "participant store ready");

    let app = evreg_api::app(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("evreg API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
