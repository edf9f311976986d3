use anyhow::Result;
use common::database::{DatabaseConfig, health_check, init_pool, run_migrations};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{Level, info};
use tracing_subscriber::EnvFilter;

use identity::config::{AppConfig, StorageBackend};
use identity::repositories::{InMemoryStore, Stores};
use identity::routes::create_router;
use identity::state::AppState;
use identity::IdentityEngine;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_max_level(Level::INFO)
        .init();

    info!("Starting identity service");

    let config = AppConfig::load()?;

    let stores = match config.storage {
        StorageBackend::Postgres => {
            let db_config = DatabaseConfig::from_env()?;
            let pool = init_pool(&db_config).await?;

            if health_check(&pool).await? {
                info!("Database connection successful");
            } else {
                anyhow::bail!("Failed to connect to database");
            }

            run_migrations(&pool, &sqlx::migrate!("./migrations")).await?;
            Stores::postgres(pool)
        }
        StorageBackend::Memory => {
            info!("Using in-memory storage; data is lost on shutdown");
            Stores::in_memory(Arc::new(InMemoryStore::new()))
        }
    };

    let engine = IdentityEngine::new(stores, config.engine_config());
    let app = create_router(AppState::new(engine));

    let address = config.server.address();
    let listener = TcpListener::bind(&address).await?;
    info!("Identity service listening on {}", address);

    axum::serve(listener, app).await?;

    Ok(())
}
