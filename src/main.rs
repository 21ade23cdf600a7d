//! Lifelog server
//!
//! REST backend for the lifelog tracker, backed by SQLite (or an in-memory
//! store for throwaway runs).

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use lifelog::auth::Authenticator;
use lifelog::config::{Config, StoreKind};
use lifelog::store::{MemoryStore, Repository, SqliteStore};
use lifelog::{create_router, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting lifelog server");
    tracing::info!("Store: {:?}", config.store);
    tracing::info!("Bind address: {}", config.bind_addr);

    if config.password.is_none() {
        tracing::warn!("No password configured (LIFELOG_PASSWORD). Login is disabled!");
    }

    let secret = match &config.jwt_secret {
        Some(secret) => secret.clone(),
        None => {
            tracing::warn!(
                "No JWT secret configured (LIFELOG_JWT_SECRET). Tokens will not survive a restart."
            );
            Authenticator::random_secret()
        }
    };
    let auth = Authenticator::new(
        config.password.clone(),
        &secret,
        config.access_ttl,
        config.refresh_ttl,
    );

    // Initialize storage
    let repo: Arc<dyn Repository> = match config.store {
        StoreKind::Sqlite => {
            tracing::info!("Database path: {:?}", config.db_path);
            Arc::new(SqliteStore::open(&config.db_path).await?)
        }
        StoreKind::Memory => {
            tracing::warn!("Using the in-memory store; data is lost on exit");
            Arc::new(MemoryStore::new())
        }
    };

    let app = create_router(AppState::new(repo, auth));

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
