//! PlayHub - gaming platform backend

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use playhub::{
    api::{self, AppState},
    config::Config,
    db,
    services::IdGenerator,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "playhub=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting PlayHub...");

    // Load configuration
    let config = Config::load_with_env(Path::new("config.yml"))?;
    tracing::info!("Configuration loaded");

    // Initialize database
    let pool = db::create_pool(&config.database).await?;
    tracing::info!("Database connected: {:?}", config.database.driver);

    // Run migrations
    db::migrations::run_migrations(&pool).await?;
    tracing::info!("Database migrations completed");

    let ids = Arc::new(IdGenerator::from_config(&config.ids)?);
    tracing::info!("Snowflake ids issued as machine {}", ids.machine_id());

    let state = AppState::new(pool.clone(), ids);
    let app = api::build_router(state, &config.server.cors_origin)?;

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool.close().await;
    tracing::info!("Shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}
