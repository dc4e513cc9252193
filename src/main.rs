use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use kanban_api::config::{self, AppConfig};
use kanban_api::database::{DatabaseManager, MemoryStore, PgStore, Store};
use kanban_api::{app, AppState};

#[derive(Parser)]
#[command(name = "kanban-api")]
#[command(about = "Kanban board API server")]
#[command(version)]
struct Args {
    #[arg(long, help = "Port to listen on (overrides API_PORT)")]
    port: Option<u16>,

    #[arg(long, help = "Address to bind (overrides API_HOST)")]
    host: Option<String>,

    #[arg(long, help = "Use the in-memory store even when DATABASE_URL is set")]
    memory: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("kanban_api=info,tower_http=info")),
        )
        .init();

    let args = Args::parse();

    let mut config: AppConfig = config::config().clone();
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(host) = args.host {
        config.server.host = host;
    }
    config.validate().context("invalid configuration")?;
    tracing::info!("Starting Kanban API in {:?} mode", config.environment);

    let (store, pool) = match (&config.database.url, args.memory) {
        (Some(_), false) => {
            let pool = DatabaseManager::connect(&config.database)
                .await
                .context("failed to connect to database")?;
            DatabaseManager::ensure_schema(&pool).await?;
            let store: Arc<dyn Store> = Arc::new(PgStore::new(pool.clone()));
            (store, Some(pool))
        }
        _ => {
            tracing::warn!("Using in-memory store; data is lost on exit");
            let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
            (store, None)
        }
    };

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    tracing::info!("Kanban API listening on http://{}", bind_addr);

    axum::serve(listener, app(AppState::new(config, store)))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    if let Some(pool) = pool {
        DatabaseManager::close(pool).await;
    }
    tracing::info!("Shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
