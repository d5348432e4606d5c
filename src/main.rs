mod api_doc;
mod config;
mod endpoint;
mod error;
mod handlers;
mod matcher;
mod memory;
mod models;
mod reload;
mod route_table;
mod routes;
mod spanner;
mod state;
mod store;

use anyhow::Context;
use config::{Config, StoreBackend};
use memory::MemoryStore;
use reload::{ReloadController, ReloadSettings};
use spanner::SpannerStore;
use state::AppState;
use std::sync::Arc;
use store::Store;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("mock-endpoint-server starting");

    let config = Config::from_env()?;
    config.log_startup();

    let store = match &config.store {
        StoreBackend::Spanner(settings) => Store::Spanner(SpannerStore::from_settings(settings).await?),
        StoreBackend::Memory => Store::Memory(MemoryStore::default()),
    };

    // Nothing is served until the boot snapshot compiles
    let reload = ReloadController::boot(store.clone(), ReloadSettings::from(&config))
        .await
        .context("Failed to build the initial route table")?;

    let addr = format!("{}:{}", config.service_host, config.service_port);
    let state = AppState {
        store,
        reload: Arc::new(reload),
        config: Arc::new(config),
    };
    let app = routes::router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Listening on {} (admin API under /admin)", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}
