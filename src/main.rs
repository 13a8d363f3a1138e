//! Deen Reader Server
//!
//! Serves the book catalog and EPUB reading sessions.

use std::net::SocketAddr;

use anyhow::Context;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use deen_reader::config::{BookSource, Config};
use deen_reader::library::Catalog;
use deen_reader::reader::SessionStore;
use deen_reader::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "deen_reader=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();

    let config = Config::from_env().context("Invalid configuration")?;

    tracing::info!("Starting Deen Reader v{}", env!("CARGO_PKG_VERSION"));
    match &config.library.source {
        BookSource::Remote(url) => tracing::info!("Books URL: {}", url),
        BookSource::Local(dir) => tracing::info!("Books directory: {}", dir.display()),
    }

    let catalog = match Catalog::load(
        &config.library.catalog_path,
        config.library.categories_path.as_deref(),
    )
    .await
    {
        Ok(catalog) => catalog,
        Err(e) => {
            tracing::warn!(
                "Failed to load catalog {}: {}. Starting with an empty library",
                config.library.catalog_path.display(),
                e
            );
            Catalog::default()
        }
    };

    let sessions = SessionStore::with_capacity(
        config.library.source.fetcher(),
        config.reader.max_sessions,
    );
    tracing::info!("Keeping at most {} reading sessions", config.reader.max_sessions);
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    let app_state = AppState::new(catalog, sessions);

    // Build CORS layer
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = deen_reader::app(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    tracing::info!("Deen Reader listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
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
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown...");
        },
    }
}
