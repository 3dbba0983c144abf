//! UQE-API: read-only query API over manufacturing quality-control records
//!
//! This is the main entry point for the application.

use anyhow::Result;
use std::net::SocketAddr;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use uqe_api::{
    config,
    network::HttpClient,
    store::build_store,
    web::{create_router, AppState},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    info!("Starting UQE-API v{}", uqe_api::VERSION);

    // Load and validate configuration
    let settings = config::load()?;
    info!("Configuration loaded (backend: {})", settings.database.backend.as_str());

    // Initialize HTTP client
    let client = HttpClient::with_settings(&settings.outgoing)?;
    info!("HTTP client initialized");

    // Connect record store
    let store = build_store(&settings, client.clone())?;
    match store.ping().await {
        Ok(()) => info!("Connected to {} successfully", store.name()),
        Err(e) => error!("Failed to connect to {}: {}", store.name(), e),
    }

    // Create application state
    let state = AppState::new(settings.clone(), store, client);
    if state.restart.is_none() {
        info!("Restart proxy disabled (RENDER_SERVICE_ID / RENDER_API_KEY not set)");
    }

    // Create router
    let app = create_router(state);

    // Bind address
    let addr = SocketAddr::new(
        settings.server.bind_address.parse()?,
        settings.server.port,
    );

    info!("API running on http://{}", addr);

    // Start server
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    // Render stops instances with SIGTERM
    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
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

    info!("Shutdown signal received");
}
