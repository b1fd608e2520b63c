use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vocalstrip_api::background::cleanup::CleanupScheduler;
use vocalstrip_api::config::ServerConfig;
use vocalstrip_api::router::build_app_router;
use vocalstrip_api::state::AppState;
use vocalstrip_core::separation::{DemucsParams, DemucsSeparator};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vocalstrip_api=debug,vocalstrip_core=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(
        host = %config.host,
        port = %config.port,
        model = %config.model,
        "Loaded server configuration"
    );

    // --- Working directories ---
    for dir in [&config.upload_dir, &config.separated_dir] {
        tokio::fs::create_dir_all(dir)
            .await
            .unwrap_or_else(|e| panic!("Failed to create {}: {e}", dir.display()));
    }
    tracing::info!(
        upload_dir = %config.upload_dir.display(),
        separated_dir = %config.separated_dir.display(),
        "Working directories ready"
    );

    // --- Separation + cleanup ---
    let separator = DemucsSeparator::new(config.demucs_command.clone(), DemucsParams::default());
    let cleanup = CleanupScheduler::new(config.cleanup_delay);

    // --- App state ---
    let state = AppState {
        config: Arc::new(config.clone()),
        separator: Arc::new(separator),
        cleanup: cleanup.clone(),
    };

    let app = build_app_router(state);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // Pending cleanups are abandoned, not awaited.
    let pending = cleanup.pending();
    cleanup.shutdown();
    tracing::info!(pending, "Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
