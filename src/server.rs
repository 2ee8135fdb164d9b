//! Server startup and shutdown logic.
//!
//! This module contains the `run_server` function which handles:
//! - Database connection and reachability check
//! - Image-host client construction (optional, non-fatal when absent)
//! - Application state creation
//! - Router creation
//! - Server binding and graceful shutdown with a bounded drain window

use crate::auth::AuthService;
use crate::config::Config;
use crate::db::Database;
use crate::error::{AppError, AppResult};
use crate::media::MediaClient;
use crate::routes;
use crate::state::AppState;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tracing::{info, warn};

/// Run the web server with the given configuration.
///
/// Startup is sequenced: configuration is already loaded, so the database
/// is connected (and pinged) first, then the image-host client is built,
/// then the router, and only then is the socket bound. A database that
/// cannot be reached aborts startup; missing image-host credentials do
/// not — the server runs with uploads disabled.
///
/// On SIGINT/SIGTERM the listener stops accepting connections and
/// in-flight requests are drained, bounded by the configured shutdown
/// timeout; whatever is still running after the window is aborted.
pub async fn run_server(config: Config, addr: String) -> AppResult<()> {
    info!("Starting Savora API server...");

    info!("Connecting to database...");
    let db = Database::connect(&config.database.uri, &config.database.name).await?;
    info!("Database connection verified");

    // Missing credentials are logged, not fatal
    let media = match &config.media {
        Some(media_config) => {
            info!(cloud = %media_config.cloud_name, "Image host configured");
            Some(MediaClient::new(media_config))
        }
        None => {
            warn!("Image host credentials missing; upload endpoints will answer 503");
            None
        }
    };

    let auth_service = AuthService::new(
        config.auth.jwt_secret.clone(),
        config.auth.jwt_expiration_hours,
    );

    let state = Arc::new(AppState {
        db,
        media,
        auth_service,
        environment: config.server.environment,
        started_at: Instant::now(),
    });

    // Create router
    let app = routes::create_router(
        state,
        config.cors.allowed_origins.clone(),
        config.rate_limit.clone(),
        config.server.body_limit_bytes,
    );

    // Start server
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to bind to address {}: {}", addr, e)))?;

    info!("Server listening on {}", addr);
    info!("Environment: {}", config.server.environment);

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let mut serve_task = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            })
            .await
    });

    tokio::select! {
        result = &mut serve_task => {
            // Server stopped without a signal: surface the error
            return result
                .map_err(|e| AppError::Internal(format!("Server task failed: {}", e)))?
                .map_err(|e| AppError::Internal(format!("Server error: {}", e)));
        }
        _ = shutdown_signal() => {
            info!("Shutdown signal received, draining in-flight requests");
        }
    }

    let _ = shutdown_tx.send(());

    // Bounded drain: a stuck request must not hold the process hostage
    let drain = Duration::from_secs(config.server.shutdown_timeout_seconds);
    match tokio::time::timeout(drain, &mut serve_task).await {
        Ok(result) => {
            result
                .map_err(|e| AppError::Internal(format!("Server task failed: {}", e)))?
                .map_err(|e| AppError::Internal(format!("Server error: {}", e)))?;
            info!("Server shutdown complete");
        }
        Err(_) => {
            warn!(
                "Drain window of {}s elapsed; aborting remaining connections",
                config.server.shutdown_timeout_seconds
            );
            serve_task.abort();
        }
    }

    Ok(())
}

/// Create a future that resolves when a shutdown signal is received.
///
/// On Unix-like systems, this listens for both Ctrl+C (SIGINT) and SIGTERM.
/// On other platforms, it only listens for Ctrl+C.
///
/// # Panics
///
/// Panics if signal handler installation fails. This is intentional because
/// signal handler failures are unrecoverable system-level errors that indicate
/// the OS cannot deliver shutdown signals, making graceful shutdown impossible.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(unix)]
    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    #[cfg(not(unix))]
    ctrl_c.await;
}
