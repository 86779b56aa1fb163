use crate::config::Config;
use crate::streaming;
use anyhow::{Context, Result};
use axum::{http::StatusCode, response::IntoResponse, routing::get, Router};
use reelhouse_media::Manager;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

pub mod error;
pub mod routes_api;

pub use error::AppError;

/// Shared application context
#[derive(Clone)]
pub struct AppContext {
    pub manager: Arc<Manager>,
    pub config: Arc<Config>,
    /// Cancelled on shutdown; aborts requests still waiting for an I/O slot
    pub shutdown: CancellationToken,
}

impl AppContext {
    pub fn new(manager: Arc<Manager>, config: Config) -> Self {
        Self {
            manager,
            config: Arc::new(config),
            shutdown: CancellationToken::new(),
        }
    }

    /// How long a stream request may wait for an I/O slot.
    pub fn admission_timeout(&self) -> Duration {
        Duration::from_secs(self.config.server.admission_timeout_secs)
    }
}

/// Create the Axum router with all routes
pub fn create_router(ctx: AppContext) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api", routes_api::api_routes())
        .route("/playlist.m3u", get(streaming::playlist))
        .nest("/stream", streaming::stream_router())
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// Start the HTTP server and the background rescanner, and run until a
/// shutdown signal arrives.
pub async fn start_server(ctx: AppContext) -> Result<()> {
    let config = Arc::clone(&ctx.config);
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    let scanner = ctx.manager.start_scanning(ctx.shutdown.clone());

    let app = create_router(ctx.clone());

    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;

    let shutdown = ctx.shutdown.clone();
    let mut server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal(shutdown))
            .await
    });

    let grace = Duration::from_secs(config.server.shutdown_grace_secs);
    let drained = tokio::select! {
        result = &mut server => {
            result.context("Server task failed")??;
            true
        }
        _ = async {
            ctx.shutdown.cancelled().await;
            tokio::time::sleep(grace).await;
        } => false,
    };

    if !drained {
        tracing::warn!(
            grace_secs = grace.as_secs(),
            "Open connections did not drain in time, dropping them"
        );
        server.abort();
    }

    ctx.shutdown.cancel();
    if let Err(e) = scanner.await {
        tracing::debug!("Rescanner task ended abnormally: {e}");
    }

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Wait for Ctrl-C, SIGTERM or `cancel`, then cancel `cancel` so every
/// background task and pending admission sees the shutdown.
async fn shutdown_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => {}
            Err(e) => {
                tracing::error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
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
        _ = cancel.cancelled() => {},
    }

    tracing::info!("Shutdown signal received");
    cancel.cancel();
}
