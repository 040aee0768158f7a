// Server module - HTTP surface of the log console

mod error;
mod handlers;
mod middleware;

pub use error::ApiError;
pub use handlers::{get_logs, health, LogParams};
pub use middleware::trace_requests;

use crate::auth::AdminTokens;
use crate::config::BoardlogConfig;
use crate::error::{BoardlogError, Result};
use crate::logs::TotalPagesRule;
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tower_http::timeout::TimeoutLayer;
use tracing::{info, warn};

/// Shared, read-only state of the request handlers
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

pub struct AppStateInner {
    /// The log file served by `/api/logs/`
    pub log_file: PathBuf,
    pub admin: AdminTokens,
    pub default_logs_per_page: usize,
    pub max_logs_per_page: usize,
    pub total_pages_rule: TotalPagesRule,
    pub request_timeout: Duration,
}

impl std::ops::Deref for AppState {
    type Target = AppStateInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl AppState {
    pub fn new(inner: AppStateInner) -> Self {
        Self {
            inner: Arc::new(inner),
        }
    }

    pub fn from_config(config: &BoardlogConfig) -> Self {
        Self::new(AppStateInner {
            log_file: config.logs.file.clone(),
            admin: AdminTokens::new(config.auth.admin_tokens.iter().cloned()),
            default_logs_per_page: config.logs.default_logs_per_page,
            max_logs_per_page: config.logs.max_logs_per_page,
            total_pages_rule: config.logs.total_pages_rule,
            request_timeout: config.request_timeout(),
        })
    }
}

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    let request_timeout = state.request_timeout;

    Router::new()
        .route("/api/logs/", get(get_logs))
        .route("/api/logs", get(get_logs))
        .route("/health", get(health))
        .layer(axum::middleware::from_fn(trace_requests))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ))
        .with_state(state)
}

/// Bind the configured address and serve until a shutdown signal arrives
pub async fn serve(config: &BoardlogConfig) -> Result<()> {
    let addr = config.bind_address()?;
    let state = AppState::from_config(config);
    if state.admin.is_empty() {
        warn!("No admin tokens configured; every log request will be refused");
    } else {
        info!("Admin tokens configured: {}", state.admin.len());
    }
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| BoardlogError::Internal(format!("Failed to bind {}: {}", addr, e)))?;

    info!("Listening on: http://{}", addr);
    info!("  - Logs: http://{}/api/logs/", addr);
    info!("  - Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| BoardlogError::Internal(format!("Server error: {}", e)))?;

    info!("Server shut down gracefully");
    Ok(())
}

/// Resolve on Ctrl-C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl-C: {}", e);
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
                tracing::warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl-C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
