//! # Stock-Ledger HTTP Service
//!
//! HTTP intake for ShipHero inventory webhooks.
//!
//! This service provides:
//! - The webhook endpoint with HMAC signature verification over the raw
//!   request body
//! - Immediate acknowledgement, with processing deferred onto a
//!   bounded-concurrency work queue
//! - Routing by `webhook_type` to the ledger path or the peripheral
//!   analytics handlers
//! - A liveness endpoint

pub mod config;
pub mod handlers;
pub mod remote_directory;
pub mod time;

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::Json,
    routing::{get, post},
    Router,
};
use bytes::Bytes;
use crate::config::ServiceConfig;
use serde::Serialize;
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use stock_ledger_core::{
    verify_signature, DeadLetterSink, DeltaApplier, DocumentStore, LocationDirectory,
    LocationResolver, WorkQueue,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, instrument, warn};

/// Header carrying the base64 HMAC-SHA-256 of the raw request body
pub const SIGNATURE_HEADER: &str = "x-shiphero-hmac-sha256";

// ============================================================================
// Application State
// ============================================================================

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Configuration for the service
    pub config: ServiceConfig,

    /// Document store backing the ledger
    pub store: Arc<dyn DocumentStore>,

    /// The transactional delta applier
    pub applier: Arc<DeltaApplier>,

    /// Deferred-processing queue
    pub queue: WorkQueue,
}

impl AppState {
    /// Wire up application state from its external dependencies.
    ///
    /// The resolver, dead-letter sink, and applier are internal plumbing;
    /// callers supply only the store and the remote location directory.
    pub fn new(
        config: ServiceConfig,
        store: Arc<dyn DocumentStore>,
        directory: Arc<dyn LocationDirectory>,
    ) -> Self {
        let resolver = LocationResolver::new(Arc::clone(&store), directory);
        let dead_letters = DeadLetterSink::new(Arc::clone(&store));
        let applier = Arc::new(DeltaApplier::new(
            Arc::clone(&store),
            resolver,
            dead_letters,
        ));
        let queue = WorkQueue::new(config.processing.concurrency);

        Self {
            config,
            store,
            applier,
            queue,
        }
    }
}

// ============================================================================
// HTTP Server
// ============================================================================

/// Create HTTP router with all endpoints
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/webhooks/shiphero", post(handle_webhook))
        .route("/healthz", get(handle_healthz))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .into_inner(),
        )
        .with_state(state)
}

/// Start the HTTP server and run it until shutdown.
///
/// Serves with graceful shutdown on SIGINT/SIGTERM, then drains the work
/// queue (bounded by the configured shutdown timeout) so acknowledged
/// webhooks are not dropped on the floor by a restart.
pub async fn start_server(state: AppState) -> Result<(), ServiceError> {
    state.config.validate()?;

    let address = format!(
        "{}:{}",
        state.config.server.host, state.config.server.port
    );
    let addr: SocketAddr = address.parse().map_err(|e: std::net::AddrParseError| {
        ServiceError::BindFailed {
            address: address.clone(),
            message: e.to_string(),
        }
    })?;

    let listener =
        tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| ServiceError::BindFailed {
                address: addr.to_string(),
                message: e.to_string(),
            })?;

    info!("Starting HTTP server on {}", addr);

    let shutdown_timeout =
        std::time::Duration::from_secs(state.config.server.shutdown_timeout_seconds);
    let queue = state.queue.clone();
    let app = create_router(state);

    let shutdown_signal = async move {
        let ctrl_c = async {
            tokio::signal::ctrl_c()
                .await
                .expect("Failed to install Ctrl+C signal handler");
        };

        #[cfg(unix)]
        let terminate = async {
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("Failed to install SIGTERM signal handler")
                .recv()
                .await;
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {
                info!("Received SIGINT (Ctrl+C), initiating graceful shutdown");
            },
            _ = terminate => {
                info!("Received SIGTERM, initiating graceful shutdown");
            },
        }
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await
        .map_err(|e| ServiceError::ServerFailed {
            message: e.to_string(),
        })?;

    // Acknowledged deliveries may still be queued; give them the shutdown
    // window to complete.
    info!(
        in_flight = queue.in_flight(),
        "HTTP server stopped; draining work queue"
    );
    if tokio::time::timeout(shutdown_timeout, queue.drain())
        .await
        .is_err()
    {
        warn!(
            in_flight = queue.in_flight(),
            "Shutdown deadline reached with jobs still in flight"
        );
    }

    info!("HTTP server shutdown complete");
    Ok(())
}

// ============================================================================
// Handlers
// ============================================================================

/// Handle ShipHero webhook deliveries.
///
/// Ack-then-process: the signature is verified against the exact wire
/// bytes, the payload is parsed, and the 200 goes out before any ledger
/// work happens. ShipHero retries non-200 responses, so a processing
/// failure after acknowledgement must never surface here — the work
/// queue is the error boundary for the deferred job.
#[instrument(skip(state, headers, body))]
pub async fn handle_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, Json<AckResponse>) {
    let provided = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());

    let Some(provided) = provided else {
        warn!("Webhook rejected: missing signature header");
        return (
            StatusCode::UNAUTHORIZED,
            Json(AckResponse::invalid_signature()),
        );
    };

    if !verify_signature(&state.config.webhook.secret, &body, provided) {
        warn!("Webhook rejected: signature mismatch");
        return (
            StatusCode::UNAUTHORIZED,
            Json(AckResponse::invalid_signature()),
        );
    }

    let payload: Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => {
            error!(error = %e, "Webhook body is not valid JSON");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(AckResponse::error()),
            );
        }
    };

    let webhook_type = payload
        .get("webhook_type")
        .and_then(Value::as_str)
        .unwrap_or("unknown")
        .to_string();
    info!(webhook_type = %webhook_type, "Webhook accepted");

    let job_state = state.clone();
    state.queue.push(&format!("webhook:{webhook_type}"), async move {
        handlers::dispatch(&job_state, payload).await
    });

    (StatusCode::OK, Json(AckResponse::success()))
}

/// Liveness probe
async fn handle_healthz() -> &'static str {
    "ok"
}

// ============================================================================
// Response Types
// ============================================================================

/// Acknowledgement body in the shape ShipHero expects
#[derive(Debug, Clone, Serialize)]
pub struct AckResponse {
    pub code: String,
    #[serde(rename = "Status")]
    pub status: String,
}

impl AckResponse {
    fn success() -> Self {
        Self {
            code: "200".to_string(),
            status: "Success".to_string(),
        }
    }

    fn invalid_signature() -> Self {
        Self {
            code: "401".to_string(),
            status: "Invalid signature".to_string(),
        }
    }

    fn error() -> Self {
        Self {
            code: "500".to_string(),
            status: "Error".to_string(),
        }
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// Service-level errors
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Failed to bind to address {address}: {message}")]
    BindFailed { address: String, message: String },

    #[error("Server failed: {message}")]
    ServerFailed { message: String },

    #[error("Configuration error: {0}")]
    Configuration(#[from] crate::config::ConfigError),
}
