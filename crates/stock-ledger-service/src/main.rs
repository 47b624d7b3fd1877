//! # Stock-Ledger Service
//!
//! Binary entry point for the stock-ledger HTTP service.
//!
//! This executable:
//! - Loads configuration from environment and files
//! - Initializes logging
//! - Wires the document store, ShipHero client, and ledger pipeline
//! - Starts the HTTP server from the service library

use shiphero_client::{ClientConfig, Credentials, ShipHeroClient};
use std::sync::Arc;
use std::time::Duration;
use stock_ledger_service::config::ServiceConfig;
use stock_ledger_service::remote_directory::ShipHeroDirectory;
use stock_ledger_service::{start_server, AppState, ServiceError};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "stock_ledger_service=info,stock_ledger_core=info,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Stock-Ledger Service");

    // -------------------------------------------------------------------------
    // Load configuration
    //
    // Sources (applied in order — later sources override earlier ones):
    //  1. /etc/stock-ledger/service.yaml   — system-wide defaults
    //  2. ./config/service.yaml            — deployment-local override
    //  3. Path given by SL_CONFIG_FILE env — operator-specified file
    //  4. Environment variables prefixed SL__ (double-underscore separator)
    //     e.g. SL__SERVER__PORT=9090 sets server.port = 9090
    //
    // All configuration fields carry serde defaults, so absent files or an
    // entirely unconfigured environment deserializes cleanly; validate()
    // then rejects anything unusable (most notably a missing webhook
    // secret). A malformed file or an environment variable that cannot be
    // coerced to the correct type IS a hard error because it indicates
    // deliberate-but-broken operator configuration.
    // -------------------------------------------------------------------------
    let mut config_builder = config::Config::builder()
        .add_source(
            config::File::with_name("/etc/stock-ledger/service")
                .required(false)
                .format(config::FileFormat::Yaml),
        )
        .add_source(
            config::File::with_name("config/service")
                .required(false)
                .format(config::FileFormat::Yaml),
        );

    // Optional explicit path supplied by the operator.
    if let Ok(explicit_path) = std::env::var("SL_CONFIG_FILE") {
        if !explicit_path.is_empty() {
            config_builder = config_builder.add_source(
                config::File::with_name(&explicit_path)
                    .required(true)
                    .format(config::FileFormat::Yaml),
            );
            info!(path = %explicit_path, "Loading configuration from explicit path");
        }
    }

    let config = match config_builder
        .add_source(config::Environment::with_prefix("SL").separator("__"))
        .build()
    {
        Ok(cfg) => cfg,
        Err(e) => {
            error!(error = %e, "Failed to build configuration; aborting");
            std::process::exit(3);
        }
    };

    let service_config: ServiceConfig = match config.try_deserialize() {
        Ok(sc) => sc,
        Err(e) => {
            error!(
                error = %e,
                "Could not deserialize service configuration; aborting. \
                 Fix the configuration and restart."
            );
            std::process::exit(3);
        }
    };

    if let Err(e) = service_config.validate() {
        error!(error = %e, "Service configuration is invalid; aborting");
        std::process::exit(3);
    }

    // -------------------------------------------------------------------------
    // Wire dependencies
    //
    // The in-memory store is the only store implementation in this release;
    // it is non-durable, so a restart loses ledger state. The raw webhook
    // stream upstream is the source of truth for replay.
    // -------------------------------------------------------------------------
    warn!("Using in-memory document store; ledger state does not survive restarts");
    let store = Arc::new(stock_ledger_core::InMemoryStore::new());

    if service_config.shiphero.refresh_token.is_empty() {
        warn!(
            "No ShipHero refresh token configured; just-in-time location \
             lookups will fail and unknown locations will dead-letter"
        );
    }

    let client_config = ClientConfig::default()
        .with_api_url(service_config.shiphero.api_url.clone())
        .with_auth_url(service_config.shiphero.auth_url.clone())
        .with_timeout(Duration::from_secs(service_config.shiphero.timeout_seconds));
    let client = match ShipHeroClient::with_config(
        Credentials::new(service_config.shiphero.refresh_token.clone()),
        client_config,
    ) {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, "ShipHero client configuration is invalid; aborting");
            std::process::exit(3);
        }
    };
    let directory = Arc::new(ShipHeroDirectory::new(Arc::new(client)));

    let state = AppState::new(service_config, store, directory);

    info!(
        host = %state.config.server.host,
        port = state.config.server.port,
        concurrency = state.queue.concurrency(),
        "Starting HTTP server"
    );

    // Start the server
    if let Err(e) = start_server(state).await {
        error!("Failed to start server: {}", e);

        let exit_code = match e {
            ServiceError::BindFailed { .. } => 1,
            ServiceError::ServerFailed { .. } => 2,
            ServiceError::Configuration(_) => 3,
        };

        std::process::exit(exit_code);
    }

    Ok(())
}
