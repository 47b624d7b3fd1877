//! # Stock-Ledger CLI
//!
//! Operator tooling for the stock-ledger webhook pipeline.
//!
//! This module provides CLI commands for:
//! - Registering, listing, and deleting ShipHero webhook subscriptions
//! - Delivering a locally signed test webhook to an intake endpoint

use clap::{Parser, Subcommand};
use shiphero_client::{ClientConfig, Credentials, ShipHeroClient, ShipHeroError};
use stock_ledger_core::compute_signature;
use tracing::info;

// ============================================================================
// CLI Structure
// ============================================================================

/// Stock-Ledger CLI - webhook management for the inventory pipeline
#[derive(Parser)]
#[command(name = "stock-ledger")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Manage ShipHero webhook subscriptions for stock-ledger")]
pub struct Cli {
    /// ShipHero refresh token (required for API commands)
    #[arg(long, env = "SHIPHERO_REFRESH_TOKEN", global = true)]
    pub refresh_token: Option<String>,

    /// ShipHero GraphQL endpoint
    #[arg(
        long,
        global = true,
        default_value = "https://public-api.shiphero.com/graphql"
    )]
    pub api_url: String,

    /// ShipHero token refresh endpoint
    #[arg(
        long,
        global = true,
        default_value = "https://public-api.shiphero.com/auth/refresh"
    )]
    pub auth_url: String,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Register a webhook subscription with ShipHero
    Register {
        /// Webhook name, e.g. "Inventory Change"
        #[arg(short, long)]
        name: String,

        /// Public URL of the intake endpoint
        #[arg(short, long)]
        url: String,
    },

    /// List registered webhook subscriptions
    List,

    /// Delete a webhook subscription by name
    Delete {
        /// Webhook name to delete
        #[arg(short, long)]
        name: String,
    },

    /// Sign and deliver a test webhook to an intake endpoint
    SendTest {
        /// Endpoint URL, e.g. http://localhost:8080/webhooks/shiphero
        #[arg(short, long)]
        url: String,

        /// Shared signature secret the endpoint verifies with
        #[arg(short, long, env = "SL__WEBHOOK__SECRET")]
        secret: String,

        /// JSON payload to deliver; a sample Inventory Change when omitted
        #[arg(short, long)]
        payload: Option<String>,
    },
}

// ============================================================================
// CLI Error Types
// ============================================================================

/// CLI-specific errors
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(
        "Missing ShipHero refresh token; pass --refresh-token or set SHIPHERO_REFRESH_TOKEN"
    )]
    MissingToken,

    #[error("Invalid argument: {arg} - {message}")]
    InvalidArgument { arg: String, message: String },

    #[error("ShipHero API error: {0}")]
    Api(#[from] ShipHeroError),

    #[error("Delivery failed: {message}")]
    DeliveryFailed { message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

// ============================================================================
// Main Entry Point
// ============================================================================

/// Main CLI entry point
pub async fn run_cli() -> Result<(), CliError> {
    let cli = Cli::parse();
    execute(cli).await
}

/// Execute a parsed command
pub async fn execute(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Register { ref name, ref url } => {
            let client = api_client(&cli)?;
            execute_register(&client, name, url).await
        }
        Commands::List => {
            let client = api_client(&cli)?;
            execute_list(&client).await
        }
        Commands::Delete { ref name } => {
            let client = api_client(&cli)?;
            execute_delete(&client, name).await
        }
        Commands::SendTest {
            ref url,
            ref secret,
            ref payload,
        } => execute_send_test(url, secret, payload.as_deref()).await,
    }
}

fn api_client(cli: &Cli) -> Result<ShipHeroClient, CliError> {
    let token = cli
        .refresh_token
        .as_deref()
        .filter(|t| !t.is_empty())
        .ok_or(CliError::MissingToken)?;

    let config = ClientConfig::default()
        .with_api_url(cli.api_url.clone())
        .with_auth_url(cli.auth_url.clone());

    Ok(ShipHeroClient::with_config(Credentials::new(token), config)?)
}

// ============================================================================
// Command Implementations
// ============================================================================

async fn execute_register(
    client: &ShipHeroClient,
    name: &str,
    url: &str,
) -> Result<(), CliError> {
    info!(name, url, "Registering webhook");
    let webhook = client.create_webhook(name, url).await?;

    println!("Registered webhook '{}' -> {}", webhook.name, webhook.url);
    match webhook.shared_signature_secret {
        Some(secret) => {
            println!("Shared signature secret: {secret}");
            println!("Configure the intake service with SL__WEBHOOK__SECRET=<secret>");
        }
        None => println!("ShipHero returned no signature secret for this webhook"),
    }
    Ok(())
}

async fn execute_list(client: &ShipHeroClient) -> Result<(), CliError> {
    let webhooks = client.list_webhooks().await?;

    if webhooks.is_empty() {
        println!("No webhooks registered");
        return Ok(());
    }
    for webhook in webhooks {
        println!(
            "{}  {}  {}  (source: {})",
            webhook.id,
            webhook.name,
            webhook.url,
            webhook.source.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

async fn execute_delete(client: &ShipHeroClient, name: &str) -> Result<(), CliError> {
    info!(name, "Deleting webhook");
    client.delete_webhook(name).await?;
    println!("Deleted webhook '{name}'");
    Ok(())
}

/// Deliver a signed test webhook.
///
/// The signature is computed over the exact bytes sent, the same way
/// ShipHero signs production deliveries, so this exercises the endpoint's
/// full verification path.
async fn execute_send_test(
    url: &str,
    secret: &str,
    payload: Option<&str>,
) -> Result<(), CliError> {
    let body = match payload {
        Some(raw) => {
            // Validate up front; a typo'd payload should fail here, not
            // as a confusing 500 from the endpoint.
            serde_json::from_str::<serde_json::Value>(raw).map_err(|e| {
                CliError::InvalidArgument {
                    arg: "payload".to_string(),
                    message: e.to_string(),
                }
            })?;
            raw.to_string()
        }
        None => sample_payload(),
    };

    let signature = compute_signature(secret, body.as_bytes());
    info!(url, "Delivering signed test webhook");

    let response = reqwest::Client::new()
        .post(url)
        .header("content-type", "application/json")
        .header("x-shiphero-hmac-sha256", signature)
        .body(body)
        .send()
        .await?;

    let status = response.status();
    let response_body = response.text().await.unwrap_or_default();
    println!("{status}: {response_body}");

    if !status.is_success() {
        return Err(CliError::DeliveryFailed {
            message: format!("endpoint answered {status}"),
        });
    }
    Ok(())
}

/// A representative Inventory Change payload for endpoint smoke tests
pub fn sample_payload() -> String {
    serde_json::json!({
        "webhook_type": "Inventory Change",
        "warehouse_uuid": "test-warehouse",
        "location_name": "TEST-BIN-1",
        "sku": "TEST-SKU-1",
        "quantity": 1,
        "source": "stock-ledger-cli",
        "timestamp": "2026-01-01T00:00:00Z"
    })
    .to_string()
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
