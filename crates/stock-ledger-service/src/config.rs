//! Service configuration.
//!
//! Every field carries a serde default so an entirely unconfigured
//! environment still deserializes into a valid (if unusable for
//! production) config. `validate()` is the place where "valid to
//! deserialize" and "valid to run" diverge: the webhook secret has no
//! sensible default and must be provided.

use serde::{Deserialize, Serialize};
use stock_ledger_core::queue::DEFAULT_CONCURRENCY;

/// Service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// HTTP server settings
    pub server: ServerConfig,

    /// Webhook intake settings
    pub webhook: WebhookConfig,

    /// ShipHero API client settings
    pub shiphero: ShipHeroConfig,

    /// Deferred-processing settings
    pub processing: ProcessingConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl ServiceConfig {
    /// Validate the configuration for running the service.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first problem
    /// found. Called once at startup; the service refuses to start on a
    /// broken config rather than failing per-request.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.webhook.secret.trim().is_empty() {
            return Err(ConfigError::Invalid {
                message: "webhook.secret must be set (SL__WEBHOOK__SECRET)".to_string(),
            });
        }
        if self.server.port == 0 {
            return Err(ConfigError::Invalid {
                message: "server.port must be non-zero".to_string(),
            });
        }
        if self.processing.concurrency == 0 {
            return Err(ConfigError::Invalid {
                message: "processing.concurrency must be at least 1".to_string(),
            });
        }
        if !(-23..=23).contains(&self.processing.reporting_utc_offset_hours) {
            return Err(ConfigError::Invalid {
                message: "processing.reporting_utc_offset_hours must be within -23..=23"
                    .to_string(),
            });
        }
        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
            other => Err(ConfigError::Invalid {
                message: format!("logging.level '{other}' is not a valid level"),
            }),
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout_seconds: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            shutdown_timeout_seconds: 30,
        }
    }
}

/// Webhook intake configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookConfig {
    /// Shared signature secret issued by ShipHero at webhook registration
    pub secret: String,
}

/// ShipHero API client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShipHeroConfig {
    /// Long-lived refresh token; empty disables just-in-time location
    /// lookups (events for unmirrored locations dead-letter instead)
    pub refresh_token: String,

    /// GraphQL endpoint
    pub api_url: String,

    /// Token refresh endpoint
    pub auth_url: String,

    /// Per-request timeout in seconds
    pub timeout_seconds: u64,
}

impl Default for ShipHeroConfig {
    fn default() -> Self {
        Self {
            refresh_token: String::new(),
            api_url: "https://public-api.shiphero.com/graphql".to_string(),
            auth_url: "https://public-api.shiphero.com/auth/refresh".to_string(),
            timeout_seconds: 30,
        }
    }
}

/// Deferred-processing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Maximum concurrently running webhook jobs
    pub concurrency: usize,

    /// UTC offset (hours) of the reporting timezone used to bucket raw
    /// event records by day
    pub reporting_utc_offset_hours: i32,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            // Pacific standard time, where the reporting day rolls over
            reporting_utc_offset_hours: -8,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Logging level
    pub level: String,

    /// Enable JSON structured logging
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
