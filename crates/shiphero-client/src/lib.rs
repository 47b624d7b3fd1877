//! # ShipHero API Client
//!
//! Async client for the ShipHero public GraphQL API. Provides the two
//! capabilities the stock-ledger pipeline needs from the warehouse
//! management system:
//!
//! - **Location lookup**: find a location by name within a warehouse, used
//!   by the just-in-time resolution path when an inventory event references
//!   a location not yet mirrored locally
//! - **Webhook management**: register, list, and delete the webhooks that
//!   feed the pipeline (operator tooling)
//!
//! Authentication is a long-lived refresh token exchanged for short-lived
//! bearer tokens; the client caches the bearer token, refreshes it
//! proactively before expiry, and retries exactly once on an unexpected
//! 401.
//!
//! # Examples
//!
//! ```no_run
//! use shiphero_client::{Credentials, ShipHeroClient};
//!
//! # async fn example() -> Result<(), shiphero_client::ShipHeroError> {
//! let client = ShipHeroClient::new(Credentials::new("refresh-token"))?;
//! let location = client.find_location_by_name("wh-1", "BIN-A1").await?;
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod client;
pub mod error;
pub mod locations;
pub mod webhooks;

pub use auth::Credentials;
pub use client::{ClientConfig, ShipHeroClient};
pub use error::ShipHeroError;
pub use locations::LocationRecord;
pub use webhooks::{CreatedWebhook, WebhookRecord};

/// Result type alias for ShipHero client operations
pub type Result<T> = std::result::Result<T, ShipHeroError>;
