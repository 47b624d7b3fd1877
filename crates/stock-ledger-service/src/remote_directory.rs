//! ShipHero-backed implementation of the core's location directory seam.
//!
//! The resolver asks one question: "does this warehouse have a location
//! with this exact name?". This adapter answers it with the ShipHero
//! GraphQL client and maps client errors onto the directory's error
//! taxonomy so the core never sees HTTP concerns.

use async_trait::async_trait;
use shiphero_client::{ShipHeroClient, ShipHeroError};
use std::sync::Arc;
use stock_ledger_core::remote::{DirectoryError, LocationDirectory, RemoteLocation};
use stock_ledger_core::WarehouseId;

/// Location directory backed by the ShipHero GraphQL API
pub struct ShipHeroDirectory {
    client: Arc<ShipHeroClient>,
}

impl ShipHeroDirectory {
    /// Create a directory over the given client
    pub fn new(client: Arc<ShipHeroClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl LocationDirectory for ShipHeroDirectory {
    async fn find_location(
        &self,
        warehouse_id: &WarehouseId,
        name: &str,
    ) -> Result<Option<RemoteLocation>, DirectoryError> {
        let record = self
            .client
            .find_location_by_name(warehouse_id.as_str(), name)
            .await
            .map_err(map_error)?;

        Ok(record.map(|r| RemoteLocation {
            id: r.id,
            name: r.name,
            zone: r.zone,
            pickable: r.pickable,
            sellable: r.sellable,
            created_at: r.created_at,
        }))
    }
}

/// Map client failures onto the directory error taxonomy.
///
/// Transport and HTTP-level failures count as request failures (transient
/// to the caller); GraphQL-level and decoding failures are API answers
/// (permanent); credential problems stand alone.
fn map_error(err: ShipHeroError) -> DirectoryError {
    match err {
        ShipHeroError::Auth { message } => DirectoryError::Auth { message },
        ShipHeroError::Http { status, message } => DirectoryError::Request {
            message: format!("HTTP {status}: {message}"),
        },
        ShipHeroError::Transport(e) => DirectoryError::Request {
            message: e.to_string(),
        },
        other => DirectoryError::Api {
            message: other.to_string(),
        },
    }
}

#[cfg(test)]
#[path = "remote_directory_tests.rs"]
mod tests;
