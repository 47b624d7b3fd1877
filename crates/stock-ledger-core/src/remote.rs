//! Remote warehouse directory seam.
//!
//! The location resolver only needs one capability from the
//! warehouse-management API: "find the location with this exact name in
//! this warehouse". The trait keeps the GraphQL client, authentication,
//! and token refresh out of the core; the service crate provides the
//! production implementation.

use crate::WarehouseId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A location as described by the warehouse-management API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteLocation {
    /// Opaque location identifier assigned upstream
    pub id: String,
    pub name: String,
    pub zone: Option<String>,
    pub pickable: Option<bool>,
    pub sellable: Option<bool>,
    pub created_at: Option<String>,
}

/// Errors from the remote warehouse directory
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("Authentication failed: {message}")]
    Auth { message: String },

    #[error("Request failed: {message}")]
    Request { message: String },

    #[error("API returned errors: {message}")]
    Api { message: String },
}

impl DirectoryError {
    /// Check if the error is transient and worth retrying
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Request { .. } => true,
            Self::Auth { .. } => false,
            Self::Api { .. } => false,
        }
    }
}

/// Lookup capability for warehouse locations not yet mirrored locally
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LocationDirectory: Send + Sync {
    /// Find a location by exact name within a warehouse.
    ///
    /// `Ok(None)` means the warehouse has no location with this name —
    /// a terminal answer, distinct from a failed lookup.
    async fn find_location(
        &self,
        warehouse_id: &WarehouseId,
        name: &str,
    ) -> Result<Option<RemoteLocation>, DirectoryError>;
}
