//! # Stock-Ledger Core
//!
//! Core business logic for the stock-ledger inventory webhook pipeline.
//!
//! This crate contains the domain logic for processing ShipHero inventory
//! webhooks: validating signatures, normalizing lot identities, resolving
//! warehouse locations, and applying inventory deltas idempotently against
//! a transactional document store.
//!
//! ## Architecture
//!
//! The core follows clean architecture principles:
//! - Business logic depends only on trait abstractions
//! - Infrastructure implementations are injected at runtime
//! - All external dependencies (document store, warehouse API) are
//!   abstracted behind traits
//!
//! ## Usage
//!
//! ```rust
//! use stock_ledger_core::{Sku, WarehouseId};
//!
//! let warehouse = WarehouseId::new("V2FyZWhvdXNlOjEyMzQ1").unwrap();
//! let sku = Sku::new("WIDGET-1").unwrap();
//! assert_eq!(sku.as_str(), "WIDGET-1");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Standard result type for stock-ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;

// ============================================================================
// Domain Identifier Types
// ============================================================================

/// Opaque warehouse identifier assigned by the warehouse-management API
///
/// ShipHero sends this as `warehouse_uuid`; the value is treated as an
/// opaque string and never parsed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WarehouseId(String);

impl WarehouseId {
    /// Create new warehouse ID with validation
    ///
    /// The value is trimmed; an empty or whitespace-only value is rejected
    /// because every persisted path is rooted at the warehouse.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into().trim().to_string();
        if value.is_empty() {
            return Err(ValidationError::Required {
                field: "warehouse_id".to_string(),
            });
        }
        Ok(Self(value))
    }

    /// Get string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WarehouseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for WarehouseId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Internal identifier of a location record within a warehouse
///
/// This is the encoded document ID under `warehouses/{w}/locations/`, not
/// the human-readable location name. Produced by the location resolver.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LocationId(String);

impl LocationId {
    /// Create new location ID with validation
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        if value.is_empty() {
            return Err(ValidationError::Required {
                field: "location_id".to_string(),
            });
        }
        Ok(Self(value))
    }

    /// Get string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stock-keeping unit identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Sku(String);

impl Sku {
    /// Create new SKU with validation
    ///
    /// The value is trimmed; an empty or whitespace-only value is rejected.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into().trim().to_string();
        if value.is_empty() {
            return Err(ValidationError::Required {
                field: "sku".to_string(),
            });
        }
        Ok(Self(value))
    }

    /// Get string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Sku {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Sku {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// High-level error categorization for retry and alerting decisions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCategory {
    /// Temporary failures that may succeed on retry
    Transient,
    /// Permanent failures that won't succeed on retry
    Permanent,
    /// Security-related failures requiring immediate attention
    Security,
}

/// Error type for input validation failures
#[derive(Debug, Clone, thiserror::Error, Serialize, Deserialize)]
pub enum ValidationError {
    #[error("Field '{field}' is required")]
    Required { field: String },

    #[error("Field '{field}' has invalid format: {message}")]
    InvalidFormat { field: String, message: String },
}

/// Top-level error type for ledger operations
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Location '{location}' not found in warehouse '{warehouse}'")]
    LocationNotFound { warehouse: String, location: String },

    #[error("Document store error: {0}")]
    Store(#[from] store::StoreError),

    #[error("Warehouse directory error: {0}")]
    Directory(#[from] remote::DirectoryError),
}

impl LedgerError {
    /// Check if error is transient and should be retried
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Validation(_) => false,
            // Location misses are terminal for the event; the dead-letter
            // record is the recovery path, not a retry.
            Self::LocationNotFound { .. } => false,
            Self::Store(e) => e.is_transient(),
            Self::Directory(e) => e.is_transient(),
        }
    }

    /// Get error category for monitoring and alerting
    pub fn error_category(&self) -> ErrorCategory {
        match self {
            Self::Validation(_) => ErrorCategory::Permanent,
            Self::LocationNotFound { .. } => ErrorCategory::Permanent,
            Self::Store(e) => {
                if e.is_transient() {
                    ErrorCategory::Transient
                } else {
                    ErrorCategory::Permanent
                }
            }
            Self::Directory(_) => ErrorCategory::Transient,
        }
    }
}

// ============================================================================
// Module declarations
// ============================================================================

/// Inventory-change event model and idempotency signatures
pub mod event;

/// Lot identity normalization
pub mod lot;

/// Webhook signature verification (HMAC-SHA-256)
pub mod verify;

/// Transactional document store abstraction and in-memory implementation
pub mod store;

/// Remote warehouse directory trait (just-in-time location lookup)
pub mod remote;

/// Location name resolution with alias caching
pub mod resolver;

/// Dead-letter sink for unresolvable events
pub mod deadletter;

/// The transactional inventory delta applier
pub mod ledger;

/// Bounded-concurrency work queue for deferred webhook processing
pub mod queue;

// Re-export key types for convenience
pub use deadletter::DeadLetterSink;
pub use event::{Direction, InventoryChangeEvent};
pub use ledger::{ApplyOutcome, DeltaApplier};
pub use lot::normalize_lot_key;
pub use queue::WorkQueue;
pub use remote::{DirectoryError, LocationDirectory, RemoteLocation};
pub use resolver::LocationResolver;
pub use store::{
    CollectionPath, DocPath, Document, DocumentStore, FieldWrite, InMemoryStore, MergePatch,
    StoreError,
};
pub use verify::{compute_signature, verify_signature};

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
