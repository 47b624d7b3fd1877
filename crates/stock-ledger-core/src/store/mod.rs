//! # Document Store Abstraction
//!
//! Transactional document store consumed by the ledger, modelled after the
//! capabilities the pipeline actually relies on:
//!
//! - point reads and merge-writes of JSON documents
//! - atomic numeric increments and array-union writes
//! - auto-id document creation
//! - equality queries and bounded listing within a collection
//! - multi-document optimistic transactions in which **all reads must
//!   happen before all writes** — this ordering is part of the store
//!   contract, not a style preference, and [`StoreTransaction::get`]
//!   enforces it
//!
//! Production deployments provide their own adapter; [`InMemoryStore`]
//! implements the full contract for development and testing.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::time::Duration;

mod memory;
mod path;

pub use memory::InMemoryStore;
pub use path::{safe_seg, CollectionPath, DocPath};

/// A stored document: a flat or nested JSON object
pub type Document = serde_json::Map<String, Value>;

/// Number of times a conflicting transaction is retried before the
/// conflict surfaces as a transient failure.
pub const TX_RETRY_BUDGET: u32 = 5;

// ============================================================================
// Error Types
// ============================================================================

/// Errors from document store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Transaction conflict persisted after {attempts} attempts")]
    ConflictBudgetExhausted { attempts: u32 },

    #[error("Transaction read of '{path}' after a buffered write; all reads must precede writes")]
    ReadAfterWrite { path: String },

    #[error("Invalid document path: {path}")]
    InvalidPath { path: String },

    #[error("Store operation failed: {message}")]
    OperationFailed { message: String },

    #[error("Store not available: {message}")]
    Unavailable { message: String },
}

impl StoreError {
    /// Check if the error is transient and worth retrying
    pub fn is_transient(&self) -> bool {
        match self {
            Self::ConflictBudgetExhausted { .. } => true,
            Self::OperationFailed { .. } => true,
            Self::Unavailable { .. } => true,
            Self::ReadAfterWrite { .. } => false,
            Self::InvalidPath { .. } => false,
        }
    }
}

// ============================================================================
// Write Model
// ============================================================================

/// A single field mutation within a merge-write
#[derive(Debug, Clone, PartialEq)]
pub enum FieldWrite {
    /// Overwrite the field with the given value
    Set(Value),
    /// Atomically add to the field's numeric value (absent counts as 0)
    Increment(i64),
    /// Append the values not already present (absent counts as empty array)
    ArrayUnion(Vec<Value>),
    /// Set the field to the store's commit time
    ServerTime,
}

/// An ordered set of field mutations applied to one document.
///
/// Merge semantics: fields not named in the patch keep their stored value;
/// a patch against an absent document creates it.
///
/// # Examples
///
/// ```rust
/// use serde_json::json;
/// use stock_ledger_core::store::MergePatch;
///
/// let patch = MergePatch::new()
///     .set("sku", json!("WIDGET-1"))
///     .increment("qty_total", -3)
///     .server_time("updated_at");
/// assert_eq!(patch.fields().len(), 3);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergePatch {
    fields: Vec<(String, FieldWrite)>,
}

impl MergePatch {
    /// Create an empty patch
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite a field
    pub fn set(mut self, field: &str, value: Value) -> Self {
        self.fields.push((field.to_string(), FieldWrite::Set(value)));
        self
    }

    /// Atomically increment a numeric field
    pub fn increment(mut self, field: &str, delta: i64) -> Self {
        self.fields
            .push((field.to_string(), FieldWrite::Increment(delta)));
        self
    }

    /// Union values into an array field
    pub fn array_union(mut self, field: &str, values: Vec<Value>) -> Self {
        self.fields
            .push((field.to_string(), FieldWrite::ArrayUnion(values)));
        self
    }

    /// Set a field to the commit timestamp
    pub fn server_time(mut self, field: &str) -> Self {
        self.fields.push((field.to_string(), FieldWrite::ServerTime));
        self
    }

    /// Ordered field mutations in this patch
    pub fn fields(&self) -> &[(String, FieldWrite)] {
        &self.fields
    }

    /// Whether the patch mutates nothing
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Apply a merge patch to a document in place.
///
/// Shared by store implementations so that merge semantics cannot drift
/// between the transactional and non-transactional write paths.
pub(crate) fn apply_patch(doc: &mut Document, patch: &MergePatch, commit_time: DateTime<Utc>) {
    for (field, write) in patch.fields() {
        match write {
            FieldWrite::Set(value) => {
                doc.insert(field.clone(), value.clone());
            }
            FieldWrite::Increment(delta) => {
                let current = doc.get(field).and_then(Value::as_i64).unwrap_or(0);
                doc.insert(field.clone(), Value::from(current + delta));
            }
            FieldWrite::ArrayUnion(values) => {
                let mut array = match doc.get(field) {
                    Some(Value::Array(existing)) => existing.clone(),
                    _ => Vec::new(),
                };
                for value in values {
                    if !array.contains(value) {
                        array.push(value.clone());
                    }
                }
                doc.insert(field.clone(), Value::Array(array));
            }
            FieldWrite::ServerTime => {
                doc.insert(field.clone(), Value::String(commit_time.to_rfc3339()));
            }
        }
    }
}

// ============================================================================
// Store Traits
// ============================================================================

/// Transactional document store consumed by the ledger
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Read a single document, `None` when absent
    async fn get(&self, path: &DocPath) -> Result<Option<Document>, StoreError>;

    /// Merge-write a single document outside any transaction
    async fn set_merge(&self, path: &DocPath, patch: MergePatch) -> Result<(), StoreError>;

    /// Create a document with an auto-generated id, returning its path
    async fn add(
        &self,
        collection: &CollectionPath,
        patch: MergePatch,
    ) -> Result<DocPath, StoreError>;

    /// Query a collection for documents whose `field` equals `value`
    async fn find_eq(
        &self,
        collection: &CollectionPath,
        field: &str,
        value: &Value,
        limit: usize,
    ) -> Result<Vec<(DocPath, Document)>, StoreError>;

    /// List up to `limit` documents in a collection
    async fn list(
        &self,
        collection: &CollectionPath,
        limit: usize,
    ) -> Result<Vec<(DocPath, Document)>, StoreError>;

    /// Begin an optimistic transaction.
    ///
    /// The transaction buffers writes until [`StoreTransaction::commit`];
    /// a conflicting concurrent commit causes `commit` to report failure
    /// so the caller can re-run its read-compute-write cycle.
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, StoreError>;
}

/// A single optimistic transaction attempt.
///
/// Reads record the version of every document they observe; `commit`
/// validates that none of those documents changed underneath the
/// transaction before applying the buffered writes atomically.
#[async_trait]
pub trait StoreTransaction: Send {
    /// Read a document inside the transaction.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ReadAfterWrite`] when called after the first
    /// buffered write — the optimistic-concurrency contract requires all
    /// reads to precede all writes.
    async fn get(&mut self, path: &DocPath) -> Result<Option<Document>, StoreError>;

    /// Buffer a merge-write to be applied at commit
    fn set_merge(&mut self, path: &DocPath, patch: MergePatch);

    /// Validate reads and apply writes atomically.
    ///
    /// Returns `Ok(false)` when a concurrent commit invalidated one of the
    /// documents read by this transaction; the caller should retry.
    async fn commit(self: Box<Self>) -> Result<bool, StoreError>;
}

/// Backoff before retrying a conflicted transaction attempt.
///
/// Linear and small: conflicts are expected to be rare and short-lived
/// (two deliveries racing on the same item key).
pub fn conflict_backoff(attempt: u32) -> Duration {
    Duration::from_millis(10 * u64::from(attempt))
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
