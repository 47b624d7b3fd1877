//! Dead-letter sink for events that fail location resolution.
//!
//! An event whose location cannot be resolved anywhere (alias, local
//! lookups, remote directory) is terminal: it is recorded here for manual
//! inspection and replay, then surfaced as a fatal error. The record is
//! written *before* the error propagates so that no event is silently
//! lost, even on failure.

use crate::store::{CollectionPath, DocPath, DocumentStore, MergePatch, StoreError};
use crate::InventoryChangeEvent;
use serde_json::json;
use std::sync::Arc;
use tracing::warn;

/// Collection holding unresolvable inventory events
const DEAD_LETTER_COLLECTION: &str = "inventory_events_unknown_location";

/// Records unprocessable events for operator inspection
pub struct DeadLetterSink {
    store: Arc<dyn DocumentStore>,
}

impl DeadLetterSink {
    /// Create a sink over the given store
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Record an event whose location could not be resolved.
    ///
    /// Returns the path of the dead-letter record.
    pub async fn record_unknown_location(
        &self,
        event: &InventoryChangeEvent,
    ) -> Result<DocPath, StoreError> {
        let patch = MergePatch::new()
            .set("reason", json!("location_not_found"))
            .set("warehouse_id", json!(event.warehouse_id.as_str()))
            .set("location_name", json!(event.location_name))
            .set("sku", json!(event.sku.as_str()))
            .set("delta", json!(event.delta))
            .set("new_on_hand", json!(event.new_on_hand))
            .set("lot_id", json!(event.lot_id))
            .set("lot_uuid", json!(event.lot_reference))
            .set("event_ref_path", json!(event.event_ref_path))
            .set("event_timestamp", json!(event.event_timestamp))
            .set("source", json!(event.source))
            .server_time("recorded_at");

        let path = self
            .store
            .add(&CollectionPath::root(DEAD_LETTER_COLLECTION), patch)
            .await?;

        warn!(
            warehouse = %event.warehouse_id,
            location = %event.location_name,
            sku = %event.sku,
            dead_letter = %path,
            "Inventory event dead-lettered: location not found"
        );

        Ok(path)
    }
}

#[cfg(test)]
#[path = "deadletter_tests.rs"]
mod tests;
