//! The transactional inventory delta applier.
//!
//! Reconciles out-of-order, possibly-duplicated inventory-change events
//! into consistent per-location, per-SKU, per-lot quantity state. Each
//! event is applied in one optimistic transaction covering the item
//! record and its location rollup:
//!
//! - the item's stored idempotency signature short-circuits duplicate
//!   deliveries into a deliberate no-op
//! - quantities clamp at zero; the *applied* delta (which may differ from
//!   the nominal event delta when clamping occurs) is what feeds the
//!   rollup
//! - the location's `items_count` tracks zero/positive transitions of
//!   item quantities
//!
//! All transactional reads happen before any write, as the store contract
//! requires.

use crate::deadletter::DeadLetterSink;
use crate::event::Direction;
use crate::lot::normalize_lot_key;
use crate::resolver::LocationResolver;
use crate::store::{
    conflict_backoff, safe_seg, CollectionPath, DocPath, Document, DocumentStore, MergePatch,
    StoreError, StoreTransaction, TX_RETRY_BUDGET,
};
use crate::{InventoryChangeEvent, LedgerError, LedgerResult, LocationId};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info};

/// Result of applying one inventory-change event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The event moved quantity (possibly by zero after clamping)
    Applied {
        location_id: LocationId,
        item_id: String,
        previous: i64,
        next: i64,
        applied_delta: i64,
    },
    /// The event's signature matched the item's last applied event;
    /// nothing was written
    Duplicate,
}

/// Applies inventory-change events idempotently and atomically
pub struct DeltaApplier {
    store: Arc<dyn DocumentStore>,
    resolver: LocationResolver,
    dead_letters: DeadLetterSink,
}

impl DeltaApplier {
    /// Create an applier over the given store, resolver, and dead-letter sink
    pub fn new(
        store: Arc<dyn DocumentStore>,
        resolver: LocationResolver,
        dead_letters: DeadLetterSink,
    ) -> Self {
        Self {
            store,
            resolver,
            dead_letters,
        }
    }

    /// Apply one inventory-change event.
    ///
    /// Idempotent: re-applying an event with identical signature-forming
    /// fields is a no-op. Atomic: the item record and the location rollup
    /// change together or not at all.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::LocationNotFound`] after the event has been
    ///   dead-lettered — terminal for this event, operator intervention
    ///   expected
    /// - [`LedgerError::Store`] with a transient conflict error when the
    ///   retry budget is exhausted by concurrent writers
    pub async fn apply(&self, event: &InventoryChangeEvent) -> LedgerResult<ApplyOutcome> {
        let lot_key = normalize_lot_key(event.lot_id.as_deref(), event.lot_reference.as_deref());
        let item_id = item_id(event.sku.as_str(), lot_key.as_deref());

        let location_id = match self
            .resolver
            .resolve(&event.warehouse_id, &event.location_name)
            .await
        {
            Ok(id) => id,
            Err(err @ LedgerError::LocationNotFound { .. }) => {
                // Dead-letter before surfacing the error; a failed
                // dead-letter write takes precedence because it is the
                // one condition under which the event would otherwise be
                // lost without a trace.
                self.dead_letters.record_unknown_location(event).await?;
                return Err(err);
            }
            Err(other) => return Err(other),
        };

        let location_path = self.location_doc(event, &location_id);
        let item_path = location_path.collection("items").doc(&item_id);
        let signature = event.idempotency_signature();

        for attempt in 1..=TX_RETRY_BUDGET {
            let mut tx = self.store.begin().await?;
            let outcome = apply_in_tx(
                tx.as_mut(),
                event,
                lot_key.as_deref(),
                &signature,
                &location_path,
                &item_path,
            )
            .await?;

            if tx.commit().await? {
                match &outcome {
                    ApplyOutcome::Applied {
                        previous,
                        next,
                        applied_delta,
                        ..
                    } => {
                        info!(
                            warehouse = %event.warehouse_id,
                            location = %event.location_name,
                            sku = %event.sku,
                            item = %item_id,
                            previous,
                            next,
                            applied_delta,
                            "Inventory delta applied"
                        );
                    }
                    ApplyOutcome::Duplicate => {
                        info!(
                            warehouse = %event.warehouse_id,
                            location = %event.location_name,
                            sku = %event.sku,
                            item = %item_id,
                            "Duplicate delivery detected; no-op"
                        );
                    }
                }
                return Ok(outcome);
            }

            debug!(
                sku = %event.sku,
                item = %item_id,
                attempt,
                "Transaction conflict; retrying"
            );
            tokio::time::sleep(conflict_backoff(attempt)).await;
        }

        Err(StoreError::ConflictBudgetExhausted {
            attempts: TX_RETRY_BUDGET,
        }
        .into())
    }

    fn location_doc(&self, event: &InventoryChangeEvent, location_id: &LocationId) -> DocPath {
        CollectionPath::root("warehouses")
            .doc(&safe_seg(event.warehouse_id.as_str()))
            .collection("locations")
            .doc(location_id.as_str())
    }
}

/// Item document id: encoded SKU, suffixed by the encoded lot key when a
/// lot is present. Two physical lots of one SKU are distinct items.
fn item_id(sku: &str, lot_key: Option<&str>) -> String {
    match lot_key {
        Some(lot) => format!("{}__lot_{}", safe_seg(sku), safe_seg(lot)),
        None => safe_seg(sku),
    }
}

/// One transaction attempt: reads, then the duplicate check, then writes.
async fn apply_in_tx(
    tx: &mut dyn StoreTransaction,
    event: &InventoryChangeEvent,
    lot_key: Option<&str>,
    signature: &str,
    location_path: &DocPath,
    item_path: &DocPath,
) -> LedgerResult<ApplyOutcome> {
    // READS — all of them, before any write.
    let item = tx.get(item_path).await?;

    let previous = item
        .as_ref()
        .and_then(|doc| doc.get("quantity"))
        .and_then(Value::as_i64)
        .unwrap_or(0);

    let last_applied = item
        .as_ref()
        .and_then(|doc| doc.get("last_event_id"))
        .and_then(Value::as_str);

    if last_applied == Some(signature) {
        // Duplicate delivery: deliberate no-op. Nothing is buffered, so
        // the commit validates the read and writes nothing.
        return Ok(ApplyOutcome::Duplicate);
    }

    // Next quantity: absolute restatement wins over delta; both clamp at
    // zero. The applied delta may therefore differ from the nominal one.
    let next = match event.new_on_hand {
        Some(absolute) => absolute.max(0),
        None => (previous + event.delta.unwrap_or(0)).max(0),
    };
    let applied_delta = next - previous;

    let direction = event
        .direction
        .unwrap_or_else(|| Direction::from_delta(applied_delta));

    // WRITE item. Optional fields prefer the event's value and fall back
    // to whatever the item already stored.
    let prior = item.as_ref();
    let mut item_patch = MergePatch::new()
        .set("sku", json!(event.sku.as_str()))
        .set(
            "product_name",
            merge_field(event.product_name.as_deref(), prior, "product_name"),
        )
        .set("quantity", json!(next))
        .set("lot_id", merge_field(lot_key, prior, "lot_id"))
        .set(
            "lot_uuid",
            merge_field(event.lot_reference.as_deref(), prior, "lot_uuid"),
        )
        .set(
            "lot_name",
            merge_field(event.lot_name.as_deref(), prior, "lot_name"),
        )
        .set(
            "lot_expiration_date",
            merge_field(
                event.lot_expiration.as_deref(),
                prior,
                "lot_expiration_date",
            ),
        )
        .set("last_event_id", json!(signature))
        .set("last_event_delta", json!(applied_delta))
        .set("last_event_direction", json!(direction.as_str()))
        .set(
            "last_event_at",
            merge_field(event.event_timestamp.as_deref(), prior, "last_event_at"),
        )
        .server_time("updated_at");

    if let Some(event_ref) = &event.event_ref_path {
        item_patch = item_patch
            .set("last_event_ref", json!(event_ref))
            .array_union("event_refs", vec![json!(event_ref)]);
    }

    tx.set_merge(item_path, item_patch);

    // WRITE location rollup. Total quantity moves by the applied delta;
    // the distinct-item counter moves only on zero/positive transitions.
    let mut location_patch = MergePatch::new()
        .set("name", json!(event.location_name))
        .increment("qty_total", applied_delta)
        .server_time("updated_at");

    if previous <= 0 && next > 0 {
        location_patch = location_patch.increment("items_count", 1);
    } else if previous > 0 && next <= 0 {
        location_patch = location_patch.increment("items_count", -1);
    }

    tx.set_merge(location_path, location_patch);

    Ok(ApplyOutcome::Applied {
        location_id: LocationId::new(location_path.id())?,
        item_id: item_path.id().to_string(),
        previous,
        next,
        applied_delta,
    })
}

/// Prefer the event's value for a field, else the previously stored one.
fn merge_field(new_value: Option<&str>, prior: Option<&Document>, field: &str) -> Value {
    match new_value {
        Some(value) => json!(value),
        None => prior
            .and_then(|doc| doc.get(field))
            .cloned()
            .unwrap_or(Value::Null),
    }
}

#[cfg(test)]
#[path = "ledger_tests.rs"]
mod tests;
