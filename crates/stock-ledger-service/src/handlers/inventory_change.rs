//! The `Inventory Change` handler: the core ledger path.
//!
//! Two persistence steps, deliberately ordered:
//!
//! 1. Append the raw delivery to the day-bucketed audit collection
//!    (`inventory_changes/{ymd}/data`). A failure here is logged and
//!    processing continues — the audit trail is best-effort, the ledger
//!    is not.
//! 2. Apply the delta through the transactional applier, carrying the
//!    audit record's path as the event's provenance reference.

use crate::time::day_key;
use crate::AppState;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use stock_ledger_core::event::Direction;
use stock_ledger_core::store::{CollectionPath, DocPath, MergePatch, StoreError};
use stock_ledger_core::InventoryChangeEvent;
use tracing::warn;

#[cfg(test)]
#[path = "inventory_change_tests.rs"]
mod tests;

/// Process one `Inventory Change` delivery
pub async fn handle(state: &AppState, payload: &Value) -> anyhow::Result<()> {
    let mut event = InventoryChangeEvent::from_payload(payload)?;

    match persist_raw_record(state, payload, &event).await {
        Ok(path) => event.event_ref_path = Some(path.as_str().to_string()),
        Err(e) => warn!(
            warehouse = %event.warehouse_id,
            sku = %event.sku,
            error = %e,
            "Failed to persist raw event record; applying delta without provenance"
        ),
    }

    state.applier.apply(&event).await?;
    Ok(())
}

/// Append the delivery to the audit collection for the reporting day.
///
/// The day bucket follows the event's own timestamp when it carries a
/// parseable one; arrival time is the fallback. A late-redelivered
/// webhook therefore lands on the business day the change happened.
///
/// Captures the payload's identifying fields verbatim plus the derived
/// delta arithmetic, so a record can be replayed or reconciled without
/// the original HTTP request.
async fn persist_raw_record(
    state: &AppState,
    payload: &Value,
    event: &InventoryChangeEvent,
) -> Result<DocPath, StoreError> {
    let event_time = event
        .event_timestamp
        .as_deref()
        .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
        .map(|ts| ts.with_timezone(&Utc))
        .unwrap_or_else(Utc::now);
    let ymd = day_key(
        event_time,
        state.config.processing.reporting_utc_offset_hours,
    );
    let collection = CollectionPath::root("inventory_changes")
        .doc(&ymd)
        .collection("data");

    let new_on_hand = event.new_on_hand.or_else(|| {
        match (event.previous_on_hand, event.delta) {
            (Some(prev), Some(delta)) => Some(prev + delta),
            _ => None,
        }
    });
    let direction = event
        .direction
        .unwrap_or_else(|| Direction::from_delta(event.delta.unwrap_or(0)));

    let patch = MergePatch::new()
        .set("webhook_type", json!("Inventory Change"))
        .set("account_id", passthrough(payload, "account_id"))
        .set("account_uuid", passthrough(payload, "account_uuid"))
        .set("warehouse_id", passthrough(payload, "warehouse_id"))
        .set("warehouse_uuid", json!(event.warehouse_id.as_str()))
        .set("sku", json!(event.sku.as_str()))
        .set("location_name", json!(event.location_name))
        .set("delta", json!(event.delta))
        .set("previous_on_hand", json!(event.previous_on_hand))
        .set("new_on_hand", json!(new_on_hand))
        .set("direction", json!(direction.as_str()))
        .set("timestamp", json!(event.event_timestamp))
        .set("reason", passthrough(payload, "reason"))
        .set("source", json!(event.source))
        .set("lot_id", json!(event.lot_id))
        .set("lot_uuid", json!(event.lot_reference))
        .set("lot_name", json!(event.lot_name))
        .set("lot_expiration_date", json!(event.lot_expiration))
        .server_time("created_at");

    state.store.add(&collection, patch).await
}

/// Copy a payload field into the record as-is, `null` when absent
fn passthrough(payload: &Value, field: &str) -> Value {
    payload.get(field).cloned().unwrap_or(Value::Null)
}
