//! Peripheral webhook handlers.
//!
//! These webhook types carry operational signals but do not move ledger
//! quantities. Each delivery is logged with its identifying fields and
//! counted on a day-bucketed rollup document (`analytics_daily/{ymd}`)
//! via atomic increments. Counters are delivery counters, not event
//! counters: a redelivered webhook bumps them again.

use crate::time::day_key;
use crate::AppState;
use chrono::Utc;
use serde_json::Value;
use stock_ledger_core::store::{CollectionPath, MergePatch, StoreError};
use tracing::info;

#[cfg(test)]
#[path = "analytics_tests.rs"]
mod tests;

/// `Inventory Update`: a snapshot of on-hand levels per SKU
pub async fn inventory_update(state: &AppState, payload: &Value) -> Result<(), StoreError> {
    let entries = payload
        .get("inventory")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[]);

    info!(entries = entries.len(), "Inventory update received");
    for entry in entries {
        let on_hand = entry.get("on_hand").and_then(Value::as_i64);
        info!(
            sku = str_field(entry, "sku"),
            warehouse = str_field(entry, "warehouse_uuid"),
            on_hand,
            "Inventory update entry"
        );
    }

    bump(state, "inventory_updates").await
}

/// `Tote Cleared`: a picking tote was emptied
pub async fn tote_cleared(state: &AppState, payload: &Value) -> Result<(), StoreError> {
    info!(
        tote = str_field(payload, "tote_name"),
        warehouse = str_field(payload, "warehouse_uuid"),
        "Tote cleared"
    );
    bump(state, "totes_cleared").await
}

/// `Order Packed Out`: an order finished packing
pub async fn order_packed_out(state: &AppState, payload: &Value) -> Result<(), StoreError> {
    info!(
        order_number = str_field(payload, "order_number"),
        order_uuid = str_field(payload, "order_uuid"),
        warehouse = str_field(payload, "warehouse_uuid"),
        "Order packed out"
    );
    bump(state, "orders_packed_out").await
}

/// `Shipment Update`: carrier/tracking state changed for a shipment
pub async fn shipment_update(state: &AppState, payload: &Value) -> Result<(), StoreError> {
    info!(
        order_number = str_field(payload, "order_number"),
        tracking_number = str_field(payload, "tracking_number"),
        carrier = str_field(payload, "carrier"),
        "Shipment update"
    );
    bump(state, "shipments_updated").await
}

/// Increment one counter on the reporting day's rollup document
async fn bump(state: &AppState, counter: &str) -> Result<(), StoreError> {
    let ymd = day_key(
        Utc::now(),
        state.config.processing.reporting_utc_offset_hours,
    );
    let path = CollectionPath::root("analytics_daily").doc(&ymd);
    let patch = MergePatch::new()
        .increment(counter, 1)
        .server_time("updated_at");
    state.store.set_merge(&path, patch).await
}

fn str_field<'a>(payload: &'a Value, field: &str) -> Option<&'a str> {
    payload.get(field).and_then(Value::as_str)
}
