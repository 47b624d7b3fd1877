//! Webhook payload routing.
//!
//! ShipHero multiplexes every subscription onto one endpoint and
//! discriminates with the `webhook_type` payload field. Only `Inventory
//! Change` mutates ledger state; the other known types are logged and
//! counted on a daily analytics rollup. Unknown types are ignored with a
//! warning so a new subscription added upstream never fails deliveries.

pub mod analytics;
pub mod inventory_change;

use crate::AppState;
use serde_json::Value;
use tracing::warn;

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;

/// Route one acknowledged webhook payload to its handler.
///
/// Runs on the work queue, after the 200 response has gone out.
pub async fn dispatch(state: &AppState, payload: Value) -> anyhow::Result<()> {
    let webhook_type = payload
        .get("webhook_type")
        .and_then(Value::as_str)
        .unwrap_or("");

    match webhook_type {
        "Inventory Change" => inventory_change::handle(state, &payload).await,
        "Inventory Update" => Ok(analytics::inventory_update(state, &payload).await?),
        "Tote Cleared" => Ok(analytics::tote_cleared(state, &payload).await?),
        "Order Packed Out" => Ok(analytics::order_packed_out(state, &payload).await?),
        "Shipment Update" => Ok(analytics::shipment_update(state, &payload).await?),
        other => {
            warn!(webhook_type = other, "Unhandled webhook type; ignoring");
            Ok(())
        }
    }
}
