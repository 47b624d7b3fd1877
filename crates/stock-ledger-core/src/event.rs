//! Inventory-change event model.
//!
//! An [`InventoryChangeEvent`] is the normalized form of one `Inventory
//! Change` webhook delivery. It is immutable once built; the delta applier
//! consumes it without modification, so a redelivered webhook always
//! produces a byte-identical event and therefore an identical idempotency
//! signature.

use crate::{Sku, ValidationError, WarehouseId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Direction hint carried by an inventory change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Increase,
    Decrease,
    None,
}

impl Direction {
    /// Direction implied by a signed quantity delta
    pub fn from_delta(delta: i64) -> Self {
        match delta {
            d if d > 0 => Self::Increase,
            d if d < 0 => Self::Decrease,
            _ => Self::None,
        }
    }

    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Increase => "increase",
            Self::Decrease => "decrease",
            Self::None => "none",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One inventory-change webhook delivery, normalized and validated.
///
/// Required fields (warehouse, location name, SKU) are validated at
/// construction; everything else is optional because the upstream payload
/// omits fields freely. At least one of `delta` / `new_on_hand` must be
/// derivable for the event to move quantity, but an event carrying neither
/// is still valid (it applies a zero delta).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryChangeEvent {
    pub warehouse_id: WarehouseId,
    pub location_name: String,
    pub sku: Sku,

    /// Signed adjustment to on-hand quantity (`quantity` in the payload)
    pub delta: Option<i64>,
    /// Absolute restatement of on-hand quantity; wins over `delta`
    pub new_on_hand: Option<i64>,
    /// On-hand quantity before this change, as reported upstream
    pub previous_on_hand: Option<i64>,

    pub lot_id: Option<String>,
    /// Opaque encoded lot reference (`lot_uuid` in the payload)
    pub lot_reference: Option<String>,
    pub lot_name: Option<String>,
    pub lot_expiration: Option<String>,

    pub product_name: Option<String>,

    /// Path of the persisted raw event record, when one was written
    pub event_ref_path: Option<String>,
    /// Direction hint; the applier falls back to the sign of the applied
    /// delta when absent
    pub direction: Option<Direction>,
    /// Upstream event timestamp (ISO string, passed through verbatim)
    pub event_timestamp: Option<String>,
    /// Upstream change source, e.g. "cycle_count"
    pub source: Option<String>,
}

impl InventoryChangeEvent {
    /// Build an event from a raw webhook payload.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::Required`] when `warehouse_uuid`,
    /// `location_name`, or `sku` is missing or blank after trimming. The
    /// event is rejected whole; no partial application is possible.
    pub fn from_payload(payload: &Value) -> Result<Self, ValidationError> {
        let warehouse_id = WarehouseId::new(str_field(payload, "warehouse_uuid").unwrap_or_default())
            .map_err(|_| ValidationError::Required {
                field: "warehouse_uuid".to_string(),
            })?;

        let location_name = str_field(payload, "location_name")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ValidationError::Required {
                field: "location_name".to_string(),
            })?;

        let sku = Sku::new(str_field(payload, "sku").unwrap_or_default()).map_err(|_| {
            ValidationError::Required {
                field: "sku".to_string(),
            }
        })?;

        let delta = int_field(payload, "quantity");

        Ok(Self {
            warehouse_id,
            location_name,
            sku,
            delta,
            new_on_hand: int_field(payload, "new_on_hand"),
            previous_on_hand: int_field(payload, "previous_on_hand"),
            lot_id: lot_id_field(payload),
            lot_reference: str_field(payload, "lot_uuid").map(str::to_string),
            lot_name: str_field(payload, "lot_name").map(str::to_string),
            lot_expiration: str_field(payload, "lot_expiration").map(str::to_string),
            product_name: str_field(payload, "product_name").map(str::to_string),
            event_ref_path: None,
            direction: delta.map(Direction::from_delta),
            event_timestamp: str_field(payload, "timestamp").map(str::to_string),
            source: str_field(payload, "source").map(str::to_string),
        })
    }

    /// Deterministic idempotency signature for this delivery.
    ///
    /// Derived from the signature-forming fields only, so a redelivered
    /// webhook computes the same value and is detected as a duplicate by
    /// the applier. Missing components are replaced by fixed placeholder
    /// tokens rather than omitted, keeping component positions stable.
    pub fn idempotency_signature(&self) -> String {
        let next = self
            .new_on_hand
            .or_else(|| match (self.previous_on_hand, self.delta) {
                (Some(prev), Some(delta)) => Some(prev + delta),
                _ => None,
            });

        [
            self.warehouse_id.as_str().to_string(),
            self.location_name.clone(),
            self.sku.as_str().to_string(),
            self.event_timestamp.clone().unwrap_or_else(|| "ts".to_string()),
            self.source.clone().unwrap_or_else(|| "src".to_string()),
            self.previous_on_hand
                .map(|v| v.to_string())
                .unwrap_or_else(|| "prev".to_string()),
            next.map(|v| v.to_string()).unwrap_or_else(|| "next".to_string()),
        ]
        .join("|")
    }
}

fn str_field<'a>(payload: &'a Value, field: &str) -> Option<&'a str> {
    payload.get(field).and_then(Value::as_str)
}

/// Integer field that may arrive as a JSON number or a numeric string
fn int_field(payload: &Value, field: &str) -> Option<i64> {
    match payload.get(field)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// `lot_id` arrives as either a number or a string
fn lot_id_field(payload: &Value) -> Option<String> {
    match payload.get("lot_id")? {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        _ => None,
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
