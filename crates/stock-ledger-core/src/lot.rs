//! Lot identity normalization.
//!
//! Inventory webhooks identify a lot two ways: a raw `lot_id` and an
//! opaque `lot_uuid`, which is a base64 encoding of a type-prefixed global
//! id (`Lot:<id>`). The normalizer derives one canonical lot key from
//! whichever is available so that webhook-applied items land on the same
//! document ids as seeded inventory.
//!
//! The encoding scheme is isolated here: if the upstream API changes how
//! lot references are encoded, only [`decode_lot_reference`] changes.

use base64::{engine::general_purpose, Engine as _};

/// Type prefix carried inside a decoded lot reference
const LOT_PREFIX: &str = "Lot:";

/// Decode an opaque lot reference to the raw lot identifier it wraps.
///
/// Returns `None` when the reference is not valid base64, not valid UTF-8,
/// or decodes to a blank string. Decode failures are never errors — an
/// event without a recognizable lot is a valid event.
pub fn decode_lot_reference(reference: &str) -> Option<String> {
    let bytes = general_purpose::STANDARD.decode(reference).ok()?;
    let decoded = String::from_utf8(bytes).ok()?;
    let raw = decoded.strip_prefix(LOT_PREFIX).unwrap_or(&decoded);
    let raw = raw.trim();
    if raw.is_empty() {
        None
    } else {
        Some(raw.to_string())
    }
}

/// Derive the canonical lot key for an event.
///
/// A non-blank raw `lot_id` wins; otherwise the opaque reference is
/// decoded. `None` means the item is keyed by SKU alone.
///
/// # Examples
///
/// ```rust
/// use stock_ledger_core::lot::normalize_lot_key;
///
/// assert_eq!(
///     normalize_lot_key(Some("L123"), Some("ignored")),
///     Some("L123".to_string())
/// );
/// assert_eq!(normalize_lot_key(None, Some("not-base64!")), None);
/// ```
pub fn normalize_lot_key(lot_id: Option<&str>, lot_reference: Option<&str>) -> Option<String> {
    if let Some(id) = lot_id {
        let id = id.trim();
        if !id.is_empty() {
            return Some(id.to_string());
        }
    }

    lot_reference.and_then(decode_lot_reference)
}

#[cfg(test)]
#[path = "lot_tests.rs"]
mod tests;
