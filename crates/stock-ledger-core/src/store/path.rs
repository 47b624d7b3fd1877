//! Document and collection path types.
//!
//! Paths mirror the hierarchical layout of the document store: collections
//! contain documents, documents contain sub-collections. A collection path
//! always has an odd number of segments and a document path an even number,
//! e.g. `warehouses/{w}/locations/{loc}/items/{item}`.
//!
//! Dynamic segments (warehouse ids, location names, SKUs) must be encoded
//! with [`safe_seg`] before being placed in a path so that arbitrary input
//! can never introduce separators or oversized document ids.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum encoded length of a single path segment before truncation.
const MAX_SEGMENT_LEN: usize = 700;

/// Suffix appended to a truncated segment.
const TRUNC_SUFFIX: &str = "__trunc";

/// Encode an arbitrary string into a path-safe document id segment.
///
/// Unreserved characters (`A-Z a-z 0-9 - _ . ! ~ * ' ( )`) pass through;
/// everything else is percent-encoded byte-wise. Segments longer than 700
/// characters after encoding are truncated with a `__trunc` marker so that
/// hostile input cannot create unbounded document ids.
///
/// # Examples
///
/// ```rust
/// use stock_ledger_core::store::safe_seg;
///
/// assert_eq!(safe_seg("BIN-A1"), "BIN-A1");
/// assert_eq!(safe_seg("Aisle 3/Shelf 2"), "Aisle%203%2FShelf%202");
/// ```
pub fn safe_seg(input: &str) -> String {
    let mut encoded = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z'
            | b'a'..=b'z'
            | b'0'..=b'9'
            | b'-'
            | b'_'
            | b'.'
            | b'!'
            | b'~'
            | b'*'
            | b'\''
            | b'('
            | b')' => encoded.push(byte as char),
            _ => {
                encoded.push('%');
                encoded.push_str(&format!("{:02X}", byte));
            }
        }
    }

    if encoded.len() > MAX_SEGMENT_LEN {
        // Truncation must not split a percent escape.
        let mut cut = MAX_SEGMENT_LEN;
        while !encoded.is_char_boundary(cut)
            || encoded[..cut].ends_with('%')
            || (cut >= 2 && encoded.as_bytes()[cut - 2] == b'%')
        {
            cut -= 1;
        }
        encoded.truncate(cut);
        encoded.push_str(TRUNC_SUFFIX);
    }

    encoded
}

/// Path to a collection of documents
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CollectionPath(String);

impl CollectionPath {
    /// Create a top-level collection path
    pub fn root(name: &str) -> Self {
        debug_assert!(!name.is_empty() && !name.contains('/'));
        Self(name.to_string())
    }

    /// Path to a document inside this collection
    ///
    /// `id` must already be a safe segment (see [`safe_seg`]).
    pub fn doc(&self, id: &str) -> DocPath {
        debug_assert!(!id.is_empty() && !id.contains('/'));
        DocPath(format!("{}/{}", self.0, id))
    }

    /// Get string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Path to a single document
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocPath(String);

impl DocPath {
    /// Reconstruct a document path from its stored string form.
    ///
    /// Used when a persisted reference (e.g. an event record path) is read
    /// back from a document field. Validates the even-segment invariant.
    pub fn parse(path: &str) -> Option<Self> {
        let segments: Vec<&str> = path.split('/').collect();
        if segments.len() < 2
            || segments.len() % 2 != 0
            || segments.iter().any(|s| s.is_empty())
        {
            return None;
        }
        Some(Self(path.to_string()))
    }

    /// Document id: the final path segment
    pub fn id(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// Path to a sub-collection of this document
    pub fn collection(&self, name: &str) -> CollectionPath {
        debug_assert!(!name.is_empty() && !name.contains('/'));
        CollectionPath(format!("{}/{}", self.0, name))
    }

    /// Get string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
