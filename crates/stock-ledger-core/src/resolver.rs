//! Location name resolution.
//!
//! Inventory webhooks carry human-readable location names ("BIN-A1"), but
//! item and rollup documents are keyed by the internal location id. The
//! resolver maps name → id through four fallbacks, first hit wins:
//!
//! 1. cached alias under `warehouses/{w}/locations_by_name/`
//! 2. exact name match over the local locations collection
//! 3. case-insensitive match (uppercased comparison) over the same
//! 4. just-in-time fetch from the warehouse-management API, creating the
//!    local location record and the alias in one transaction
//!
//! Locations are created upstream before events reference them, but the
//! local mirror may lag; the JIT fetch closes that gap without a separate
//! sync job, and the alias makes every later lookup of the same name a
//! single point read.

use crate::remote::LocationDirectory;
use crate::store::{
    safe_seg, CollectionPath, DocPath, DocumentStore, MergePatch, StoreError,
};
use crate::{LedgerError, LocationId, WarehouseId};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Upper bound on the case-insensitive scan of a warehouse's locations.
///
/// The store contract only offers equality queries, so the fuzzy fallback
/// lists and compares. Real warehouses hold hundreds of bins, not
/// millions; the bound exists to keep a misconfigured warehouse from
/// turning one lookup into an unbounded read.
const FUZZY_SCAN_LIMIT: usize = 1000;

/// Resolves location names to internal location ids, populating the alias
/// cache as a side effect.
pub struct LocationResolver {
    store: Arc<dyn DocumentStore>,
    directory: Arc<dyn LocationDirectory>,
}

impl LocationResolver {
    /// Create a resolver over the given store and remote directory
    pub fn new(store: Arc<dyn DocumentStore>, directory: Arc<dyn LocationDirectory>) -> Self {
        Self { store, directory }
    }

    /// Resolve a location name within a warehouse to its internal id.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::LocationNotFound`] when the name misses the
    /// alias cache, both local lookups, and the remote directory. Remote
    /// lookup *failures* (as opposed to misses) are logged and treated as
    /// a miss — the caller's dead-letter path is the recovery mechanism.
    pub async fn resolve(
        &self,
        warehouse: &WarehouseId,
        location_name: &str,
    ) -> Result<LocationId, LedgerError> {
        let name = location_name.trim();

        // 1. Alias cache.
        let alias_path = self.alias_doc(warehouse, name);
        if let Some(alias) = self.store.get(&alias_path).await? {
            if let Some(id) = alias.get("location_id_encoded").and_then(Value::as_str) {
                debug!(warehouse = %warehouse, location = name, "Location resolved via alias");
                return Ok(LocationId::new(id)?);
            }
        }

        let locations = self.locations(warehouse);

        // 2. Exact local match.
        let exact = self
            .store
            .find_eq(&locations, "name", &json!(name), 1)
            .await?;
        if let Some((path, _)) = exact.first() {
            let id = path.id().to_string();
            self.persist_alias(&alias_path, name, None, &id).await?;
            debug!(warehouse = %warehouse, location = name, "Location resolved via exact match");
            return Ok(LocationId::new(id)?);
        }

        // 3. Case-insensitive local match.
        let upper = name.to_uppercase();
        let all = self.store.list(&locations, FUZZY_SCAN_LIMIT).await?;
        let fuzzy = all.iter().find(|(_, doc)| {
            doc.get("name")
                .and_then(Value::as_str)
                .is_some_and(|n| n.to_uppercase() == upper)
        });
        if let Some((path, _)) = fuzzy {
            let id = path.id().to_string();
            self.persist_alias(&alias_path, name, None, &id).await?;
            debug!(warehouse = %warehouse, location = name, "Location resolved via case-insensitive match");
            return Ok(LocationId::new(id)?);
        }

        // 4. Just-in-time remote fetch. Failures are swallowed here — and
        // only here — so that a flaky directory degrades to the
        // dead-letter path instead of wedging the event.
        match self.directory.find_location(warehouse, name).await {
            Ok(Some(remote)) => {
                let id = safe_seg(&remote.id);
                self.create_location_with_alias(warehouse, &alias_path, name, &remote, &id)
                    .await?;
                info!(
                    warehouse = %warehouse,
                    location = name,
                    location_id = %id,
                    "Location resolved via remote fetch"
                );
                return Ok(LocationId::new(id)?);
            }
            Ok(None) => {
                debug!(warehouse = %warehouse, location = name, "Remote directory has no such location");
            }
            Err(e) => {
                warn!(
                    warehouse = %warehouse,
                    location = name,
                    error = %e,
                    "Remote location lookup failed; treating as unresolved"
                );
            }
        }

        Err(LedgerError::LocationNotFound {
            warehouse: warehouse.as_str().to_string(),
            location: name.to_string(),
        })
    }

    fn warehouse_doc(&self, warehouse: &WarehouseId) -> DocPath {
        CollectionPath::root("warehouses").doc(&safe_seg(warehouse.as_str()))
    }

    fn locations(&self, warehouse: &WarehouseId) -> CollectionPath {
        self.warehouse_doc(warehouse).collection("locations")
    }

    fn alias_doc(&self, warehouse: &WarehouseId, name: &str) -> DocPath {
        self.warehouse_doc(warehouse)
            .collection("locations_by_name")
            .doc(&safe_seg(name))
    }

    /// Write the alias record. Overwritten on every resolution so a stale
    /// alias self-heals the next time the name is seen.
    async fn persist_alias(
        &self,
        alias_path: &DocPath,
        name: &str,
        raw_location_id: Option<&str>,
        encoded_id: &str,
    ) -> Result<(), StoreError> {
        let patch = MergePatch::new()
            .set("name", json!(name))
            .set("location_id", json!(raw_location_id))
            .set("location_id_encoded", json!(encoded_id))
            .server_time("updated_at");
        self.store.set_merge(alias_path, patch).await
    }

    /// Create the mirrored location record and its alias atomically.
    async fn create_location_with_alias(
        &self,
        warehouse: &WarehouseId,
        alias_path: &DocPath,
        name: &str,
        remote: &crate::remote::RemoteLocation,
        encoded_id: &str,
    ) -> Result<(), StoreError> {
        let location_path = self.locations(warehouse).doc(encoded_id);

        let location_patch = MergePatch::new()
            .set("name", json!(remote.name))
            .set("zone", json!(remote.zone))
            .set("pickable", json!(remote.pickable))
            .set("sellable", json!(remote.sellable))
            .set("created_at", json!(remote.created_at))
            .set("_raw", json!({ "location_id": remote.id }))
            .server_time("updated_at");

        let alias_patch = MergePatch::new()
            .set("name", json!(name))
            .set("location_id", json!(remote.id))
            .set("location_id_encoded", json!(encoded_id))
            .server_time("updated_at");

        let mut tx = self.store.begin().await?;
        tx.set_merge(&location_path, location_patch);
        tx.set_merge(alias_path, alias_patch);
        // No reads in this transaction, so the commit cannot conflict.
        if !tx.commit().await? {
            return Err(StoreError::OperationFailed {
                message: format!("location creation conflicted for {}", location_path),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "resolver_tests.rs"]
mod tests;
