//! In-memory implementation of the document store contract.
//!
//! Backs development, tests, and the standalone service profile. Documents
//! are versioned; transactions record the version of every document they
//! read and validate those versions at commit time, which gives the same
//! observable behaviour as the optimistic transactions of the production
//! store: of two racing read-modify-write cycles over the same document,
//! exactly one commits and the other re-runs against the committed state.

use super::{
    apply_patch, CollectionPath, DocPath, Document, DocumentStore, MergePatch, StoreError,
    StoreTransaction,
};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use ulid::Ulid;

/// Version of a document as recorded by a transactional read.
///
/// Version 0 means "document absent"; committed documents start at 1.
type Version = u64;

#[derive(Debug, Clone)]
struct VersionedDoc {
    version: Version,
    doc: Document,
}

#[derive(Debug, Default)]
struct StoreState {
    docs: HashMap<String, VersionedDoc>,
}

impl StoreState {
    fn version_of(&self, path: &str) -> Version {
        self.docs.get(path).map(|d| d.version).unwrap_or(0)
    }

    fn merge(&mut self, path: &str, patch: &MergePatch) {
        let commit_time = Utc::now();
        let entry = self.docs.entry(path.to_string()).or_insert(VersionedDoc {
            version: 0,
            doc: Document::new(),
        });
        apply_patch(&mut entry.doc, patch, commit_time);
        entry.version += 1;
    }

    /// Documents directly inside `collection`, sorted by path for
    /// deterministic query results.
    fn in_collection(&self, collection: &CollectionPath) -> Vec<(String, Document)> {
        let prefix = format!("{}/", collection.as_str());
        let mut rows: Vec<(String, Document)> = self
            .docs
            .iter()
            .filter(|(path, _)| {
                path.strip_prefix(&prefix)
                    .is_some_and(|rest| !rest.is_empty() && !rest.contains('/'))
            })
            .map(|(path, vd)| (path.clone(), vd.doc.clone()))
            .collect();
        rows.sort_by(|a, b| a.0.cmp(&b.0));
        rows
    }
}

/// In-memory document store for development and testing
///
/// # Examples
///
/// ```rust
/// use serde_json::json;
/// use stock_ledger_core::store::{CollectionPath, DocumentStore, InMemoryStore, MergePatch};
///
/// # async fn example() -> Result<(), stock_ledger_core::store::StoreError> {
/// let store = InMemoryStore::new();
/// let doc = CollectionPath::root("warehouses").doc("w1");
/// store.set_merge(&doc, MergePatch::new().set("name", json!("Main"))).await?;
/// assert!(store.get(&doc).await?.is_some());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<StoreState>>,
}

impl InMemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents currently stored (test helper)
    pub async fn len(&self) -> usize {
        self.state.read().await.docs.len()
    }

    /// Whether the store holds no documents
    pub async fn is_empty(&self) -> bool {
        self.state.read().await.docs.is_empty()
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn get(&self, path: &DocPath) -> Result<Option<Document>, StoreError> {
        let state = self.state.read().await;
        Ok(state.docs.get(path.as_str()).map(|vd| vd.doc.clone()))
    }

    async fn set_merge(&self, path: &DocPath, patch: MergePatch) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        state.merge(path.as_str(), &patch);
        Ok(())
    }

    async fn add(
        &self,
        collection: &CollectionPath,
        patch: MergePatch,
    ) -> Result<DocPath, StoreError> {
        let path = collection.doc(&Ulid::new().to_string());
        let mut state = self.state.write().await;
        state.merge(path.as_str(), &patch);
        Ok(path)
    }

    async fn find_eq(
        &self,
        collection: &CollectionPath,
        field: &str,
        value: &Value,
        limit: usize,
    ) -> Result<Vec<(DocPath, Document)>, StoreError> {
        let state = self.state.read().await;
        let rows = state
            .in_collection(collection)
            .into_iter()
            .filter(|(_, doc)| doc.get(field) == Some(value))
            .take(limit)
            .filter_map(|(path, doc)| DocPath::parse(&path).map(|p| (p, doc)))
            .collect();
        Ok(rows)
    }

    async fn list(
        &self,
        collection: &CollectionPath,
        limit: usize,
    ) -> Result<Vec<(DocPath, Document)>, StoreError> {
        let state = self.state.read().await;
        let rows = state
            .in_collection(collection)
            .into_iter()
            .take(limit)
            .filter_map(|(path, doc)| DocPath::parse(&path).map(|p| (p, doc)))
            .collect();
        Ok(rows)
    }

    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, StoreError> {
        Ok(Box::new(MemoryTransaction {
            state: Arc::clone(&self.state),
            reads: HashMap::new(),
            writes: Vec::new(),
        }))
    }
}

/// One optimistic transaction attempt against [`InMemoryStore`]
struct MemoryTransaction {
    state: Arc<RwLock<StoreState>>,
    /// Path -> version observed at read time (0 = absent)
    reads: HashMap<String, Version>,
    /// Buffered writes in application order
    writes: Vec<(String, MergePatch)>,
}

#[async_trait]
impl StoreTransaction for MemoryTransaction {
    async fn get(&mut self, path: &DocPath) -> Result<Option<Document>, StoreError> {
        if !self.writes.is_empty() {
            return Err(StoreError::ReadAfterWrite {
                path: path.as_str().to_string(),
            });
        }

        let state = self.state.read().await;
        self.reads
            .insert(path.as_str().to_string(), state.version_of(path.as_str()));
        Ok(state.docs.get(path.as_str()).map(|vd| vd.doc.clone()))
    }

    fn set_merge(&mut self, path: &DocPath, patch: MergePatch) {
        self.writes.push((path.as_str().to_string(), patch));
    }

    async fn commit(self: Box<Self>) -> Result<bool, StoreError> {
        let mut state = self.state.write().await;

        for (path, observed) in &self.reads {
            if state.version_of(path) != *observed {
                return Ok(false);
            }
        }

        for (path, patch) in &self.writes {
            state.merge(path, patch);
        }

        Ok(true)
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
