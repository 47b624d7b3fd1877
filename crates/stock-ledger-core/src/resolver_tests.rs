//! Tests for location name resolution.

use super::*;
use crate::remote::{MockLocationDirectory, RemoteLocation};
use crate::store::InMemoryStore;

fn warehouse() -> WarehouseId {
    WarehouseId::new("wh-1").unwrap()
}

fn alias_path(name: &str) -> DocPath {
    CollectionPath::root("warehouses")
        .doc("wh-1")
        .collection("locations_by_name")
        .doc(&safe_seg(name))
}

fn location_path(id: &str) -> DocPath {
    CollectionPath::root("warehouses")
        .doc("wh-1")
        .collection("locations")
        .doc(id)
}

async fn seed_location(store: &InMemoryStore, id: &str, name: &str) {
    store
        .set_merge(&location_path(id), MergePatch::new().set("name", json!(name)))
        .await
        .unwrap();
}

fn resolver_with(store: Arc<InMemoryStore>, directory: MockLocationDirectory) -> LocationResolver {
    LocationResolver::new(store, Arc::new(directory))
}

#[tokio::test]
async fn test_resolves_via_alias_without_touching_directory() {
    let store = Arc::new(InMemoryStore::new());
    store
        .set_merge(
            &alias_path("BIN-A1"),
            MergePatch::new().set("location_id_encoded", json!("loc-1")),
        )
        .await
        .unwrap();

    // No expectations: any directory call fails the test.
    let resolver = resolver_with(Arc::clone(&store), MockLocationDirectory::new());

    let id = resolver.resolve(&warehouse(), "BIN-A1").await.unwrap();
    assert_eq!(id.as_str(), "loc-1");
}

#[tokio::test]
async fn test_resolves_via_exact_match_and_caches_alias() {
    let store = Arc::new(InMemoryStore::new());
    seed_location(&store, "loc-1", "BIN-A1").await;

    let resolver = resolver_with(Arc::clone(&store), MockLocationDirectory::new());

    let id = resolver.resolve(&warehouse(), "BIN-A1").await.unwrap();
    assert_eq!(id.as_str(), "loc-1");

    let alias = store.get(&alias_path("BIN-A1")).await.unwrap().unwrap();
    assert_eq!(alias["location_id_encoded"], json!("loc-1"));
    assert_eq!(alias["name"], json!("BIN-A1"));
}

#[tokio::test]
async fn test_resolves_via_case_insensitive_match() {
    let store = Arc::new(InMemoryStore::new());
    seed_location(&store, "loc-1", "bin-a1").await;

    let resolver = resolver_with(Arc::clone(&store), MockLocationDirectory::new());

    let id = resolver.resolve(&warehouse(), "BIN-A1").await.unwrap();
    assert_eq!(id.as_str(), "loc-1");

    // The alias is keyed by the requested spelling.
    assert!(store.get(&alias_path("BIN-A1")).await.unwrap().is_some());
}

#[tokio::test]
async fn test_trims_location_name_before_resolving() {
    let store = Arc::new(InMemoryStore::new());
    seed_location(&store, "loc-1", "BIN-A1").await;

    let resolver = resolver_with(Arc::clone(&store), MockLocationDirectory::new());

    let id = resolver.resolve(&warehouse(), "  BIN-A1  ").await.unwrap();
    assert_eq!(id.as_str(), "loc-1");
}

#[tokio::test]
async fn test_remote_fetch_creates_location_then_alias_serves_next_lookup() {
    let store = Arc::new(InMemoryStore::new());

    let mut directory = MockLocationDirectory::new();
    directory
        .expect_find_location()
        .times(1)
        .returning(|_, _| {
            Ok(Some(RemoteLocation {
                id: "loc-9".to_string(),
                name: "BIN-Z9".to_string(),
                zone: Some("Z".to_string()),
                pickable: Some(true),
                sellable: Some(false),
                created_at: None,
            }))
        });

    let resolver = resolver_with(Arc::clone(&store), directory);

    let id = resolver.resolve(&warehouse(), "BIN-Z9").await.unwrap();
    assert_eq!(id.as_str(), "loc-9");

    let location = store.get(&location_path("loc-9")).await.unwrap().unwrap();
    assert_eq!(location["name"], json!("BIN-Z9"));
    assert_eq!(location["zone"], json!("Z"));
    assert_eq!(location["pickable"], json!(true));

    // Second lookup is served by the alias; times(1) above enforces that
    // the directory is not consulted again.
    let again = resolver.resolve(&warehouse(), "BIN-Z9").await.unwrap();
    assert_eq!(again.as_str(), "loc-9");
}

#[tokio::test]
async fn test_remote_miss_yields_location_not_found() {
    let store = Arc::new(InMemoryStore::new());

    let mut directory = MockLocationDirectory::new();
    directory
        .expect_find_location()
        .times(1)
        .returning(|_, _| Ok(None));

    let resolver = resolver_with(Arc::clone(&store), directory);

    let err = resolver.resolve(&warehouse(), "NOWHERE").await.unwrap_err();
    assert!(matches!(err, LedgerError::LocationNotFound { .. }));
}

#[tokio::test]
async fn test_remote_failure_is_swallowed_into_not_found() {
    let store = Arc::new(InMemoryStore::new());

    let mut directory = MockLocationDirectory::new();
    directory.expect_find_location().times(1).returning(|_, _| {
        Err(crate::remote::DirectoryError::Request {
            message: "connection reset".to_string(),
        })
    });

    let resolver = resolver_with(Arc::clone(&store), directory);

    let err = resolver.resolve(&warehouse(), "BIN-A1").await.unwrap_err();
    assert!(matches!(err, LedgerError::LocationNotFound { .. }));
    // A failed lookup must not poison the alias cache.
    assert!(store.get(&alias_path("BIN-A1")).await.unwrap().is_none());
}

#[tokio::test]
async fn test_unusual_names_are_encoded_in_paths() {
    let store = Arc::new(InMemoryStore::new());
    seed_location(&store, "loc-1", "Aisle 3/Shelf 2").await;

    let resolver = resolver_with(Arc::clone(&store), MockLocationDirectory::new());

    let id = resolver
        .resolve(&warehouse(), "Aisle 3/Shelf 2")
        .await
        .unwrap();
    assert_eq!(id.as_str(), "loc-1");

    assert!(store
        .get(&alias_path("Aisle 3/Shelf 2"))
        .await
        .unwrap()
        .is_some());
}
