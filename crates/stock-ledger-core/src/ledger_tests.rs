//! Tests for the transactional delta applier.

use super::*;
use crate::remote::MockLocationDirectory;
use crate::store::InMemoryStore;

fn base_payload() -> Value {
    json!({
        "warehouse_uuid": "wh-1",
        "location_name": "BIN-A1",
        "sku": "WIDGET-1",
        "timestamp": "2026-02-11T08:15:00Z",
        "source": "cycle_count"
    })
}

fn event_with(fields: Value) -> InventoryChangeEvent {
    let mut payload = base_payload();
    for (key, value) in fields.as_object().unwrap() {
        payload[key] = value.clone();
    }
    InventoryChangeEvent::from_payload(&payload).unwrap()
}

fn applier(store: &Arc<InMemoryStore>) -> DeltaApplier {
    applier_with_directory(store, MockLocationDirectory::new())
}

fn applier_with_directory(
    store: &Arc<InMemoryStore>,
    directory: MockLocationDirectory,
) -> DeltaApplier {
    let store: Arc<dyn DocumentStore> = Arc::clone(store) as Arc<dyn DocumentStore>;
    let resolver = LocationResolver::new(Arc::clone(&store), Arc::new(directory));
    let dead_letters = DeadLetterSink::new(Arc::clone(&store));
    DeltaApplier::new(store, resolver, dead_letters)
}

fn location_path() -> DocPath {
    CollectionPath::root("warehouses")
        .doc("wh-1")
        .collection("locations")
        .doc("loc-1")
}

fn item_path(id: &str) -> DocPath {
    location_path().collection("items").doc(id)
}

async fn seed_location(store: &InMemoryStore) {
    store
        .set_merge(
            &location_path(),
            MergePatch::new().set("name", json!("BIN-A1")),
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_apply_creates_item_and_rollup() {
    let store = Arc::new(InMemoryStore::new());
    seed_location(&store).await;
    let applier = applier(&store);

    let event = event_with(json!({ "quantity": 5 }));
    let outcome = applier.apply(&event).await.unwrap();

    assert_eq!(
        outcome,
        ApplyOutcome::Applied {
            location_id: LocationId::new("loc-1").unwrap(),
            item_id: "WIDGET-1".to_string(),
            previous: 0,
            next: 5,
            applied_delta: 5,
        }
    );

    let item = store.get(&item_path("WIDGET-1")).await.unwrap().unwrap();
    assert_eq!(item["sku"], json!("WIDGET-1"));
    assert_eq!(item["quantity"], json!(5));
    assert_eq!(item["last_event_id"], json!(event.idempotency_signature()));
    assert_eq!(item["last_event_delta"], json!(5));
    assert_eq!(item["last_event_direction"], json!("increase"));

    let location = store.get(&location_path()).await.unwrap().unwrap();
    assert_eq!(location["qty_total"], json!(5));
    assert_eq!(location["items_count"], json!(1));
    assert_eq!(location["name"], json!("BIN-A1"));
}

#[tokio::test]
async fn test_redelivery_is_a_noop() {
    let store = Arc::new(InMemoryStore::new());
    seed_location(&store).await;
    let applier = applier(&store);

    let event = event_with(json!({ "quantity": 5, "previous_on_hand": 0 }));
    applier.apply(&event).await.unwrap();
    let second = applier.apply(&event).await.unwrap();

    assert_eq!(second, ApplyOutcome::Duplicate);

    // State is identical to a single application.
    let item = store.get(&item_path("WIDGET-1")).await.unwrap().unwrap();
    assert_eq!(item["quantity"], json!(5));
    let location = store.get(&location_path()).await.unwrap().unwrap();
    assert_eq!(location["qty_total"], json!(5));
    assert_eq!(location["items_count"], json!(1));
}

#[tokio::test]
async fn test_negative_delta_clamps_at_zero() {
    let store = Arc::new(InMemoryStore::new());
    seed_location(&store).await;
    let applier = applier(&store);

    let outcome = applier
        .apply(&event_with(json!({ "quantity": -3 })))
        .await
        .unwrap();

    assert_eq!(
        outcome,
        ApplyOutcome::Applied {
            location_id: LocationId::new("loc-1").unwrap(),
            item_id: "WIDGET-1".to_string(),
            previous: 0,
            next: 0,
            applied_delta: 0,
        }
    );

    let location = store.get(&location_path()).await.unwrap().unwrap();
    assert_eq!(location["qty_total"], json!(0));
    // No zero/positive transition happened.
    assert!(location.get("items_count").is_none());
}

#[tokio::test]
async fn test_clamp_from_nonzero_previous_applies_partial_delta() {
    let store = Arc::new(InMemoryStore::new());
    seed_location(&store).await;
    let applier = applier(&store);

    applier
        .apply(&event_with(json!({ "quantity": 5 })))
        .await
        .unwrap();
    let outcome = applier
        .apply(&event_with(json!({
            "quantity": -20,
            "timestamp": "2026-02-11T09:00:00Z"
        })))
        .await
        .unwrap();

    assert_eq!(
        outcome,
        ApplyOutcome::Applied {
            location_id: LocationId::new("loc-1").unwrap(),
            item_id: "WIDGET-1".to_string(),
            previous: 5,
            next: 0,
            applied_delta: -5,
        }
    );

    // Rollup moves by the applied -5, not the nominal -20.
    let location = store.get(&location_path()).await.unwrap().unwrap();
    assert_eq!(location["qty_total"], json!(0));
    assert_eq!(location["items_count"], json!(0));

    let item = store.get(&item_path("WIDGET-1")).await.unwrap().unwrap();
    assert_eq!(item["quantity"], json!(0));
    assert_eq!(item["last_event_delta"], json!(-5));
}

#[tokio::test]
async fn test_absolute_restatement_wins_over_delta() {
    let store = Arc::new(InMemoryStore::new());
    seed_location(&store).await;
    let applier = applier(&store);

    let outcome = applier
        .apply(&event_with(json!({ "quantity": -3, "new_on_hand": 45 })))
        .await
        .unwrap();

    match outcome {
        ApplyOutcome::Applied {
            next, applied_delta, ..
        } => {
            assert_eq!(next, 45);
            assert_eq!(applied_delta, 45);
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[tokio::test]
async fn test_items_count_tracks_zero_transitions() {
    let store = Arc::new(InMemoryStore::new());
    seed_location(&store).await;
    let applier = applier(&store);

    applier
        .apply(&event_with(json!({ "quantity": 5 })))
        .await
        .unwrap();
    applier
        .apply(&event_with(json!({
            "new_on_hand": 0,
            "timestamp": "2026-02-11T09:00:00Z"
        })))
        .await
        .unwrap();

    let location = store.get(&location_path()).await.unwrap().unwrap();
    assert_eq!(location["qty_total"], json!(0));
    assert_eq!(location["items_count"], json!(0));

    let item = store.get(&item_path("WIDGET-1")).await.unwrap().unwrap();
    assert_eq!(item["quantity"], json!(0));
    assert_eq!(item["last_event_delta"], json!(-5));
    assert_eq!(item["last_event_direction"], json!("decrease"));
}

#[tokio::test]
async fn test_lots_are_distinct_items() {
    let store = Arc::new(InMemoryStore::new());
    seed_location(&store).await;
    let applier = applier(&store);

    applier
        .apply(&event_with(json!({ "quantity": 5 })))
        .await
        .unwrap();
    let lotted = applier
        .apply(&event_with(json!({
            "quantity": 3,
            "lot_id": 42,
            "timestamp": "2026-02-11T09:00:00Z"
        })))
        .await
        .unwrap();

    match lotted {
        ApplyOutcome::Applied { item_id, .. } => assert_eq!(item_id, "WIDGET-1__lot_42"),
        other => panic!("unexpected outcome: {other:?}"),
    }

    let plain = store.get(&item_path("WIDGET-1")).await.unwrap().unwrap();
    let by_lot = store
        .get(&item_path("WIDGET-1__lot_42"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(plain["quantity"], json!(5));
    assert_eq!(by_lot["quantity"], json!(3));
    assert_eq!(by_lot["lot_id"], json!("42"));

    let location = store.get(&location_path()).await.unwrap().unwrap();
    assert_eq!(location["qty_total"], json!(8));
    assert_eq!(location["items_count"], json!(2));
}

#[tokio::test]
async fn test_optional_fields_fall_back_to_stored_values() {
    let store = Arc::new(InMemoryStore::new());
    seed_location(&store).await;
    let applier = applier(&store);

    applier
        .apply(&event_with(json!({
            "quantity": 5,
            "product_name": "Widget"
        })))
        .await
        .unwrap();
    applier
        .apply(&event_with(json!({
            "quantity": 2,
            "timestamp": "2026-02-11T09:00:00Z"
        })))
        .await
        .unwrap();

    let item = store.get(&item_path("WIDGET-1")).await.unwrap().unwrap();
    assert_eq!(item["quantity"], json!(7));
    assert_eq!(item["product_name"], json!("Widget"));
}

#[tokio::test]
async fn test_event_refs_accumulate_without_duplicates() {
    let store = Arc::new(InMemoryStore::new());
    seed_location(&store).await;
    let applier = applier(&store);

    let mut first = event_with(json!({ "quantity": 5 }));
    first.event_ref_path = Some("inventory_changes/2026-02-11/data/ev-1".to_string());
    let mut second = event_with(json!({
        "quantity": 2,
        "timestamp": "2026-02-11T09:00:00Z"
    }));
    second.event_ref_path = Some("inventory_changes/2026-02-11/data/ev-2".to_string());

    applier.apply(&first).await.unwrap();
    applier.apply(&second).await.unwrap();

    let item = store.get(&item_path("WIDGET-1")).await.unwrap().unwrap();
    assert_eq!(
        item["last_event_ref"],
        json!("inventory_changes/2026-02-11/data/ev-2")
    );
    assert_eq!(
        item["event_refs"],
        json!([
            "inventory_changes/2026-02-11/data/ev-1",
            "inventory_changes/2026-02-11/data/ev-2"
        ])
    );
}

#[tokio::test]
async fn test_unknown_location_dead_letters_then_errors() {
    let store = Arc::new(InMemoryStore::new());

    let mut directory = MockLocationDirectory::new();
    directory
        .expect_find_location()
        .times(1)
        .returning(|_, _| Ok(None));
    let applier = applier_with_directory(&store, directory);

    let err = applier
        .apply(&event_with(json!({ "quantity": 5 })))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::LocationNotFound { .. }));

    let records = store
        .list(
            &CollectionPath::root("inventory_events_unknown_location"),
            10,
        )
        .await
        .unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].1["sku"], json!("WIDGET-1"));
    assert_eq!(records[0].1["location_name"], json!("BIN-A1"));
}

#[tokio::test]
async fn test_concurrent_events_both_land() {
    let store = Arc::new(InMemoryStore::new());
    seed_location(&store).await;
    let applier = Arc::new(applier(&store));

    let a = {
        let applier = Arc::clone(&applier);
        tokio::spawn(async move {
            applier
                .apply(&event_with(json!({ "quantity": 5 })))
                .await
        })
    };
    let b = {
        let applier = Arc::clone(&applier);
        tokio::spawn(async move {
            applier
                .apply(&event_with(json!({
                    "quantity": 3,
                    "timestamp": "2026-02-11T09:00:00Z"
                })))
                .await
        })
    };

    a.await.unwrap().unwrap();
    b.await.unwrap().unwrap();

    let item = store.get(&item_path("WIDGET-1")).await.unwrap().unwrap();
    assert_eq!(item["quantity"], json!(8));
    let location = store.get(&location_path()).await.unwrap().unwrap();
    assert_eq!(location["qty_total"], json!(8));
    assert_eq!(location["items_count"], json!(1));
}

#[tokio::test]
async fn test_warehouse_id_is_encoded_in_paths() {
    let store = Arc::new(InMemoryStore::new());
    let warehouse_doc = CollectionPath::root("warehouses").doc(&safe_seg("wh/1"));
    store
        .set_merge(
            &warehouse_doc.collection("locations").doc("loc-1"),
            MergePatch::new().set("name", json!("BIN-A1")),
        )
        .await
        .unwrap();
    let applier = applier(&store);

    let mut payload = base_payload();
    payload["warehouse_uuid"] = json!("wh/1");
    payload["quantity"] = json!(5);
    let event = InventoryChangeEvent::from_payload(&payload).unwrap();

    let outcome = applier.apply(&event).await.unwrap();
    assert!(matches!(outcome, ApplyOutcome::Applied { .. }));

    let item = store
        .get(
            &warehouse_doc
                .collection("locations")
                .doc("loc-1")
                .collection("items")
                .doc("WIDGET-1"),
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(item["quantity"], json!(5));
}
