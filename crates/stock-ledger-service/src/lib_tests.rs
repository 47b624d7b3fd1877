//! Tests for the webhook intake endpoint.

use super::*;
use crate::time::day_key;
use axum::body::{to_bytes, Body};
use axum::http::Request;
use chrono::Utc;
use serde_json::json;
use stock_ledger_core::remote::{DirectoryError, RemoteLocation};
use stock_ledger_core::store::{CollectionPath, MergePatch};
use stock_ledger_core::{compute_signature, InMemoryStore, WarehouseId};
use tower::ServiceExt;

const SECRET: &str = "test-secret";

/// Directory that knows no locations, for tests that never reach the
/// remote fallback or must miss it.
struct EmptyDirectory;

#[async_trait::async_trait]
impl LocationDirectory for EmptyDirectory {
    async fn find_location(
        &self,
        _warehouse_id: &WarehouseId,
        _name: &str,
    ) -> Result<Option<RemoteLocation>, DirectoryError> {
        Ok(None)
    }
}

fn test_state(store: Arc<InMemoryStore>) -> AppState {
    let mut config = ServiceConfig::default();
    config.webhook.secret = SECRET.to_string();
    let store: Arc<dyn DocumentStore> = store;
    AppState::new(config, store, Arc::new(EmptyDirectory))
}

async fn seed_location(store: &InMemoryStore, warehouse: &str, location_id: &str, name: &str) {
    let path = CollectionPath::root("warehouses")
        .doc(warehouse)
        .collection("locations")
        .doc(location_id);
    store
        .set_merge(&path, MergePatch::new().set("name", json!(name)))
        .await
        .unwrap();
}

fn signed_post(body: &[u8]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/webhooks/shiphero")
        .header(SIGNATURE_HEADER, compute_signature(SECRET, body))
        .body(Body::from(body.to_vec()))
        .unwrap()
}

async fn response_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn change_payload() -> Vec<u8> {
    json!({
        "webhook_type": "Inventory Change",
        "warehouse_uuid": "wh-1",
        "location_name": "BIN-A1",
        "sku": "WIDGET-1",
        "quantity": 5
    })
    .to_string()
    .into_bytes()
}

#[tokio::test]
async fn test_valid_signature_is_acknowledged_and_applied() {
    let store = Arc::new(InMemoryStore::new());
    seed_location(&store, "wh-1", "LOC-1", "BIN-A1").await;
    let state = test_state(Arc::clone(&store));

    let response = create_router(state.clone())
        .oneshot(signed_post(&change_payload()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response_json(response).await,
        json!({ "code": "200", "Status": "Success" })
    );

    state.queue.drain().await;

    let item_path = CollectionPath::root("warehouses")
        .doc("wh-1")
        .collection("locations")
        .doc("LOC-1")
        .collection("items")
        .doc("WIDGET-1");
    let item = store.get(&item_path).await.unwrap().unwrap();
    assert_eq!(item.get("quantity"), Some(&json!(5)));

    // The raw delivery landed in the day-bucketed audit collection and
    // the item carries its path as provenance.
    let ymd = day_key(Utc::now(), state.config.processing.reporting_utc_offset_hours);
    let audit = CollectionPath::root("inventory_changes")
        .doc(&ymd)
        .collection("data");
    let records = store.list(&audit, 10).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(
        item.get("event_refs"),
        Some(&json!([records[0].0.as_str()]))
    );
}

#[tokio::test]
async fn test_signature_mismatch_is_rejected() {
    let store = Arc::new(InMemoryStore::new());
    let state = test_state(Arc::clone(&store));

    let body = change_payload();
    let request = Request::builder()
        .method("POST")
        .uri("/webhooks/shiphero")
        .header(SIGNATURE_HEADER, compute_signature("wrong-secret", &body))
        .body(Body::from(body))
        .unwrap();

    let response = create_router(state.clone()).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        response_json(response).await,
        json!({ "code": "401", "Status": "Invalid signature" })
    );

    state.queue.drain().await;
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn test_missing_signature_header_is_rejected() {
    let store = Arc::new(InMemoryStore::new());
    let state = test_state(Arc::clone(&store));

    let request = Request::builder()
        .method("POST")
        .uri("/webhooks/shiphero")
        .body(Body::from(change_payload()))
        .unwrap();

    let response = create_router(state).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn test_signed_garbage_body_is_a_server_error() {
    let store = Arc::new(InMemoryStore::new());
    let state = test_state(Arc::clone(&store));

    let response = create_router(state)
        .oneshot(signed_post(b"not json at all"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        response_json(response).await,
        json!({ "code": "500", "Status": "Error" })
    );
}

#[tokio::test]
async fn test_unknown_webhook_type_is_acknowledged_and_ignored() {
    let store = Arc::new(InMemoryStore::new());
    let state = test_state(Arc::clone(&store));

    let body = json!({ "webhook_type": "Order Canceled" })
        .to_string()
        .into_bytes();
    let response = create_router(state.clone())
        .oneshot(signed_post(&body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    state.queue.drain().await;
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn test_unresolvable_location_dead_letters_after_ack() {
    let store = Arc::new(InMemoryStore::new());
    let state = test_state(Arc::clone(&store));

    // No location seeded and the directory knows nothing.
    let response = create_router(state.clone())
        .oneshot(signed_post(&change_payload()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    state.queue.drain().await;

    let dead_letters = store
        .list(
            &CollectionPath::root("inventory_events_unknown_location"),
            10,
        )
        .await
        .unwrap();
    assert_eq!(dead_letters.len(), 1);
    assert_eq!(dead_letters[0].1.get("sku"), Some(&json!("WIDGET-1")));
}

#[tokio::test]
async fn test_healthz_responds_ok() {
    let store = Arc::new(InMemoryStore::new());
    let state = test_state(store);

    let request = Request::builder()
        .uri("/healthz")
        .body(Body::empty())
        .unwrap();
    let response = create_router(state).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"ok");
}
