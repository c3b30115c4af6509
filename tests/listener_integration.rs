//! Integration tests for snapshot listeners
//!
//! Run with: cargo test --test listener_integration

use firestore_bridge::{
    BridgeError, CallbackId, CollectionSnapshot, DocumentSnapshot, FirestoreBridge,
    FirestoreConfig, MemoryBackend, QueryConstraint,
};
use futures::StreamExt;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;

const QUIET: Duration = Duration::from_millis(50);
const WAIT: Duration = Duration::from_secs(5);

async fn initialized_bridge() -> (FirestoreBridge, MemoryBackend) {
    dotenvy::dotenv().ok();
    let backend = MemoryBackend::new();
    let bridge = FirestoreBridge::new(backend.clone());
    bridge
        .initialize(FirestoreConfig::new("demo-project", "1:0:web:0", "demo-key"))
        .await
        .expect("Failed to initialize bridge");
    (bridge, backend)
}

/// Test: callback sees the current state first, then every change in order
#[tokio::test]
async fn test_document_listener_callback() {
    let (bridge, _) = initialized_bridge().await;
    let (tx, mut rx) = mpsc::unbounded_channel();

    let id = bridge
        .add_document_snapshot_listener::<Value, _>("rooms/lobby", move |snapshot| {
            let _ = tx.send(snapshot);
        })
        .await
        .unwrap();

    let initial = rx.recv().await.unwrap().unwrap();
    assert!(!initial.exists());
    assert_eq!(initial.path, "rooms/lobby");

    bridge.set_document("rooms/lobby", &json!({"n": 1}), false).await.unwrap();
    bridge.update_document("rooms/lobby", &json!({"n": 2})).await.unwrap();
    bridge.delete_document("rooms/lobby").await.unwrap();

    let values: Vec<Option<Value>> = vec![
        rx.recv().await.unwrap().unwrap().data,
        rx.recv().await.unwrap().unwrap().data,
        rx.recv().await.unwrap().unwrap().data,
    ];
    assert_eq!(values, vec![Some(json!({"n": 1})), Some(json!({"n": 2})), None]);

    bridge.remove_snapshot_listener(&id).await.unwrap();
}

/// Test: collection listener applies the constraints to every snapshot
#[tokio::test]
async fn test_collection_listener_with_constraints() {
    let (bridge, _) = initialized_bridge().await;
    let (id, mut stream) = bridge
        .collection_snapshot_stream::<Value>(
            "scores",
            &[QueryConstraint::where_greater_than("points", 10)],
        )
        .await
        .unwrap();

    assert!(stream.next().await.unwrap().unwrap().is_empty());

    bridge.set_document("scores/a", &json!({"points": 5}), false).await.unwrap();
    assert!(stream.next().await.unwrap().unwrap().is_empty());

    bridge.set_document("scores/b", &json!({"points": 50}), false).await.unwrap();
    let snapshot: CollectionSnapshot = stream.next().await.unwrap().unwrap();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot.collection[0].id, "b");

    // Writes outside the collection do not notify
    bridge.set_document("other/x", &json!({"points": 99}), false).await.unwrap();
    assert!(timeout(QUIET, stream.next()).await.is_err());

    bridge.remove_snapshot_listener(&id).await.unwrap();
}

/// Test: removal stops deliveries and only succeeds once
#[tokio::test]
async fn test_remove_listener() {
    let (bridge, backend) = initialized_bridge().await;
    let (id, mut stream) = bridge
        .document_snapshot_stream::<Value>("rooms/a")
        .await
        .unwrap();
    stream.next().await.unwrap().unwrap();

    bridge.remove_snapshot_listener(&id).await.unwrap();
    assert_eq!(backend.database().watch_count(), 0);

    bridge.set_document("rooms/a", &json!({"n": 1}), false).await.unwrap();
    assert!(timeout(WAIT, stream.next()).await.unwrap().is_none());

    let err = bridge.remove_snapshot_listener(&id).await.unwrap_err();
    assert!(matches!(err, BridgeError::UnknownListener(ref missing) if missing == &id));
}

/// Test: removing an id that was never issued
#[tokio::test]
async fn test_remove_unknown_listener() {
    let (bridge, _) = initialized_bridge().await;
    let err = bridge
        .remove_snapshot_listener(&CallbackId::from("does-not-exist"))
        .await
        .unwrap_err();
    assert!(matches!(err, BridgeError::UnknownListener(_)));
}

/// Test: listener ids are distinct among active listeners
#[tokio::test]
async fn test_listener_ids_unique() {
    let (bridge, _) = initialized_bridge().await;
    let mut ids = HashSet::new();

    for i in 0..20 {
        let id = if i % 2 == 0 {
            bridge
                .add_document_snapshot_listener::<Value, _>(&format!("rooms/{i}"), |_| {})
                .await
                .unwrap()
        } else {
            bridge
                .add_collection_snapshot_listener::<Value, _>("rooms", &[], |_| {})
                .await
                .unwrap()
        };
        assert!(ids.insert(id));
    }

    assert_eq!(bridge.listeners().len(), 20);
}

/// Test: a callback can remove its own listener
#[tokio::test]
async fn test_listener_removes_itself_from_callback() {
    let (bridge, backend) = initialized_bridge().await;
    let own_id: Arc<Mutex<Option<CallbackId>>> = Arc::default();
    let (tx, mut rx) = mpsc::unbounded_channel();

    let callback = {
        let registry = bridge.listeners().clone();
        let own_id = Arc::clone(&own_id);
        move |snapshot: Result<DocumentSnapshot, BridgeError>| {
            let snapshot = snapshot.unwrap();
            let id = own_id.lock().unwrap().clone();
            let removed = match id {
                Some(id) if snapshot.exists() => Some(registry.remove(&id)),
                _ => None,
            };
            let _ = tx.send((snapshot, removed));
        }
    };

    let id = bridge
        .add_document_snapshot_listener("rooms/self", callback)
        .await
        .unwrap();
    *own_id.lock().unwrap() = Some(id.clone());

    let (initial, removed) = rx.recv().await.unwrap();
    assert!(!initial.exists());
    assert!(removed.is_none());

    bridge.set_document("rooms/self", &json!({"n": 1}), false).await.unwrap();
    let (snapshot, removed) = rx.recv().await.unwrap();
    assert!(snapshot.exists());
    assert!(matches!(removed, Some(Ok(()))));

    assert!(!bridge.listeners().contains(&id));
    assert_eq!(backend.database().watch_count(), 0);

    bridge.set_document("rooms/self", &json!({"n": 2}), false).await.unwrap();
    assert!(timeout(QUIET, rx.recv()).await.map_or(true, |item| item.is_none()));
}

/// Test: clear all cancels every listener and forgets every id
#[tokio::test]
async fn test_clear_all_snapshot_listeners() {
    let (bridge, backend) = initialized_bridge().await;

    let (first, mut first_stream) = bridge
        .document_snapshot_stream::<Value>("rooms/a")
        .await
        .unwrap();
    let (second, mut second_stream) = bridge
        .collection_snapshot_stream::<Value>("rooms", &[])
        .await
        .unwrap();

    bridge.clear_all_snapshot_listeners().await;

    assert!(bridge.listeners().is_empty());
    assert_eq!(backend.database().watch_count(), 0);
    assert!(matches!(
        bridge.remove_snapshot_listener(&first).await,
        Err(BridgeError::UnknownListener(_))
    ));
    assert!(matches!(
        bridge.remove_snapshot_listener(&second).await,
        Err(BridgeError::UnknownListener(_))
    ));

    // Both streams drain whatever was delivered, then end
    while timeout(WAIT, first_stream.next()).await.unwrap().is_some() {}
    while timeout(WAIT, second_stream.next()).await.unwrap().is_some() {}

    // Clearing an empty registry is fine
    bridge.clear_all_snapshot_listeners().await;
}

/// Test: typed listeners report undecodable documents as errors
#[tokio::test]
async fn test_typed_listener_decode_error() {
    #[derive(Debug, serde::Deserialize)]
    #[allow(dead_code)]
    struct Room {
        capacity: u32,
    }

    let (bridge, _) = initialized_bridge().await;
    bridge
        .set_document("rooms/bad", &json!({"capacity": "lots"}), false)
        .await
        .unwrap();

    let (id, mut stream) = bridge
        .document_snapshot_stream::<Room>("rooms/bad")
        .await
        .unwrap();
    let first = stream.next().await.unwrap();
    assert!(matches!(first, Err(BridgeError::Deserialization(_))));

    bridge.remove_snapshot_listener(&id).await.unwrap();
}

/// Test: re-initialize cancels listeners of the previous client
#[tokio::test]
async fn test_reinitialize_cancels_listeners() {
    let (bridge, backend) = initialized_bridge().await;
    let (id, mut stream) = bridge
        .document_snapshot_stream::<Value>("rooms/a")
        .await
        .unwrap();
    stream.next().await.unwrap().unwrap();

    bridge
        .initialize(FirestoreConfig::new("demo-project", "1:0:web:0", "demo-key"))
        .await
        .unwrap();

    assert!(timeout(WAIT, stream.next()).await.unwrap().is_none());
    assert!(!bridge.listeners().contains(&id));
    assert_eq!(backend.database().watch_count(), 0);
}
