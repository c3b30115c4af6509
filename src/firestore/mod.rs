//! Cloud Firestore bridge
//!
//! # Module layout
//! - `firestore.rs` holds [`FirestoreBridge`], the host-facing facade
//! - `client.rs` defines the underlying client traits the bridge drives
//! - `query.rs` translates host query constraints into native filters
//! - `document_reference.rs` / `collection_reference.rs` resolve paths
//! - `document_snapshot.rs` / `query_snapshot.rs` map native snapshots
//! - `listener.rs` keeps the registry of live subscriptions
//! - `pending_actions.rs` counts in-flight writes
//! - `types.rs` has the host request payloads

pub mod client;
pub mod collection_reference;
pub mod document_reference;
pub mod document_snapshot;
pub mod field_value;
/// Host-facing bridge facade
pub mod firestore;
pub mod listener;
pub mod pending_actions;
pub mod query;
pub mod query_snapshot;
pub mod settings;
/// Snapshot forwarding and streams for live listeners
pub mod snapshot_stream;
pub mod types;
/// Write settlement and background adds
pub mod write;

pub use firestore::FirestoreBridge;

pub use client::{AuthClient, Backend, Connection, FirestoreClient, NativeListener, SetOptions, WriteFuture};

pub use field_value::{FieldFilter, FilterOperator, MapValue, Value};

pub use query::{translate, Query, QueryConstraint, QueryOperator};

pub use settings::Settings;

pub use document_reference::DocumentReference;
pub use collection_reference::CollectionReference;

pub use document_snapshot::{map_document, DocumentSnapshot, NativeDocumentSnapshot};
pub use query_snapshot::{map_collection, CollectionSnapshot, NativeQuerySnapshot, QueryDocumentSnapshot};

pub use listener::{CallbackId, ListenerRegistration, ListenerRegistry};

pub use pending_actions::{PendingAction, PendingActionCounter, PendingActions};

pub use snapshot_stream::{CollectionSnapshotStream, DocumentSnapshotStream, SnapshotStream};

pub use write::{AddedDocument, PendingWrite};

pub use types::{
    AddDocument, CollectionQuery, CustomToken, DocumentQuery, RemoveSnapshotListener, SetDocument,
    UpdateDocument,
};
