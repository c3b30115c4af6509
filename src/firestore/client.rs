//! Underlying client collaborators
//!
//! The bridge never talks to a database itself. A [`Backend`] creates a
//! [`Connection`] per initialization, made of a [`FirestoreClient`] for
//! reads, writes and subscriptions and an [`AuthClient`] for sign-in. Both
//! keep their own retry and error semantics; the bridge forwards their errors
//! unchanged.
//!
//! Writes are two-phase: the synchronous call either refuses the write (the
//! client never accepted it) or returns a [`WriteFuture`] that settles when
//! the client is done with it. Only accepted writes are counted as pending.

use super::collection_reference::CollectionReference;
use super::document_reference::DocumentReference;
use super::document_snapshot::NativeDocumentSnapshot;
use super::field_value::MapValue;
use super::listener::ListenerRegistration;
use super::query::Query;
use super::query_snapshot::NativeQuerySnapshot;
use super::settings::Settings;
use crate::app::FirestoreConfig;
use crate::error::{AuthError, FirestoreError};
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Settlement of an accepted write
pub type WriteFuture = BoxFuture<'static, Result<(), FirestoreError>>;

/// Options for `set` writes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetOptions {
    /// Merge the given fields into an existing document instead of replacing it
    pub merge: bool,
}

impl SetOptions {
    /// Options that merge into an existing document
    pub fn merge() -> Self {
        Self { merge: true }
    }
}

/// A live subscription as the underlying client hands it out
///
/// Snapshots arrive on `receiver` in the order the client observes changes.
/// An `Err` item ends the subscription. `registration` detaches it.
#[derive(Debug)]
pub struct NativeListener<S> {
    /// Snapshot deliveries
    pub receiver: mpsc::UnboundedReceiver<Result<S, FirestoreError>>,
    /// Cancellation handle
    pub registration: ListenerRegistration,
}

/// Document database client
#[async_trait]
pub trait FirestoreClient: Send + Sync {
    /// Read one document
    async fn get_document(
        &self,
        reference: &DocumentReference,
    ) -> Result<NativeDocumentSnapshot, FirestoreError>;

    /// Execute a collection query once
    async fn run_query(&self, query: &Query) -> Result<NativeQuerySnapshot, FirestoreError>;

    /// Subscribe to one document
    fn listen_document(
        &self,
        reference: &DocumentReference,
    ) -> Result<NativeListener<NativeDocumentSnapshot>, FirestoreError>;

    /// Subscribe to a collection query
    fn listen_query(
        &self,
        query: &Query,
    ) -> Result<NativeListener<NativeQuerySnapshot>, FirestoreError>;

    /// Allocate the identity of a new document in `collection`
    fn new_document(&self, collection: &CollectionReference) -> DocumentReference {
        collection.auto_document()
    }

    /// Update fields of an existing document
    fn update(
        &self,
        reference: &DocumentReference,
        data: MapValue,
    ) -> Result<WriteFuture, FirestoreError>;

    /// Write a document, replacing or merging
    fn set(
        &self,
        reference: &DocumentReference,
        data: MapValue,
        options: SetOptions,
    ) -> Result<WriteFuture, FirestoreError>;

    /// Delete a document
    fn delete(&self, reference: &DocumentReference) -> Result<WriteFuture, FirestoreError>;

    /// Re-enable network access after `disable_network`
    async fn enable_network(&self) -> Result<(), FirestoreError>;

    /// Disable network access; reads come from cache and writes queue locally
    async fn disable_network(&self) -> Result<(), FirestoreError>;

    /// Shut the client down; it must not be used afterwards
    async fn terminate(&self) -> Result<(), FirestoreError>;
}

/// Authentication client
#[async_trait]
pub trait AuthClient: Send + Sync {
    /// Sign in with a custom JWT minted by the host's backend
    async fn sign_in_with_custom_token(&self, token: &str) -> Result<(), AuthError>;

    /// Sign the current user out
    async fn sign_out(&self) -> Result<(), AuthError>;
}

/// Clients created for one initialization
#[derive(Clone)]
pub struct Connection {
    /// Database client
    pub firestore: Arc<dyn FirestoreClient>,
    /// Authentication client
    pub auth: Arc<dyn AuthClient>,
}

/// Factory for client connections
#[async_trait]
pub trait Backend: Send + Sync {
    /// Initialize a named app and its clients
    async fn initialize_app(
        &self,
        name: &str,
        config: &FirestoreConfig,
        settings: &Settings,
    ) -> Result<Connection, FirestoreError>;

    /// Delete a named app created by `initialize_app`
    async fn delete_app(&self, name: &str) -> Result<(), FirestoreError>;
}
