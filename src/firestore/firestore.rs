//! The bridge facade
//!
//! [`FirestoreBridge`] is what a host talks to. It owns the client installed
//! by the last `initialize`, the listener registry and the pending-write
//! counter, and exposes every boundary operation as an async method.
//!
//! Every operation that needs the client checks for it first and fails with
//! [`BridgeError::NotInitialized`] before touching anything else.

use super::client::{AuthClient, Backend, FirestoreClient, SetOptions};
use super::collection_reference::CollectionReference;
use super::document_reference::DocumentReference;
use super::document_snapshot::{map_document, DocumentSnapshot};
use super::field_value::to_map_value;
use super::listener::{CallbackId, ListenerRegistry};
use super::pending_actions::{PendingActionCounter, PendingActions};
use super::query::{Query, QueryConstraint};
use super::query_snapshot::{map_collection, CollectionSnapshot};
use super::settings::Settings;
use super::snapshot_stream::{forward, CollectionSnapshotStream, DocumentSnapshotStream, SnapshotStream};
use super::write::{settle, AddedDocument};
use crate::app::{FirestoreConfig, APP_NAME};
use crate::error::BridgeError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Host-facing Firestore bridge
///
/// Cheap to clone; clones share the client, listeners and pending count.
///
/// # Example
/// ```
/// use firestore_bridge::{FirestoreBridge, FirestoreConfig, MemoryBackend};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), firestore_bridge::BridgeError> {
/// let bridge = FirestoreBridge::new(MemoryBackend::new());
/// bridge.initialize(FirestoreConfig::new("demo", "1:0:web:0", "key")).await?;
///
/// bridge.set_document("cities/SF", &serde_json::json!({"name": "San Francisco"}), false).await?;
/// let city: firestore_bridge::DocumentSnapshot = bridge.get_document("cities/SF").await?;
/// assert_eq!(city.get("name"), Some(&serde_json::json!("San Francisco")));
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct FirestoreBridge {
    inner: Arc<BridgeInner>,
}

struct BridgeInner {
    backend: Arc<dyn Backend>,
    settings: Settings,
    state: RwLock<Option<ClientState>>,
    listeners: ListenerRegistry,
    pending: Mutex<PendingActionCounter>,
}

/// Everything tied to one initialization
#[derive(Clone)]
struct ClientState {
    project_id: Option<String>,
    firestore: Arc<dyn FirestoreClient>,
    auth: Arc<dyn AuthClient>,
    pending: PendingActionCounter,
}

impl FirestoreBridge {
    /// Create an uninitialized bridge over `backend` with default settings
    pub fn new(backend: impl Backend + 'static) -> Self {
        Self::with_settings(backend, Settings::default())
    }

    /// Create an uninitialized bridge with explicit client settings
    pub fn with_settings(backend: impl Backend + 'static, settings: Settings) -> Self {
        Self {
            inner: Arc::new(BridgeInner {
                backend: Arc::new(backend),
                settings,
                state: RwLock::new(None),
                listeners: ListenerRegistry::new(),
                pending: Mutex::new(PendingActionCounter::new()),
            }),
        }
    }

    /// Configure the bridge with a new client
    ///
    /// A previously installed client is torn down first: its listeners are
    /// cancelled, its app deleted and the client terminated. The pending
    /// count starts over at zero for the new client.
    pub async fn initialize(&self, config: FirestoreConfig) -> Result<(), BridgeError> {
        let mut state = self.inner.state.write().await;

        if let Some(previous) = state.take() {
            debug!(project_id = ?previous.project_id, "tearing down previous client");
            self.tear_down(previous).await?;
        }

        let connection = self
            .inner
            .backend
            .initialize_app(APP_NAME, &config, &self.inner.settings)
            .await?;

        let pending = PendingActionCounter::new();
        *self
            .inner
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = pending.clone();

        *state = Some(ClientState {
            project_id: config.project_id.clone(),
            firestore: connection.firestore,
            auth: connection.auth,
            pending,
        });

        debug!(project_id = ?config.project_id, "firestore initialized");
        Ok(())
    }

    /// Tear the client down and return to the uninitialized state
    ///
    /// Does nothing when no client is installed.
    pub async fn terminate(&self) -> Result<(), BridgeError> {
        let mut state = self.inner.state.write().await;
        let Some(previous) = state.take() else {
            return Ok(());
        };

        let project_id = previous.project_id.clone();
        self.tear_down(previous).await?;
        debug!(project_id = ?project_id, "firestore terminated");
        Ok(())
    }

    /// Cancel every listener, delete the app and terminate the client
    ///
    /// Every step runs even when an earlier one fails; the first error wins.
    async fn tear_down(&self, previous: ClientState) -> Result<(), BridgeError> {
        self.inner.listeners.clear_all();
        let deleted = self.inner.backend.delete_app(APP_NAME).await;
        let terminated = previous.firestore.terminate().await;

        if let Err(e) = &deleted {
            warn!(error = %e, "failed to delete app");
        }
        if let Err(e) = &terminated {
            warn!(error = %e, "failed to terminate client");
        }
        deleted.and(terminated)?;
        Ok(())
    }

    /// Whether a client is installed
    pub async fn is_initialized(&self) -> bool {
        self.inner.state.read().await.is_some()
    }

    /// Project id of the installed client
    pub async fn project_id(&self) -> Option<String> {
        self.inner
            .state
            .read()
            .await
            .as_ref()
            .and_then(|state| state.project_id.clone())
    }

    /// The listener registry
    ///
    /// Safe to use from inside a snapshot callback, e.g. to remove the
    /// listener that is currently delivering.
    pub fn listeners(&self) -> &ListenerRegistry {
        &self.inner.listeners
    }

    /// Reads the document referred to by `reference`
    pub async fn get_document<T: DeserializeOwned>(
        &self,
        reference: &str,
    ) -> Result<DocumentSnapshot<T>, BridgeError> {
        let client = self.client().await?;
        let document = DocumentReference::parse(reference)?;
        let snapshot = client.firestore.get_document(&document).await?;
        map_document(snapshot)
    }

    /// Executes the query and returns the results
    pub async fn get_collection<T: DeserializeOwned>(
        &self,
        reference: &str,
        constraints: &[QueryConstraint],
    ) -> Result<CollectionSnapshot<T>, BridgeError> {
        let client = self.client().await?;
        let query = Query::new(CollectionReference::parse(reference)?, constraints);
        let snapshot = client.firestore.run_query(&query).await?;
        map_collection(snapshot)
    }

    /// Listen for snapshot changes on a document
    ///
    /// `callback` receives every snapshot until the returned id is removed.
    /// An error from the client is delivered once and ends the deliveries.
    pub async fn add_document_snapshot_listener<T, F>(
        &self,
        reference: &str,
        callback: F,
    ) -> Result<CallbackId, BridgeError>
    where
        T: DeserializeOwned + Send + 'static,
        F: FnMut(Result<DocumentSnapshot<T>, BridgeError>) + Send + 'static,
    {
        // Held across `add` so a concurrent initialize cannot clear the
        // registry between picking the client and registering the listener
        let state = self.inner.state.read().await;
        let client = state.as_ref().ok_or(BridgeError::NotInitialized)?;
        let document = DocumentReference::parse(reference)?;

        self.inner.listeners.add(|id| {
            let native = client.firestore.listen_document(&document)?;
            Ok(forward(id.clone(), native, map_document::<T>, callback))
        })
    }

    /// Listen for snapshot changes on a collection query
    pub async fn add_collection_snapshot_listener<T, F>(
        &self,
        reference: &str,
        constraints: &[QueryConstraint],
        callback: F,
    ) -> Result<CallbackId, BridgeError>
    where
        T: DeserializeOwned + Send + 'static,
        F: FnMut(Result<CollectionSnapshot<T>, BridgeError>) + Send + 'static,
    {
        let state = self.inner.state.read().await;
        let client = state.as_ref().ok_or(BridgeError::NotInitialized)?;
        let query = Query::new(CollectionReference::parse(reference)?, constraints);

        self.inner.listeners.add(|id| {
            let native = client.firestore.listen_query(&query)?;
            Ok(forward(id.clone(), native, map_collection::<T>, callback))
        })
    }

    /// Stream form of [`add_document_snapshot_listener`](Self::add_document_snapshot_listener)
    pub async fn document_snapshot_stream<T>(
        &self,
        reference: &str,
    ) -> Result<(CallbackId, DocumentSnapshotStream<T>), BridgeError>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let (deliver, stream) = SnapshotStream::channel();
        let id = self.add_document_snapshot_listener(reference, deliver).await?;
        Ok((id, stream))
    }

    /// Stream form of [`add_collection_snapshot_listener`](Self::add_collection_snapshot_listener)
    pub async fn collection_snapshot_stream<T>(
        &self,
        reference: &str,
        constraints: &[QueryConstraint],
    ) -> Result<(CallbackId, CollectionSnapshotStream<T>), BridgeError>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let (deliver, stream) = SnapshotStream::channel();
        let id = self
            .add_collection_snapshot_listener(reference, constraints, deliver)
            .await?;
        Ok((id, stream))
    }

    /// Stop listening for snapshot changes on a document or collection
    pub async fn remove_snapshot_listener(&self, id: &CallbackId) -> Result<(), BridgeError> {
        self.inner.listeners.remove(id)
    }

    /// Stop every listener; never fails
    pub async fn clear_all_snapshot_listeners(&self) {
        self.inner.listeners.clear_all();
    }

    /// Update fields of an existing document and wait for the write to settle
    pub async fn update_document<T: Serialize + ?Sized>(
        &self,
        reference: &str,
        data: &T,
    ) -> Result<(), BridgeError> {
        let client = self.client().await?;
        let document = DocumentReference::parse(reference)?;
        let data = to_map_value(data)?;
        let write = client.firestore.update(&document, data)?;
        settle(client.pending.acquire(), &document, write).await
    }

    /// Write a document and wait for the write to settle
    ///
    /// With `merge` the fields are merged into an existing document instead
    /// of replacing it.
    pub async fn set_document<T: Serialize + ?Sized>(
        &self,
        reference: &str,
        data: &T,
        merge: bool,
    ) -> Result<(), BridgeError> {
        let client = self.client().await?;
        let document = DocumentReference::parse(reference)?;
        let data = to_map_value(data)?;
        let write = client.firestore.set(&document, data, SetOptions { merge })?;
        settle(client.pending.acquire(), &document, write).await
    }

    /// Delete a document and wait for the write to settle
    pub async fn delete_document(&self, reference: &str) -> Result<(), BridgeError> {
        let client = self.client().await?;
        let document = DocumentReference::parse(reference)?;
        let write = client.firestore.delete(&document)?;
        settle(client.pending.acquire(), &document, write).await
    }

    /// Add a document with a generated id to the collection at `reference`
    ///
    /// Returns as soon as the client accepted the write. The returned
    /// identity is reserved, not confirmed; await
    /// [`AddedDocument::write`] for the outcome.
    pub async fn add_document<T: Serialize + ?Sized>(
        &self,
        reference: &str,
        data: &T,
    ) -> Result<AddedDocument, BridgeError> {
        let client = self.client().await?;
        let collection = CollectionReference::parse(reference)?;
        let data = to_map_value(data)?;

        let document = client.firestore.new_document(&collection);
        let write = client.firestore.set(&document, data, SetOptions::default())?;
        let completion = settle(client.pending.acquire(), &document, write);

        debug!(path = %document, "document add dispatched");
        Ok(AddedDocument {
            reference: document,
            write: completion,
        })
    }

    /// Login using a custom JWT token
    pub async fn sign_in_with_custom_token(&self, token: &str) -> Result<(), BridgeError> {
        let client = self.client().await?;
        client.auth.sign_in_with_custom_token(token).await?;
        Ok(())
    }

    /// Sign the current user out
    pub async fn sign_out(&self) -> Result<(), BridgeError> {
        let client = self.client().await?;
        client.auth.sign_out().await?;
        Ok(())
    }

    /// Re-enable network access for the client
    pub async fn enable_network(&self) -> Result<(), BridgeError> {
        let client = self.client().await?;
        client.firestore.enable_network().await?;
        Ok(())
    }

    /// Disable network access for the client
    pub async fn disable_network(&self) -> Result<(), BridgeError> {
        let client = self.client().await?;
        client.firestore.disable_network().await?;
        Ok(())
    }

    /// Number of writes dispatched but not yet settled
    ///
    /// Zero before the first `initialize`.
    pub async fn get_pending_actions(&self) -> PendingActions {
        self.inner
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .snapshot()
    }

    async fn client(&self) -> Result<ClientState, BridgeError> {
        self.inner
            .state
            .read()
            .await
            .clone()
            .ok_or(BridgeError::NotInitialized)
    }
}

impl std::fmt::Debug for FirestoreBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FirestoreBridge")
            .field("settings", &self.inner.settings)
            .field("listeners", &self.inner.listeners)
            .finish()
    }
}
