//! Shared in-memory database and the client that drives it
//!
//! One [`Database`] outlives every client a [`MemoryBackend`](super::MemoryBackend)
//! hands out, the way a persistent local cache outlives an app instance.
//! Writes apply locally as soon as they are accepted and watchers see them
//! immediately; the write's settlement waits until the client is online.

use super::evaluator::matches_all;
use crate::error::FirestoreError;
use crate::firestore::client::{FirestoreClient, NativeListener, SetOptions, WriteFuture};
use crate::firestore::document_reference::DocumentReference;
use crate::firestore::document_snapshot::NativeDocumentSnapshot;
use crate::firestore::field_value::{MapValue, Value};
use crate::firestore::listener::ListenerRegistration;
use crate::firestore::query::Query;
use crate::firestore::query_snapshot::{NativeQuerySnapshot, QueryDocumentSnapshot};
use async_trait::async_trait;
use futures::FutureExt;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex, MutexGuard, PoisonError};
use tokio::sync::{mpsc, watch};
use tracing::{debug, trace};

type DocumentSender = mpsc::UnboundedSender<Result<NativeDocumentSnapshot, FirestoreError>>;
type QuerySender = mpsc::UnboundedSender<Result<NativeQuerySnapshot, FirestoreError>>;

/// A single change to one document
#[derive(Debug, Clone)]
pub(crate) enum Mutation {
    Set { fields: MapValue, merge: bool },
    Update { fields: MapValue },
    Delete,
}

#[derive(Debug, Clone)]
struct StoredDocument {
    reference: DocumentReference,
    fields: MapValue,
}

struct DocumentWatch {
    reference: DocumentReference,
    sender: DocumentSender,
}

struct QueryWatch {
    query: Query,
    sender: QuerySender,
}

#[derive(Default)]
struct DatabaseState {
    /// path -> document, ordered by path
    documents: BTreeMap<String, StoredDocument>,
    document_watches: HashMap<u64, DocumentWatch>,
    query_watches: HashMap<u64, QueryWatch>,
}

impl DatabaseState {
    fn snapshot_document(&self, reference: &DocumentReference) -> NativeDocumentSnapshot {
        match self.documents.get(reference.path()) {
            Some(stored) => NativeDocumentSnapshot::found(reference.clone(), stored.fields.clone()),
            None => NativeDocumentSnapshot::missing(reference.clone()),
        }
    }

    fn snapshot_query(&self, query: &Query) -> NativeQuerySnapshot {
        let documents = self
            .documents
            .values()
            .filter(|stored| query.collection.contains(&stored.reference))
            .filter(|stored| matches_all(&stored.fields, &query.filters))
            .map(|stored| QueryDocumentSnapshot {
                reference: stored.reference.clone(),
                data: stored.fields.clone(),
            })
            .collect();
        NativeQuerySnapshot { documents }
    }

    fn apply(&mut self, reference: &DocumentReference, mutation: Mutation) -> Result<(), FirestoreError> {
        match mutation {
            Mutation::Set { fields, merge: true } => {
                let stored = self
                    .documents
                    .entry(reference.path.clone())
                    .or_insert_with(|| StoredDocument {
                        reference: reference.clone(),
                        fields: MapValue::new(),
                    });
                merge_into(&mut stored.fields, fields);
            }
            Mutation::Set { fields, merge: false } => {
                self.documents.insert(
                    reference.path.clone(),
                    StoredDocument {
                        reference: reference.clone(),
                        fields,
                    },
                );
            }
            Mutation::Update { fields } => {
                let stored = self
                    .documents
                    .get_mut(reference.path())
                    .ok_or_else(|| FirestoreError::NotFound(reference.path.clone()))?;
                for (path, value) in fields {
                    set_field(&mut stored.fields, &path, value);
                }
            }
            Mutation::Delete => {
                self.documents.remove(reference.path());
            }
        }
        Ok(())
    }

    /// Push fresh snapshots to every watcher affected by a change to `reference`
    fn notify(&mut self, reference: &DocumentReference) {
        let mut closed = Vec::new();

        for (id, watch) in &self.document_watches {
            if watch.reference == *reference {
                let snapshot = self.snapshot_document(&watch.reference);
                if watch.sender.send(Ok(snapshot)).is_err() {
                    closed.push(*id);
                }
            }
        }
        for id in closed.drain(..) {
            self.document_watches.remove(&id);
        }

        for (id, watch) in &self.query_watches {
            if watch.query.collection.contains(reference) {
                let snapshot = self.snapshot_query(&watch.query);
                if watch.sender.send(Ok(snapshot)).is_err() {
                    closed.push(*id);
                }
            }
        }
        for id in closed {
            self.query_watches.remove(&id);
        }
    }
}

/// Documents and live watches shared by every client of one backend
///
/// Cheap to clone; clones share the same data.
#[derive(Clone, Default)]
pub struct Database {
    inner: Arc<DatabaseInner>,
}

#[derive(Default)]
struct DatabaseInner {
    state: StdMutex<DatabaseState>,
    watch_counter: AtomicU64,
}

impl Database {
    /// Create an empty database
    pub fn new() -> Self {
        Self::default()
    }

    /// Current fields of the document at `path`
    pub fn document(&self, path: &str) -> Option<MapValue> {
        self.lock().documents.get(path).map(|stored| stored.fields.clone())
    }

    /// Number of stored documents
    pub fn len(&self) -> usize {
        self.lock().documents.len()
    }

    /// Whether no document is stored
    pub fn is_empty(&self) -> bool {
        self.lock().documents.is_empty()
    }

    /// Number of live document and query watches
    pub fn watch_count(&self) -> usize {
        let state = self.lock();
        state.document_watches.len() + state.query_watches.len()
    }

    pub(crate) fn get(&self, reference: &DocumentReference) -> NativeDocumentSnapshot {
        self.lock().snapshot_document(reference)
    }

    pub(crate) fn query(&self, query: &Query) -> NativeQuerySnapshot {
        self.lock().snapshot_query(query)
    }

    pub(crate) fn write(
        &self,
        reference: &DocumentReference,
        mutation: Mutation,
    ) -> Result<(), FirestoreError> {
        let mut state = self.lock();
        state.apply(reference, mutation)?;
        state.notify(reference);
        trace!(path = %reference, "local write applied");
        Ok(())
    }

    pub(crate) fn watch_document(
        &self,
        reference: &DocumentReference,
    ) -> NativeListener<NativeDocumentSnapshot> {
        let (sender, receiver) = mpsc::unbounded_channel();
        let id = self.next_watch_id();

        let mut state = self.lock();
        // Every listener starts with the current state
        let _ = sender.send(Ok(state.snapshot_document(reference)));
        state.document_watches.insert(
            id,
            DocumentWatch {
                reference: reference.clone(),
                sender,
            },
        );

        let database = self.clone();
        NativeListener {
            receiver,
            registration: ListenerRegistration::new(move || {
                database.lock().document_watches.remove(&id);
                Ok(())
            }),
        }
    }

    pub(crate) fn watch_query(&self, query: &Query) -> NativeListener<NativeQuerySnapshot> {
        let (sender, receiver) = mpsc::unbounded_channel();
        let id = self.next_watch_id();

        let mut state = self.lock();
        let _ = sender.send(Ok(state.snapshot_query(query)));
        state.query_watches.insert(
            id,
            QueryWatch {
                query: query.clone(),
                sender,
            },
        );

        let database = self.clone();
        NativeListener {
            receiver,
            registration: ListenerRegistration::new(move || {
                database.lock().query_watches.remove(&id);
                Ok(())
            }),
        }
    }

    fn next_watch_id(&self) -> u64 {
        self.inner.watch_counter.fetch_add(1, Ordering::SeqCst)
    }

    fn lock(&self) -> MutexGuard<'_, DatabaseState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("documents", &self.len())
            .field("watches", &self.watch_count())
            .finish()
    }
}

/// Deep-merge `source` into `target`; nested maps merge, anything else replaces
fn merge_into(target: &mut MapValue, source: MapValue) {
    for (key, value) in source {
        match (target.get_mut(&key), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => merge_into(existing, incoming),
            (_, value) => {
                target.insert(key, value);
            }
        }
    }
}

/// Set a dotted field path, creating intermediate maps as needed
fn set_field(target: &mut MapValue, path: &str, value: Value) {
    match path.split_once('.') {
        None => {
            target.insert(path.to_string(), value);
        }
        Some((head, rest)) => {
            let entry = target
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(MapValue::new()));
            if !entry.is_object() {
                *entry = Value::Object(MapValue::new());
            }
            if let Value::Object(nested) = entry {
                set_field(nested, rest, value);
            }
        }
    }
}

/// How a queued failure surfaces on the write that consumes it
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum WriteFailure {
    /// The client refuses the write outright; nothing is accepted
    Refuse(FirestoreError),
    /// The client accepts the write, which later settles with the error
    Settle(FirestoreError),
}

/// Failures queued for upcoming writes, shared across clients of one backend
pub(crate) type FailureQueue = Arc<StdMutex<VecDeque<WriteFailure>>>;

/// [`FirestoreClient`] over a shared [`Database`]
pub struct MemoryClient {
    database: Database,
    failures: FailureQueue,
    online: watch::Sender<bool>,
    terminated: AtomicBool,
    terminations: Arc<AtomicUsize>,
}

impl MemoryClient {
    pub(crate) fn new(database: Database, failures: FailureQueue, terminations: Arc<AtomicUsize>) -> Self {
        let (online, _) = watch::channel(true);
        Self {
            database,
            failures,
            online,
            terminated: AtomicBool::new(false),
            terminations,
        }
    }

    /// Whether network access is enabled
    pub fn is_online(&self) -> bool {
        *self.online.borrow()
    }

    /// Whether `terminate` has been called
    pub fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::SeqCst)
    }

    fn ensure_active(&self) -> Result<(), FirestoreError> {
        if self.is_terminated() {
            return Err(FirestoreError::FailedPrecondition(
                "The client has already been terminated.".to_string(),
            ));
        }
        Ok(())
    }

    /// Accept a write: apply it locally now, settle it once online
    fn dispatch(&self, reference: &DocumentReference, mutation: Mutation) -> Result<WriteFuture, FirestoreError> {
        self.ensure_active()?;

        let injected = self
            .failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();

        let outcome = match injected {
            Some(WriteFailure::Refuse(error)) => {
                debug!(path = %reference, error = %error, "write refused");
                return Err(error);
            }
            Some(WriteFailure::Settle(error)) => Err(error),
            None => self.database.write(reference, mutation),
        };

        let mut online = self.online.subscribe();
        let path = reference.path.clone();
        Ok(async move {
            if online.wait_for(|enabled| *enabled).await.is_err() {
                // Client dropped before the write could reach the server
                return Err(FirestoreError::Cancelled);
            }
            trace!(path = %path, ok = outcome.is_ok(), "write settled");
            outcome
        }
        .boxed())
    }
}

#[async_trait]
impl FirestoreClient for MemoryClient {
    async fn get_document(
        &self,
        reference: &DocumentReference,
    ) -> Result<NativeDocumentSnapshot, FirestoreError> {
        self.ensure_active()?;
        Ok(self.database.get(reference))
    }

    async fn run_query(&self, query: &Query) -> Result<NativeQuerySnapshot, FirestoreError> {
        self.ensure_active()?;
        Ok(self.database.query(query))
    }

    fn listen_document(
        &self,
        reference: &DocumentReference,
    ) -> Result<NativeListener<NativeDocumentSnapshot>, FirestoreError> {
        self.ensure_active()?;
        Ok(self.database.watch_document(reference))
    }

    fn listen_query(
        &self,
        query: &Query,
    ) -> Result<NativeListener<NativeQuerySnapshot>, FirestoreError> {
        self.ensure_active()?;
        Ok(self.database.watch_query(query))
    }

    fn update(
        &self,
        reference: &DocumentReference,
        data: MapValue,
    ) -> Result<WriteFuture, FirestoreError> {
        self.dispatch(reference, Mutation::Update { fields: data })
    }

    fn set(
        &self,
        reference: &DocumentReference,
        data: MapValue,
        options: SetOptions,
    ) -> Result<WriteFuture, FirestoreError> {
        self.dispatch(
            reference,
            Mutation::Set {
                fields: data,
                merge: options.merge,
            },
        )
    }

    fn delete(&self, reference: &DocumentReference) -> Result<WriteFuture, FirestoreError> {
        self.dispatch(reference, Mutation::Delete)
    }

    async fn enable_network(&self) -> Result<(), FirestoreError> {
        self.ensure_active()?;
        self.online.send_replace(true);
        debug!("network enabled");
        Ok(())
    }

    async fn disable_network(&self) -> Result<(), FirestoreError> {
        self.ensure_active()?;
        self.online.send_replace(false);
        debug!("network disabled");
        Ok(())
    }

    async fn terminate(&self) -> Result<(), FirestoreError> {
        if !self.terminated.swap(true, Ordering::SeqCst) {
            self.terminations.fetch_add(1, Ordering::SeqCst);
            debug!("client terminated");
        }
        Ok(())
    }
}
