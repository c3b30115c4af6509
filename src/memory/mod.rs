//! In-memory backend
//!
//! A self-contained [`Backend`] for local development and tests. Documents
//! live in one shared [`Database`] that survives re-initialization. Each
//! `initialize_app` hands out a fresh [`MemoryClient`] and [`MemoryAuth`].
//!
//! The backend also exposes a few hooks for driving failure paths: queued
//! write and sign-in failures, and counters for apps and terminated clients.

mod auth;
mod evaluator;
mod store;

pub use auth::{MemoryAuth, MemoryUser};
pub use store::{Database, MemoryClient};

use crate::app::FirestoreConfig;
use crate::error::FirestoreError;
use crate::firestore::client::{Backend, Connection};
use crate::firestore::settings::Settings;
use async_trait::async_trait;
use auth::{CurrentUser, SignInFailures};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex, MutexGuard, PoisonError};
use store::{FailureQueue, WriteFailure};
use tracing::debug;

/// App created by `initialize_app`
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryApp {
    /// Configuration the app was created with
    pub config: FirestoreConfig,
    /// Client settings the app was created with
    pub settings: Settings,
}

/// In-memory [`Backend`]
///
/// Cheap to clone; clones share the same database and apps, so a test can
/// keep a clone to inspect what the bridge did.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    inner: Arc<BackendInner>,
}

#[derive(Default)]
struct BackendInner {
    database: Database,
    apps: StdMutex<HashMap<String, MemoryApp>>,
    failures: FailureQueue,
    sign_in_failures: SignInFailures,
    current_user: CurrentUser,
    terminations: Arc<AtomicUsize>,
}

impl MemoryBackend {
    /// Create a backend with an empty database
    pub fn new() -> Self {
        Self::default()
    }

    /// The shared database
    pub fn database(&self) -> &Database {
        &self.inner.database
    }

    /// Make the next accepted write settle with `error` instead of applying
    ///
    /// Queued failures are consumed in order, one per write.
    pub fn fail_next_write(&self, error: FirestoreError) {
        self.queue_write_failure(WriteFailure::Settle(error));
    }

    /// Make the next write fail synchronously with `error`
    ///
    /// The client refuses the write before accepting it, so nothing is
    /// applied and the write is never counted as pending. Shares its queue
    /// with [`fail_next_write`](Self::fail_next_write).
    pub fn refuse_next_write(&self, error: FirestoreError) {
        self.queue_write_failure(WriteFailure::Refuse(error));
    }

    /// Make the next custom-token sign-in fail with the identity toolkit
    /// error `code`, e.g. `"USER_DISABLED"`
    pub fn fail_next_sign_in(&self, code: &str) {
        self.inner
            .sign_in_failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(code.to_string());
    }

    /// The live app registered under `name`
    pub fn app(&self, name: &str) -> Option<MemoryApp> {
        self.apps().get(name).cloned()
    }

    /// Number of live apps
    pub fn app_count(&self) -> usize {
        self.apps().len()
    }

    /// Number of clients terminated so far
    pub fn terminated_clients(&self) -> usize {
        self.inner.terminations.load(Ordering::SeqCst)
    }

    /// The signed-in user, shared by every client of this backend
    pub fn current_user(&self) -> Option<MemoryUser> {
        self.inner
            .current_user
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn queue_write_failure(&self, failure: WriteFailure) {
        self.inner
            .failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(failure);
    }

    fn apps(&self) -> MutexGuard<'_, HashMap<String, MemoryApp>> {
        self.inner.apps.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn initialize_app(
        &self,
        name: &str,
        config: &FirestoreConfig,
        settings: &Settings,
    ) -> Result<Connection, FirestoreError> {
        if config.project_id.is_none() {
            return Err(FirestoreError::InvalidArgument(
                "\"projectId\" not provided in firebase.initializeApp.".to_string(),
            ));
        }

        let mut apps = self.apps();
        if apps.contains_key(name) {
            return Err(FirestoreError::AlreadyExists);
        }
        apps.insert(
            name.to_string(),
            MemoryApp {
                config: config.clone(),
                settings: settings.clone(),
            },
        );
        debug!(app = name, project_id = ?config.project_id, "app initialized");

        let firestore = MemoryClient::new(
            self.inner.database.clone(),
            Arc::clone(&self.inner.failures),
            Arc::clone(&self.inner.terminations),
        );
        let auth = MemoryAuth::new(
            Arc::clone(&self.inner.current_user),
            Arc::clone(&self.inner.sign_in_failures),
        );

        Ok(Connection {
            firestore: Arc::new(firestore),
            auth: Arc::new(auth),
        })
    }

    async fn delete_app(&self, name: &str) -> Result<(), FirestoreError> {
        match self.apps().remove(name) {
            Some(_) => {
                debug!(app = name, "app deleted");
                Ok(())
            }
            None => Err(FirestoreError::NotFound(format!("app {name}"))),
        }
    }
}

impl std::fmt::Debug for MemoryBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryBackend")
            .field("database", &self.inner.database)
            .field("apps", &self.app_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AuthError;
    use crate::firestore::client::AuthClient;

    fn config() -> FirestoreConfig {
        FirestoreConfig::new("demo", "1:0:web:0", "key")
    }

    #[tokio::test]
    async fn test_initialize_records_app() {
        let backend = MemoryBackend::new();
        backend
            .initialize_app("primary", &config(), &Settings::default())
            .await
            .unwrap();

        let app = backend.app("primary").unwrap();
        assert_eq!(app.config, config());
        assert!(app.settings.is_cache_unlimited());
        assert!(app.settings.persistence_enabled);
    }

    #[tokio::test]
    async fn test_duplicate_app_rejected() {
        let backend = MemoryBackend::new();
        backend.initialize_app("primary", &config(), &Settings::default()).await.unwrap();

        let err = backend
            .initialize_app("primary", &config(), &Settings::default())
            .await
            .err()
            .unwrap();
        assert_eq!(err, FirestoreError::AlreadyExists);

        backend.delete_app("primary").await.unwrap();
        assert_eq!(backend.app_count(), 0);
        backend.initialize_app("primary", &config(), &Settings::default()).await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_project_id_rejected() {
        let backend = MemoryBackend::new();
        let result = backend
            .initialize_app("primary", &FirestoreConfig::default(), &Settings::default())
            .await;
        assert!(matches!(result, Err(FirestoreError::InvalidArgument(_))));
        assert_eq!(backend.app_count(), 0);
    }

    #[tokio::test]
    async fn test_sign_in_failure_reaches_new_clients() {
        let backend = MemoryBackend::new();
        let connection = backend
            .initialize_app("primary", &config(), &Settings::default())
            .await
            .unwrap();
        backend.fail_next_sign_in("TOO_MANY_ATTEMPTS_TRY_LATER");

        let err = connection.auth.sign_in_with_custom_token("user-1").await.unwrap_err();
        assert_eq!(err, AuthError::TooManyRequests);
        assert!(backend.current_user().is_none());

        connection.auth.sign_in_with_custom_token("user-1").await.unwrap();
        assert_eq!(backend.current_user().unwrap().uid, "user-1");
    }

    #[tokio::test]
    async fn test_delete_unknown_app() {
        let backend = MemoryBackend::new();
        assert!(backend.delete_app("nope").await.is_err());
    }
}
