//! Firestore Bridge
//!
//! Host-facing bridge over a Cloud Firestore client: one-shot document and
//! collection reads, live snapshot listeners addressed by callback id,
//! document writes with an in-flight counter, custom-token sign-in and
//! network toggling.
//!
//! The database itself sits behind the [`Backend`] trait. [`MemoryBackend`]
//! is a self-contained implementation for local use and tests.
//!
//! # Example
//! ```
//! use firestore_bridge::{FirestoreBridge, FirestoreConfig, MemoryBackend, QueryConstraint};
//! use serde_json::json;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), firestore_bridge::BridgeError> {
//! let bridge = FirestoreBridge::new(MemoryBackend::new());
//! bridge.initialize(FirestoreConfig::new("demo", "1:0:web:0", "key")).await?;
//!
//! bridge.set_document("users/alice", &json!({"age": 30}), false).await?;
//! bridge.set_document("users/bob", &json!({"age": 15}), false).await?;
//!
//! let adults: firestore_bridge::CollectionSnapshot = bridge
//!     .get_collection("users", &[QueryConstraint::where_greater_than_or_equal_to("age", 18)])
//!     .await?;
//! assert_eq!(adults.len(), 1);
//! assert_eq!(adults.collection[0].id, "alice");
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod app;
pub mod error;
pub mod firestore;
pub mod memory;

// Re-exports for convenience
pub use app::FirestoreConfig;
pub use error::{AuthError, BridgeError, FirestoreError};

pub use firestore::{
    AddedDocument, AuthClient, Backend, CallbackId, CollectionSnapshot, CollectionSnapshotStream,
    Connection, DocumentSnapshot, DocumentSnapshotStream, FirestoreBridge, FirestoreClient,
    PendingActions, PendingWrite, QueryConstraint, QueryOperator, Settings,
};

pub use memory::MemoryBackend;
