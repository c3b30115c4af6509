//! Request payloads accepted from the host
//!
//! These mirror the plugin's request objects field for field so a host
//! transport can deserialize them directly and hand the parts to
//! [`FirestoreBridge`](super::FirestoreBridge).

use super::field_value::Value;
use super::listener::CallbackId;
use super::query::QueryConstraint;
use serde::{Deserialize, Serialize};

/// `{reference}` for single-document operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentQuery {
    /// Document path
    pub reference: String,
}

/// `{reference, queryConstraints?}` for collection operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionQuery {
    /// Collection path
    pub reference: String,

    /// Constraints ANDed together; absent means unfiltered
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub query_constraints: Vec<QueryConstraint>,
}

/// `{reference, data}` for `updateDocument`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateDocument<T = Value> {
    /// Document path
    pub reference: String,
    /// Fields to update
    pub data: T,
}

/// `{reference, data, merge?}` for `setDocument`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetDocument<T = Value> {
    /// Document path
    pub reference: String,
    /// Document body
    pub data: T,
    /// Merge into the existing document instead of replacing it
    #[serde(default)]
    pub merge: bool,
}

/// `{reference, data}` for `addDocument`; `reference` names the collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddDocument<T = Value> {
    /// Collection path
    pub reference: String,
    /// Document body
    pub data: T,
}

/// `{token}` for `signInWithCustomToken`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomToken {
    /// Custom JWT
    pub token: String,
}

/// `{callbackId}` for `removeSnapshotListener`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveSnapshotListener {
    /// Id returned when the listener was added
    pub callback_id: CallbackId,
}
