//! Query snapshots and their normalization to the bridge wire shape

use super::document_reference::DocumentReference;
use super::document_snapshot::{decode_fields, DocumentSnapshot};
use super::field_value::{MapValue, Value};
use crate::error::BridgeError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// A document that matched a query
///
/// Query results only ever contain existing documents, so the fields are not
/// optional here.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryDocumentSnapshot {
    /// Document reference
    pub reference: DocumentReference,
    /// Document fields
    pub data: MapValue,
}

/// Query result as the underlying client reports it
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NativeQuerySnapshot {
    /// Matching documents, in store order
    pub documents: Vec<QueryDocumentSnapshot>,
}

impl NativeQuerySnapshot {
    /// Check if the query result is empty
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Get the number of documents in the snapshot
    pub fn len(&self) -> usize {
        self.documents.len()
    }
}

/// Normalized collection snapshot `{collection: [...]}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionSnapshot<T = Value> {
    /// One snapshot per matching document; `data` is always present
    pub collection: Vec<DocumentSnapshot<T>>,
}

impl<T> CollectionSnapshot<T> {
    /// Number of documents
    pub fn len(&self) -> usize {
        self.collection.len()
    }

    /// Whether no document matched
    pub fn is_empty(&self) -> bool {
        self.collection.is_empty()
    }

    /// Iterate over the documents
    pub fn iter(&self) -> std::slice::Iter<'_, DocumentSnapshot<T>> {
        self.collection.iter()
    }
}

/// Normalize a native query snapshot, keeping every document in order
pub fn map_collection<T: DeserializeOwned>(
    snapshot: NativeQuerySnapshot,
) -> Result<CollectionSnapshot<T>, BridgeError> {
    let collection = snapshot
        .documents
        .into_iter()
        .map(|document| {
            Ok(DocumentSnapshot {
                id: document.reference.id,
                path: document.reference.path,
                data: Some(decode_fields(document.data)?),
            })
        })
        .collect::<Result<Vec<_>, BridgeError>>()?;

    Ok(CollectionSnapshot { collection })
}
