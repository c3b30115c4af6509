//! Document snapshots and their normalization to the bridge wire shape

use super::document_reference::DocumentReference;
use super::field_value::{MapValue, Value};
use crate::error::BridgeError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// A document as the underlying client reports it
#[derive(Debug, Clone, PartialEq)]
pub struct NativeDocumentSnapshot {
    /// Document reference
    pub reference: DocumentReference,

    /// Document fields (None if document doesn't exist)
    pub data: Option<MapValue>,
}

impl NativeDocumentSnapshot {
    /// Snapshot of an existing document
    pub fn found(reference: DocumentReference, data: MapValue) -> Self {
        Self {
            reference,
            data: Some(data),
        }
    }

    /// Snapshot of a path with no document
    pub fn missing(reference: DocumentReference) -> Self {
        Self {
            reference,
            data: None,
        }
    }

    /// Check if document exists
    pub fn exists(&self) -> bool {
        self.data.is_some()
    }
}

/// Normalized document snapshot `{id, path, data}`
///
/// `data` is `None` iff the document did not exist when observed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentSnapshot<T = Value> {
    /// The id of the document
    pub id: String,

    /// The full path of the document
    pub path: String,

    /// The fields of the document, or null if the document doesn't exist
    pub data: Option<T>,
}

impl<T> DocumentSnapshot<T> {
    /// Check if document exists
    pub fn exists(&self) -> bool {
        self.data.is_some()
    }
}

impl DocumentSnapshot<Value> {
    /// Get a top-level field value
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.data.as_ref()?.get(field)
    }
}

/// Normalize a native document snapshot
///
/// `id` and `path` always come from the native reference. Fields are
/// converted to `T` without further validation; with the default
/// `T = Value` the conversion cannot fail.
pub fn map_document<T: DeserializeOwned>(
    snapshot: NativeDocumentSnapshot,
) -> Result<DocumentSnapshot<T>, BridgeError> {
    let NativeDocumentSnapshot { reference, data } = snapshot;
    let data = match data {
        Some(fields) => Some(decode_fields(fields)?),
        None => None,
    };
    Ok(DocumentSnapshot {
        id: reference.id,
        path: reference.path,
        data,
    })
}

pub(crate) fn decode_fields<T: DeserializeOwned>(fields: MapValue) -> Result<T, BridgeError> {
    Ok(serde_json::from_value(Value::Object(fields))?)
}
