//! Collection references

use super::document_reference::{last_segment, normalize_path, DocumentReference};
use crate::error::BridgeError;
use rand::Rng;
use std::fmt;

/// Length of auto-generated document ids
pub const AUTO_ID_LENGTH: usize = 20;

/// Reference to a collection
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollectionReference {
    path: String,
}

impl CollectionReference {
    /// Resolve a collection path
    pub fn parse(path: &str) -> Result<Self, BridgeError> {
        Ok(Self {
            path: normalize_path(path)?,
        })
    }

    /// Get collection ID (last segment of path)
    pub fn id(&self) -> &str {
        last_segment(&self.path)
    }

    /// Get the full collection path
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Get a document reference within this collection
    pub fn document(&self, document_id: impl AsRef<str>) -> DocumentReference {
        let id = document_id.as_ref().to_string();
        DocumentReference {
            path: format!("{}/{}", self.path, id),
            id,
        }
    }

    /// Reference to a new document with an auto-generated ID
    pub fn auto_document(&self) -> DocumentReference {
        self.document(auto_id())
    }

    /// Whether `document` is a direct child of this collection
    pub fn contains(&self, document: &DocumentReference) -> bool {
        document.parent_path() == Some(self.path.as_str())
    }
}

impl fmt::Display for CollectionReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

/// Generate a random alphanumeric document id
pub fn auto_id() -> String {
    rand::thread_rng()
        .sample_iter(&rand::distributions::Alphanumeric)
        .take(AUTO_ID_LENGTH)
        .map(char::from)
        .collect()
}
