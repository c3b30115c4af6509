//! Document references and path resolution
//!
//! A reference is a logical slash-separated path. Whether it names a document
//! or a collection is decided by the operation that resolves it, never by the
//! shape of the string.

use crate::error::BridgeError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Reference to a document
///
/// This is also the wire shape `{id, path}` returned by `add_document`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentReference {
    /// Document id (last segment of the path)
    pub id: String,
    /// Full document path (e.g., "users/alice")
    pub path: String,
}

impl DocumentReference {
    /// Resolve a document path
    ///
    /// Leading and trailing slashes are ignored. Empty paths and paths with
    /// empty segments are rejected.
    pub fn parse(path: &str) -> Result<Self, BridgeError> {
        let path = normalize_path(path)?;
        let id = last_segment(&path).to_string();
        Ok(Self { id, path })
    }

    /// Get the document ID (last segment of path)
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Get the full document path
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Get the parent collection path
    ///
    /// `None` for a single-segment path.
    pub fn parent_path(&self) -> Option<&str> {
        self.path.rsplit_once('/').map(|(parent, _)| parent)
    }
}

impl fmt::Display for DocumentReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

/// Trim surrounding slashes and reject empty paths or segments
pub(crate) fn normalize_path(path: &str) -> Result<String, BridgeError> {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() || trimmed.split('/').any(str::is_empty) {
        return Err(BridgeError::InvalidReference(path.to_string()));
    }
    Ok(trimmed.to_string())
}

pub(crate) fn last_segment(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}
