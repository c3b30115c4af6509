//! Bridge error types
//!
//! Three families of failure reach a caller of the bridge:
//! - lifecycle failures raised by the bridge itself (`NotInitialized`,
//!   `UnknownListener`, rejected references or payloads)
//! - [`FirestoreError`] surfaced verbatim from the underlying database client
//! - [`AuthError`] surfaced verbatim from the underlying authentication client
//!
//! # Design
//! Uses thiserror for ergonomic error definitions. Delegated errors are
//! `#[error(transparent)]` so their message and source are the client's own.

use crate::firestore::listener::CallbackId;
use thiserror::Error;

/// Top-level bridge error type
///
/// # Example
/// ```
/// use firestore_bridge::{BridgeError, FirestoreError};
///
/// let err: BridgeError = FirestoreError::PermissionDenied.into();
/// assert_eq!(err.to_string(), "Permission denied");
/// ```
#[derive(Debug, Error)]
pub enum BridgeError {
    /// No client is installed; `initialize` has not completed
    #[error("Firestore not initialized")]
    NotInitialized,

    /// No active listener is registered under this id
    #[error("No callback with id {0}")]
    UnknownListener(CallbackId),

    /// The reference path could not be resolved
    #[error("Invalid reference: {0:?}")]
    InvalidReference(String),

    /// Write payload is not a document (JSON object)
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Snapshot data does not fit the requested type
    #[error("Deserialization error: {0}")]
    Deserialization(#[from] serde_json::Error),

    /// Error from the database client, unchanged
    #[error(transparent)]
    Firestore(#[from] FirestoreError),

    /// Error from the authentication client, unchanged
    #[error(transparent)]
    Auth(#[from] AuthError),
}

/// Firestore client errors
///
/// Mirrors the Firestore status codes the underlying client reports.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FirestoreError {
    /// Document not found
    #[error("Document not found: {0}")]
    NotFound(String),

    /// Permission denied
    #[error("Permission denied")]
    PermissionDenied,

    /// Resource already exists
    #[error("Resource already exists")]
    AlreadyExists,

    /// Invalid argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The client is not in a state that allows the operation
    #[error("Failed precondition: {0}")]
    FailedPrecondition(String),

    /// Deadline exceeded
    #[error("Deadline exceeded")]
    DeadlineExceeded,

    /// Operation was aborted
    #[error("Operation aborted")]
    Aborted,

    /// Operation was cancelled before it settled
    #[error("Operation cancelled")]
    Cancelled,

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// Service unavailable
    #[error("Service unavailable")]
    Unavailable,

    /// Unauthenticated
    #[error("Unauthenticated")]
    Unauthenticated,

    /// Connection or network error
    #[error("Connection error: {0}")]
    Connection(String),
}

/// Authentication client errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// The custom token is malformed or was rejected
    #[error("Invalid custom token")]
    InvalidCustomToken,

    /// The custom token belongs to a different project
    #[error("Custom token corresponds to a different audience")]
    CustomTokenMismatch,

    /// User account has been disabled
    #[error("User account disabled")]
    UserDisabled,

    /// Too many failed attempts
    #[error("Too many requests, try again later")]
    TooManyRequests,

    /// Invalid API key
    #[error("Invalid API key")]
    InvalidApiKey,

    /// Network error
    #[error("Network error: {0}")]
    NetworkRequestFailed(String),

    /// Unknown error with the raw code
    #[error("Unknown auth error: {0}")]
    Unknown(String),
}

impl BridgeError {
    /// Check if the underlying client reported a transient condition
    ///
    /// The bridge never retries on its own; this only classifies.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Firestore(FirestoreError::Unavailable)
                | Self::Firestore(FirestoreError::DeadlineExceeded)
                | Self::Firestore(FirestoreError::Connection(_))
                | Self::Auth(AuthError::NetworkRequestFailed(_))
                | Self::Auth(AuthError::TooManyRequests)
        )
    }
}

impl AuthError {
    /// Create from an identity toolkit error code
    pub fn from_error_code(code: &str) -> Self {
        match code {
            "INVALID_CUSTOM_TOKEN" => Self::InvalidCustomToken,
            "CREDENTIAL_MISMATCH" => Self::CustomTokenMismatch,
            "USER_DISABLED" => Self::UserDisabled,
            "TOO_MANY_ATTEMPTS_TRY_LATER" => Self::TooManyRequests,
            "INVALID_API_KEY" => Self::InvalidApiKey,
            network if network.starts_with("NETWORK_") => Self::NetworkRequestFailed(network.to_string()),
            other => Self::Unknown(other.to_string()),
        }
    }
}
