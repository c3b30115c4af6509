//! Write settlement
//!
//! Every accepted write settles on its own task, holding a [`PendingAction`]
//! guard until the client resolves it. The caller gets a [`PendingWrite`];
//! dropping that does not release the guard or cancel the write.

use super::client::WriteFuture;
use super::document_reference::DocumentReference;
use super::pending_actions::PendingAction;
use crate::error::{BridgeError, FirestoreError};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{trace, warn};

/// Settle an accepted write on the runtime, detached from the caller
pub(crate) fn settle(
    pending: PendingAction,
    reference: &DocumentReference,
    write: WriteFuture,
) -> PendingWrite {
    let path = reference.path.clone();
    let (sender, result) = oneshot::channel();
    let handle = tokio::spawn(async move {
        let outcome = write.await.map_err(BridgeError::from);
        drop(pending);
        match sender.send(outcome) {
            Err(Err(e)) => warn!(path = %path, error = %e, "unobserved write failed"),
            _ => trace!(path = %path, "write settled"),
        }
    });
    PendingWrite { handle, result }
}

/// Completion of an accepted write
///
/// Resolves with the write's final result. Dropping it does not cancel the
/// write, which stays counted as pending until it settles.
#[derive(Debug)]
pub struct PendingWrite {
    handle: JoinHandle<()>,
    result: oneshot::Receiver<Result<(), BridgeError>>,
}

impl PendingWrite {
    /// Whether the write has settled
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Future for PendingWrite {
    type Output = Result<(), BridgeError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.result).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            // The settlement task was aborted or panicked
            Poll::Ready(Err(_)) => Poll::Ready(Err(FirestoreError::Cancelled.into())),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Result of `add_document`
///
/// `reference` is a reserved identity: the write behind it may still be in
/// flight. Await `write` for confirmation.
#[derive(Debug)]
pub struct AddedDocument {
    /// Identity allocated for the new document
    pub reference: DocumentReference,
    /// Completion of the write
    pub write: PendingWrite,
}

impl AddedDocument {
    /// Document id
    pub fn id(&self) -> &str {
        self.reference.id()
    }

    /// Document path
    pub fn path(&self) -> &str {
        self.reference.path()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::firestore::pending_actions::PendingActionCounter;
    use futures::FutureExt;

    fn reference() -> DocumentReference {
        DocumentReference::parse("cities/SF").unwrap()
    }

    fn acked_write() -> (oneshot::Sender<()>, WriteFuture) {
        let (ack_tx, ack_rx) = oneshot::channel::<()>();
        let write: WriteFuture = async move {
            let _ = ack_rx.await;
            Ok(())
        }
        .boxed();
        (ack_tx, write)
    }

    #[tokio::test]
    async fn test_settle_releases_on_failure() {
        let pending = PendingActionCounter::new();
        let write: WriteFuture = async { Err(FirestoreError::PermissionDenied) }.boxed();

        let result = settle(pending.acquire(), &reference(), write).await;

        assert!(matches!(
            result,
            Err(BridgeError::Firestore(FirestoreError::PermissionDenied))
        ));
        assert_eq!(pending.count(), 0);
    }

    #[tokio::test]
    async fn test_write_counts_until_settled() {
        let pending = PendingActionCounter::new();
        let (ack_tx, write) = acked_write();

        let mut completion = tokio_test::task::spawn(settle(pending.acquire(), &reference(), write));
        tokio_test::assert_pending!(completion.poll());
        assert_eq!(pending.count(), 1);

        ack_tx.send(()).unwrap();
        completion.await.unwrap();
        assert_eq!(pending.count(), 0);
    }

    #[tokio::test]
    async fn test_dropped_completion_keeps_write_counted() {
        let pending = PendingActionCounter::new();
        let (ack_tx, write) = acked_write();

        let completion = settle(pending.acquire(), &reference(), write);
        drop(completion);
        tokio::task::yield_now().await;
        assert_eq!(pending.count(), 1);

        ack_tx.send(()).unwrap();
        while pending.count() > 0 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_write_reports_error() {
        let pending = PendingActionCounter::new();
        let write: WriteFuture = async { Err(FirestoreError::Unavailable) }.boxed();

        let result = settle(pending.acquire(), &reference(), write).await;

        assert!(matches!(result, Err(BridgeError::Firestore(FirestoreError::Unavailable))));
        assert_eq!(pending.count(), 0);
    }
}
