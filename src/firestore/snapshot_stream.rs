//! Snapshot delivery for live listeners
//!
//! Each subscription gets one forwarder task. It pulls native snapshots off
//! the client's channel, normalizes them and hands them to a delivery
//! function, until it is cancelled, the client closes the channel, or the
//! client reports an error (which is delivered, then ends the loop).
//!
//! The callback form of the bridge's listener API delivers straight into the
//! caller's callback; the stream form delivers into a [`SnapshotStream`].

use super::client::NativeListener;
use super::document_snapshot::DocumentSnapshot;
use super::listener::{CallbackId, ListenerRegistration};
use super::query_snapshot::CollectionSnapshot;
use crate::error::BridgeError;
use futures::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::{mpsc, oneshot};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::trace;

/// Spawn the forwarder for one subscription
///
/// The returned registration stops the forwarder and detaches the native
/// listener. A delivery already in progress when it runs may still complete.
pub(crate) fn forward<N, S, M, D>(
    callback_id: CallbackId,
    listener: NativeListener<N>,
    map: M,
    mut deliver: D,
) -> ListenerRegistration
where
    N: Send + 'static,
    S: Send + 'static,
    M: Fn(N) -> Result<S, BridgeError> + Send + 'static,
    D: FnMut(Result<S, BridgeError>) + Send + 'static,
{
    let NativeListener {
        mut receiver,
        registration,
    } = listener;
    let (cancel_tx, mut cancel_rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                _ = &mut cancel_rx => {
                    break;
                }
                message = receiver.recv() => {
                    match message {
                        Some(Ok(native)) => {
                            trace!(callback_id = %callback_id, "delivering snapshot");
                            deliver(map(native));
                        }
                        Some(Err(e)) => {
                            deliver(Err(e.into()));
                            break;
                        }
                        None => break,
                    }
                }
            }
        }
        trace!(callback_id = %callback_id, "snapshot forwarder stopped");
    });

    ListenerRegistration::new(move || {
        // The forwarder may already be gone
        let _ = cancel_tx.send(());
        registration.remove()
    })
}

/// A stream of snapshot updates for one listener
///
/// The stream ends once the listener is removed from the bridge. Dropping the
/// stream does not remove the listener.
pub struct SnapshotStream<S> {
    inner: UnboundedReceiverStream<Result<S, BridgeError>>,
}

/// Stream of document snapshots
pub type DocumentSnapshotStream<T> = SnapshotStream<DocumentSnapshot<T>>;

/// Stream of collection snapshots
pub type CollectionSnapshotStream<T> = SnapshotStream<CollectionSnapshot<T>>;

impl<S> SnapshotStream<S> {
    pub(crate) fn new(receiver: mpsc::UnboundedReceiver<Result<S, BridgeError>>) -> Self {
        Self {
            inner: UnboundedReceiverStream::new(receiver),
        }
    }

    /// Channel-backed delivery function paired with its stream
    pub(crate) fn channel() -> (impl FnMut(Result<S, BridgeError>) + Send + 'static, Self)
    where
        S: Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let deliver = move |item| {
            // Receiver dropped: the caller stopped reading
            let _ = tx.send(item);
        };
        (deliver, Self::new(rx))
    }
}

impl<S> Stream for SnapshotStream<S> {
    type Item = Result<S, BridgeError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}
