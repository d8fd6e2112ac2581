//! Rendezvous - one-slot handoff between dispatch tasks and a delivery task
//!
//! Many producers share a [`Rendezvous`]; exactly one [`Acceptor`] drains it.
//! [`Rendezvous::hand_off`] returns only once the acceptor completed the
//! [`Handoff`], so a slow delivery task pushes back on every producer.

use bytes::Bytes;
use tokio::sync::{mpsc, oneshot};
use tracing::trace;

use crate::error::DispatcherError;

/// Create a connected producer/acceptor pair
pub fn rendezvous() -> (Rendezvous, Acceptor) {
    let (tx, rx) = mpsc::channel(1);
    (Rendezvous { tx }, Acceptor { rx })
}

/// Producer side, shared by all dispatch tasks of a receiver
#[derive(Debug, Clone)]
pub struct Rendezvous {
    tx: mpsc::Sender<Handoff>,
}

impl Rendezvous {
    /// Hand `payload` over and wait for the acceptor to complete it
    ///
    /// # Errors
    /// - [`DispatcherError::HandoffClosed`] when the acceptor was dropped
    /// - [`DispatcherError::HandoffRejected`] when the acceptor dropped the
    ///   item without completing it
    pub async fn hand_off(&self, payload: Bytes) -> Result<(), DispatcherError> {
        let (ack, acked) = oneshot::channel();
        self.tx
            .send(Handoff { payload, ack })
            .await
            .map_err(|_| DispatcherError::HandoffClosed)?;
        acked.await.map_err(|_| DispatcherError::HandoffRejected)
    }
}

/// Consumer side, owned by the single delivery task
#[derive(Debug)]
pub struct Acceptor {
    rx: mpsc::Receiver<Handoff>,
}

impl Acceptor {
    /// Next live item, or `None` once every producer is gone
    ///
    /// Items whose producer stopped waiting are discarded. Cancel safe.
    pub async fn accept(&mut self) -> Option<Handoff> {
        while let Some(handoff) = self.rx.recv().await {
            if handoff.is_abandoned() {
                trace!(bytes = handoff.payload.len(), "discarding abandoned handoff");
                continue;
            }
            return Some(handoff);
        }
        None
    }
}

/// One accepted item awaiting completion
#[derive(Debug)]
pub struct Handoff {
    payload: Bytes,
    ack: oneshot::Sender<()>,
}

impl Handoff {
    /// Payload carried by this handoff
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Whether the producer stopped waiting
    pub fn is_abandoned(&self) -> bool {
        self.ack.is_closed()
    }

    /// Release the waiting producer
    pub fn complete(self) {
        // The producer may have given up in the meantime.
        let _ = self.ack.send(());
    }
}
