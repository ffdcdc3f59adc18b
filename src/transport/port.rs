//! Dedicated two-endpoint channel.
//!
//! [`Port::pair`] creates two connected ends. One stays with the creator,
//! the other is transferred to the remote side over the bus.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, trace};

use super::{Transport, TransportKind};

// ============================================================================
// Port
// ============================================================================

/// One end of a point-to-point channel.
pub struct Port {
    tx: mpsc::UnboundedSender<Value>,
    rx: mpsc::UnboundedReceiver<Value>,
}

impl Port {
    /// Creates two connected ports.
    #[must_use]
    pub fn pair() -> (Self, Self) {
        let (a_tx, b_rx) = mpsc::unbounded_channel();
        let (b_tx, a_rx) = mpsc::unbounded_channel();
        (Self { tx: a_tx, rx: a_rx }, Self { tx: b_tx, rx: b_rx })
    }

    /// Splits the port into its sending and receiving halves.
    #[must_use]
    pub fn split(self) -> (PortSender, PortReceiver) {
        (PortSender { tx: Some(self.tx) }, PortReceiver { rx: self.rx })
    }
}

impl fmt::Debug for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Port")
            .field("closed", &self.tx.is_closed())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// PortSender
// ============================================================================

/// Sending half of a port.
#[derive(Debug)]
pub struct PortSender {
    tx: Option<mpsc::UnboundedSender<Value>>,
}

impl Transport for PortSender {
    fn kind(&self) -> TransportKind {
        TransportKind::Port
    }

    fn post(&self, data: Value) {
        match &self.tx {
            Some(tx) => {
                if tx.send(data).is_err() {
                    debug!("Port peer is gone, message dropped");
                }
            }
            None => trace!("Port closed, message dropped"),
        }
    }

    fn close(&mut self) {
        self.tx = None;
    }
}

// ============================================================================
// PortReceiver
// ============================================================================

/// Receiving half of a port.
#[derive(Debug)]
pub struct PortReceiver {
    rx: mpsc::UnboundedReceiver<Value>,
}

impl PortReceiver {
    /// Receives the next message.
    ///
    /// Returns `None` once the peer's sender is closed.
    pub async fn recv(&mut self) -> Option<Value> {
        self.rx.recv().await
    }

    /// Receives a message that is already buffered, without waiting.
    pub fn try_recv(&mut self) -> Option<Value> {
        self.rx.try_recv().ok()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn test_pair_is_connected_both_ways() {
        let (a, b) = Port::pair();
        let (a_tx, mut a_rx) = a.split();
        let (b_tx, mut b_rx) = b.split();

        a_tx.post(json!(1));
        b_tx.post(json!(2));

        assert_eq!(b_rx.try_recv(), Some(json!(1)));
        assert_eq!(a_rx.try_recv(), Some(json!(2)));
        assert_eq!(a_tx.kind(), TransportKind::Port);
    }

    #[test]
    fn test_closed_sender_drops_messages() {
        let (a, b) = Port::pair();
        let (mut a_tx, _a_rx) = a.split();
        let (_b_tx, mut b_rx) = b.split();

        a_tx.close();
        a_tx.post(json!("late"));

        assert_eq!(b_rx.try_recv(), None);
    }

    #[tokio::test]
    async fn test_recv_ends_when_peer_drops() {
        let (a, b) = Port::pair();
        let (_a_tx, mut a_rx) = a.split();
        drop(b);

        assert_eq!(a_rx.recv().await, None);
    }
}
