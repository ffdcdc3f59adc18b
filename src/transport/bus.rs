//! Shared broadcast bus.
//!
//! Every subscriber sees every packet. Subscribers filter out their own
//! packets by origin and, above this layer, other contexts' packets by
//! frame id.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing::{trace, warn};

use crate::identifiers::EndpointId;

use super::{Port, Transport, TransportKind};

// ============================================================================
// Constants
// ============================================================================

/// Default number of packets buffered per subscriber.
const DEFAULT_CAPACITY: usize = 1024;

// ============================================================================
// TransferSlot
// ============================================================================

/// A port travelling inside a packet.
///
/// Packets are cloned for every subscriber, but the port can only be taken
/// once; the first taker owns it.
#[derive(Clone, Default)]
pub struct TransferSlot(Arc<Mutex<Option<Port>>>);

impl TransferSlot {
    /// Wraps a port for transfer.
    #[inline]
    #[must_use]
    pub fn new(port: Port) -> Self {
        Self(Arc::new(Mutex::new(Some(port))))
    }

    /// Takes the port, leaving the slot empty.
    #[inline]
    pub fn take(&self) -> Option<Port> {
        self.0.lock().take()
    }
}

impl fmt::Debug for TransferSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransferSlot")
            .field("occupied", &self.0.lock().is_some())
            .finish()
    }
}

// ============================================================================
// Packet
// ============================================================================

/// One message on the bus.
#[derive(Debug, Clone)]
pub struct Packet {
    /// Endpoint that posted the packet.
    pub origin: EndpointId,
    /// Message payload.
    pub data: Value,
    /// Transferred port, if any.
    pub transfer: Option<TransferSlot>,
}

// ============================================================================
// Bus
// ============================================================================

/// A window-wide message bus shared by a host and its embedded contexts.
#[derive(Clone)]
pub struct Bus {
    tx: broadcast::Sender<Packet>,
}

impl Bus {
    /// Creates a bus with the default capacity.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Creates a bus buffering up to `capacity` packets per subscriber.
    ///
    /// Subscribers falling further behind lose the oldest packets.
    #[inline]
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Posts a packet to every current subscriber.
    pub fn post(&self, packet: Packet) {
        if self.tx.send(packet).is_err() {
            trace!("Bus has no subscribers, packet dropped");
        }
    }

    /// Returns the number of current subscribers.
    #[inline]
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    fn subscribe(&self) -> broadcast::Receiver<Packet> {
        self.tx.subscribe()
    }
}

impl Default for Bus {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Bus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// BroadcastTransport
// ============================================================================

/// Sends into a [`Bus`] under a fixed origin.
#[derive(Debug, Clone)]
pub struct BroadcastTransport {
    bus: Bus,
    origin: EndpointId,
}

impl BroadcastTransport {
    /// Creates a transport with a fresh origin.
    #[inline]
    #[must_use]
    pub fn new(bus: &Bus) -> Self {
        Self {
            bus: bus.clone(),
            origin: EndpointId::generate(),
        }
    }

    /// Returns this endpoint's origin.
    #[inline]
    #[must_use]
    pub fn origin(&self) -> EndpointId {
        self.origin
    }

    /// Subscribes to the bus, skipping this endpoint's own packets.
    ///
    /// Only packets posted after this call are observed.
    #[must_use]
    pub fn listen(&self) -> BusListener {
        BusListener {
            rx: self.bus.subscribe(),
            origin: self.origin,
        }
    }

    /// Sends a message together with a transferable port.
    pub fn post_with_transfer(&self, data: Value, port: Port) {
        self.bus.post(Packet {
            origin: self.origin,
            data,
            transfer: Some(TransferSlot::new(port)),
        });
    }
}

impl Transport for BroadcastTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Broadcast
    }

    fn post(&self, data: Value) {
        self.bus.post(Packet {
            origin: self.origin,
            data,
            transfer: None,
        });
    }
}

// ============================================================================
// BusListener
// ============================================================================

/// Receiving half of a bus subscription.
pub struct BusListener {
    rx: broadcast::Receiver<Packet>,
    origin: EndpointId,
}

impl BusListener {
    /// Receives the next packet posted by another endpoint.
    ///
    /// Returns `None` once the bus is gone.
    pub async fn recv(&mut self) -> Option<Packet> {
        loop {
            match self.rx.recv().await {
                Ok(packet) if packet.origin == self.origin => continue,
                Ok(packet) => return Some(packet),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Bus listener lagged, packets lost");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Receives a packet that is already buffered, without waiting.
    pub fn try_recv(&mut self) -> Option<Packet> {
        loop {
            match self.rx.try_recv() {
                Ok(packet) if packet.origin == self.origin => continue,
                Ok(packet) => return Some(packet),
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "Bus listener lagged, packets lost");
                }
                Err(_) => return None,
            }
        }
    }
}

impl fmt::Debug for BusListener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BusListener")
            .field("origin", &self.origin)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================
