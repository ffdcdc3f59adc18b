//! Message transports.
//!
//! A link talks to its remote side through exactly one active transport at
//! a time.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐        Bus (broadcast)        ┌──────────────────┐
//! │  Driver      │◄─────────────────────────────►│  EmbeddedClient  │
//! │  (host)      │   shared by every context     │  (frame "a")     │
//! │              │                               │                  │
//! │              │        Port (point-to-point)  │                  │
//! │              │◄═════════════════════════════►│                  │
//! └──────────────┘   after the set-port upgrade  └──────────────────┘
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `bus` | Shared broadcast bus and its transport |
//! | `port` | Dedicated two-endpoint channel |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde_json::Value;

// ============================================================================
// Submodules
// ============================================================================

/// Shared broadcast bus.
pub mod bus;

/// Dedicated point-to-point port.
pub mod port;

// ============================================================================
// Re-exports
// ============================================================================

pub use bus::{BroadcastTransport, Bus, BusListener, Packet, TransferSlot};
pub use port::{Port, PortReceiver, PortSender};

// ============================================================================
// TransportKind
// ============================================================================

/// Which transport carries a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportKind {
    /// The shared broadcast bus.
    Broadcast,
    /// A dedicated port obtained by the upgrade handshake.
    Port,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Broadcast => f.write_str("broadcast"),
            Self::Port => f.write_str("port"),
        }
    }
}

// ============================================================================
// Transport
// ============================================================================

/// The ability to send a message to the remote side.
///
/// Posting never fails synchronously: a message to a peer that is gone is
/// dropped and logged.
pub trait Transport: Send {
    /// Returns the transport kind.
    fn kind(&self) -> TransportKind;

    /// Sends a message.
    fn post(&self, data: Value);

    /// Releases the transport. Later posts are dropped.
    fn close(&mut self) {}
}
