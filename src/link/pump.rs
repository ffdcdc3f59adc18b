//! Inbound event loop.
//!
//! One task per link. It owns the receiving halves of the transports and
//! feeds each inbound message to the link, one at a time, to completion.

// ============================================================================
// Imports
// ============================================================================

use std::future::pending;
use std::sync::Weak;

use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::transport::{BusListener, Packet, PortReceiver, TransportKind};

use super::Shared;

// ============================================================================
// PumpCommand
// ============================================================================

/// Instructions from the link core to its pump.
pub(crate) enum PumpCommand {
    /// Start receiving from a port.
    ListenPort(PortReceiver),
    /// Stop receiving from the bus.
    LeaveBus,
    /// Stop the pump.
    Shutdown,
}

// ============================================================================
// Event Loop
// ============================================================================

/// Runs until shutdown or until every handle to the link is dropped.
///
/// Polling is biased: commands first, then the bus, then the port. Bus
/// packets already buffered when an upgrade completes are therefore seen
/// before the port's first message.
pub(crate) async fn run(
    shared: Weak<Shared>,
    bus: BusListener,
    mut commands: mpsc::UnboundedReceiver<PumpCommand>,
) {
    let mut bus = Some(bus);
    let mut port: Option<PortReceiver> = None;

    loop {
        tokio::select! {
            biased;

            command = commands.recv() => match command {
                Some(PumpCommand::ListenPort(receiver)) => {
                    trace!("Pump listening on port");
                    port = Some(receiver);
                }
                Some(PumpCommand::LeaveBus) => {
                    trace!("Pump left the bus");
                    bus = None;
                }
                Some(PumpCommand::Shutdown) | None => break,
            },

            packet = next_packet(&mut bus) => match packet {
                Some(packet) => {
                    let Some(shared) = shared.upgrade() else { break };
                    shared.receive(packet.data, TransportKind::Broadcast, packet.transfer);
                }
                None => {
                    debug!("Bus closed");
                    bus = None;
                }
            },

            message = next_message(&mut port) => match message {
                Some(data) => {
                    let Some(shared) = shared.upgrade() else { break };
                    shared.receive(data, TransportKind::Port, None);
                }
                None => {
                    debug!("Port closed by peer");
                    port = None;
                }
            },
        }
    }

    debug!("Link pump stopped");
}

async fn next_packet(bus: &mut Option<BusListener>) -> Option<Packet> {
    match bus {
        Some(listener) => listener.recv().await,
        None => pending().await,
    }
}

async fn next_message(port: &mut Option<PortReceiver>) -> Option<Value> {
    match port {
        Some(receiver) => receiver.recv().await,
        None => pending().await,
    }
}
