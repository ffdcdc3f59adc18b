//! Readiness handshake and port upgrade state machine.
//!
//! # Exchange
//!
//! ```text
//! Host                                   Embedded
//!  │ ── ready ────────────────────────────► │   (query, may be missed)
//!  │ ◄──────────────────────────── ready ── │   (announcement at startup)
//!  │ ── ready{ack} ───────────────────────► │   unscoped: both Ready(bus)
//!  │                                        │
//!  │ ── set-port + port (bus) ────────────► │   scoped: upgrade instead of ack
//!  │ ◄────────────────── set-port (port) ── │   both Ready(port)
//! ```
//!
//! Announcements are always answered with an ack; acks are never answered,
//! so the exchange terminates whichever side starts first.
//!
//! The host keeps listening on the bus after the upgrade. An announcement
//! heard there while on a port means the embedded context reloaded and
//! lost its end, so a fresh port is offered.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use crate::protocol::Control;
use crate::transport::TransportKind;

// ============================================================================
// Role
// ============================================================================

/// Which end of the link this is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Owns the embedded context and initiates upgrades.
    Host,
    /// Runs inside the embedded context and accepts upgrades.
    Embedded,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Host => f.write_str("host"),
            Self::Embedded => f.write_str("embedded"),
        }
    }
}

// ============================================================================
// ChannelState
// ============================================================================

/// Readiness of a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    /// Constructed, nothing sent yet.
    Uninitialized,
    /// Announced; waiting to hear from the remote side.
    AwaitingReady,
    /// Port offered before the link was ready; waiting for its echo.
    /// Outbound traffic is held.
    AwaitingPortAck,
    /// Traffic flows over the given transport.
    Ready(TransportKind),
}

impl ChannelState {
    /// Returns `true` once traffic may be delivered.
    #[inline]
    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    /// Returns the transport carrying traffic, once ready.
    #[inline]
    #[must_use]
    pub fn transport(&self) -> Option<TransportKind> {
        match self {
            Self::Ready(kind) => Some(*kind),
            _ => None,
        }
    }
}

// ============================================================================
// Steps
// ============================================================================

/// Progress of the one-time port upgrade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UpgradePhase {
    /// No upgrade wanted yet.
    Idle,
    /// Upgrade wanted; offered as soon as the remote side is heard from.
    Requested,
    /// Offer sent, echo outstanding. Outbound traffic is held.
    Pending,
    /// A port is in use.
    Complete,
}

/// What to do about an inbound `ready`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ReadyStep {
    /// Now ready over the bus: ack if `reply`, then flush.
    Ready {
        /// Whether the message was an announcement needing an ack.
        reply: bool,
    },
    /// Send the port offer.
    Upgrade,
    /// Remote side reloaded: ack again, do not flush.
    Reconfirm,
    /// Remote side reloaded and lost its port: offer a fresh one.
    Reoffer,
    /// Nothing to do.
    Ignore,
}

/// Result of asking for an upgrade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UpgradeRequest {
    /// Offer the port now.
    Initiate,
    /// Offer the port when the remote side is first heard from.
    Deferred,
    /// An upgrade was already requested, pending, or done.
    Ignored,
}

// ============================================================================
// Handshake
// ============================================================================

/// Tracks readiness and the port upgrade for one link.
#[derive(Debug)]
pub(crate) struct Handshake {
    role: Role,
    state: ChannelState,
    upgrade: UpgradePhase,
}

impl Handshake {
    /// Creates the handshake. `auto_upgrade` only has an effect for hosts.
    pub(crate) fn new(role: Role, auto_upgrade: bool) -> Self {
        let upgrade = if auto_upgrade && role == Role::Host {
            UpgradePhase::Requested
        } else {
            UpgradePhase::Idle
        };

        Self {
            role,
            state: ChannelState::Uninitialized,
            upgrade,
        }
    }

    /// Returns the current state.
    #[inline]
    pub(crate) fn state(&self) -> ChannelState {
        self.state
    }

    /// Returns `true` if queued traffic may be transmitted: the link is
    /// ready and no port offer is outstanding.
    #[inline]
    pub(crate) fn can_deliver(&self) -> bool {
        self.state.is_ready() && self.upgrade != UpgradePhase::Pending
    }

    /// Starts the exchange, returning the announcement to send.
    pub(crate) fn start(&mut self) -> Option<Control> {
        if self.state != ChannelState::Uninitialized {
            return None;
        }
        self.state = ChannelState::AwaitingReady;
        Some(Control::Ready { ack: false })
    }

    /// Handles an inbound `ready`.
    pub(crate) fn on_ready(&mut self, ack: bool) -> ReadyStep {
        match self.state {
            ChannelState::Uninitialized | ChannelState::AwaitingReady => {
                if self.upgrade == UpgradePhase::Requested {
                    self.upgrade = UpgradePhase::Pending;
                    self.state = ChannelState::AwaitingPortAck;
                    ReadyStep::Upgrade
                } else {
                    self.state = ChannelState::Ready(TransportKind::Broadcast);
                    ReadyStep::Ready { reply: !ack }
                }
            }
            ChannelState::AwaitingPortAck => ReadyStep::Ignore,
            ChannelState::Ready(_) if ack || self.upgrade == UpgradePhase::Pending => {
                ReadyStep::Ignore
            }
            ChannelState::Ready(TransportKind::Port) if self.role == Role::Host => {
                self.upgrade = UpgradePhase::Pending;
                ReadyStep::Reoffer
            }
            ChannelState::Ready(_) => ReadyStep::Reconfirm,
        }
    }

    /// Asks for a port upgrade (hosts only).
    pub(crate) fn request_upgrade(&mut self) -> UpgradeRequest {
        if self.role != Role::Host || self.upgrade != UpgradePhase::Idle {
            return UpgradeRequest::Ignored;
        }

        if self.state.is_ready() {
            // Stays ready over the bus until the echo arrives.
            self.upgrade = UpgradePhase::Pending;
            UpgradeRequest::Initiate
        } else {
            self.upgrade = UpgradePhase::Requested;
            UpgradeRequest::Deferred
        }
    }

    /// Returns `true` if a port offer from the remote side would be adopted.
    #[inline]
    pub(crate) fn accepts_offer(&self) -> bool {
        self.role == Role::Embedded && self.upgrade == UpgradePhase::Idle
    }

    /// Records adoption of an offered port.
    pub(crate) fn adopt(&mut self) {
        self.upgrade = UpgradePhase::Complete;
        self.state = ChannelState::Ready(TransportKind::Port);
    }

    /// Handles the echo of our own offer. Returns `true` if it completed
    /// the upgrade.
    pub(crate) fn on_port_ack(&mut self) -> bool {
        if self.upgrade != UpgradePhase::Pending {
            return false;
        }
        self.upgrade = UpgradePhase::Complete;
        self.state = ChannelState::Ready(TransportKind::Port);
        true
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const BUS: ChannelState = ChannelState::Ready(TransportKind::Broadcast);
    const PORT: ChannelState = ChannelState::Ready(TransportKind::Port);

    #[test]
    fn test_start_once() {
        let mut handshake = Handshake::new(Role::Embedded, false);
        assert_eq!(handshake.start(), Some(Control::Ready { ack: false }));
        assert_eq!(handshake.state(), ChannelState::AwaitingReady);
        assert_eq!(handshake.start(), None);
    }

    #[test]
    fn test_announcement_is_acked() {
        let mut handshake = Handshake::new(Role::Host, false);
        handshake.start();

        assert_eq!(handshake.on_ready(false), ReadyStep::Ready { reply: true });
        assert_eq!(handshake.state(), BUS);
    }

    #[test]
    fn test_ack_is_not_answered() {
        let mut handshake = Handshake::new(Role::Embedded, false);
        handshake.start();

        assert_eq!(handshake.on_ready(true), ReadyStep::Ready { reply: false });
        assert_eq!(handshake.on_ready(true), ReadyStep::Ignore);
    }

    #[test]
    fn test_reload_is_reconfirmed() {
        let mut handshake = Handshake::new(Role::Host, false);
        handshake.start();
        handshake.on_ready(false);

        assert_eq!(handshake.on_ready(false), ReadyStep::Reconfirm);
        assert_eq!(handshake.state(), BUS);
    }

    #[test]
    fn test_scoped_host_upgrades_instead_of_acking() {
        let mut handshake = Handshake::new(Role::Host, true);
        handshake.start();

        assert_eq!(handshake.on_ready(false), ReadyStep::Upgrade);
        assert_eq!(handshake.state(), ChannelState::AwaitingPortAck);

        // No control traffic on the bus during the upgrade window.
        assert_eq!(handshake.on_ready(false), ReadyStep::Ignore);
        assert_eq!(handshake.on_ready(true), ReadyStep::Ignore);

        assert!(handshake.on_port_ack());
        assert_eq!(handshake.state(), PORT);
        assert!(!handshake.on_port_ack());
    }

    #[test]
    fn test_auto_upgrade_ignored_for_embedded() {
        let mut handshake = Handshake::new(Role::Embedded, true);
        handshake.start();
        assert_eq!(handshake.on_ready(false), ReadyStep::Ready { reply: true });
        assert!(handshake.accepts_offer());
    }

    #[test]
    fn test_request_upgrade_is_idempotent() {
        let mut handshake = Handshake::new(Role::Host, false);
        handshake.start();
        handshake.on_ready(true);

        assert_eq!(handshake.request_upgrade(), UpgradeRequest::Initiate);
        assert_eq!(handshake.request_upgrade(), UpgradeRequest::Ignored);

        handshake.on_port_ack();
        assert_eq!(handshake.request_upgrade(), UpgradeRequest::Ignored);
    }

    #[test]
    fn test_explicit_upgrade_stays_ready() {
        let mut handshake = Handshake::new(Role::Host, false);
        handshake.start();
        handshake.on_ready(true);

        handshake.request_upgrade();
        assert_eq!(handshake.state(), BUS);
        assert!(!handshake.can_deliver());

        // No control traffic on the bus during the upgrade window.
        assert_eq!(handshake.on_ready(false), ReadyStep::Ignore);

        assert!(handshake.on_port_ack());
        assert_eq!(handshake.state(), PORT);
        assert!(handshake.can_deliver());
    }

    #[test]
    fn test_reload_after_upgrade_reoffers() {
        let mut handshake = Handshake::new(Role::Host, true);
        handshake.start();
        handshake.on_ready(false);
        handshake.on_port_ack();

        assert_eq!(handshake.on_ready(true), ReadyStep::Ignore);
        assert_eq!(handshake.on_ready(false), ReadyStep::Reoffer);
        assert_eq!(handshake.state(), PORT);
        assert!(!handshake.can_deliver());
        assert_eq!(handshake.on_ready(false), ReadyStep::Ignore);

        assert!(handshake.on_port_ack());
        assert!(handshake.can_deliver());
    }

    #[test]
    fn test_request_upgrade_before_ready_is_deferred() {
        let mut handshake = Handshake::new(Role::Host, false);
        handshake.start();

        assert_eq!(handshake.request_upgrade(), UpgradeRequest::Deferred);
        assert_eq!(handshake.request_upgrade(), UpgradeRequest::Ignored);
        assert_eq!(handshake.on_ready(true), ReadyStep::Upgrade);
    }

    #[test]
    fn test_embedded_adopts_once() {
        let mut handshake = Handshake::new(Role::Embedded, false);
        handshake.start();

        assert!(handshake.accepts_offer());
        handshake.adopt();
        assert_eq!(handshake.state(), PORT);
        assert!(!handshake.accepts_offer());
        assert_eq!(handshake.request_upgrade(), UpgradeRequest::Ignored);
    }

    #[test]
    fn test_host_never_adopts() {
        let handshake = Handshake::new(Role::Host, false);
        assert!(!handshake.accepts_offer());
    }
}
