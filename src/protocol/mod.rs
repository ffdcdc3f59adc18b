//! Wire message types.
//!
//! This module defines the message format exchanged between a host
//! [`Driver`](crate::Driver) and an [`EmbeddedClient`](crate::EmbeddedClient).
//!
//! # Protocol Overview
//!
//! | Message | Shape | Purpose |
//! |---------|-------|---------|
//! | [`Control::Ready`] | `{ kind: "ready", ack? }` | Readiness announcement / ack |
//! | [`Control::SetPort`] | `{ kind: "set-port" }` | Port upgrade offer / echo |
//! | [`Envelope`] (request) | `{ kind, id, response: true, ... }` | Correlated call |
//! | [`Envelope`] (notification) | `{ kind, ... }` | One-way event |
//! | [`Response`] | `{ id, success, error?, ... }` | Answer to a call |
//!
//! Any message may carry `frameId` while it travels over a shared bus.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `control` | Reserved handshake vocabulary |
//! | `envelope` | Domain message envelope |
//! | `inbound` | Classification of inbound values |
//! | `response` | Response message |

// ============================================================================
// Submodules
// ============================================================================

/// Handshake control messages.
pub mod control;

/// Domain message envelope.
pub mod envelope;

/// Inbound message classification.
pub mod inbound;

/// Response message type.
pub mod response;

// ============================================================================
// Re-exports
// ============================================================================

pub use control::{Control, READY_KIND, SET_PORT_KIND};
pub use envelope::Envelope;
pub use inbound::{Inbound, frame_id_of};
pub use response::{Outcome, Response};
