//! Frame RPC - request/response and events across isolated contexts.
//!
//! This library lets a host talk to content running in an isolated
//! embedded context over message channels that are asynchronous and
//! initially unavailable: the remote side may not have loaded yet, or may
//! reload at any time.
//!
//! # Architecture
//!
//! Both sides run the same link with different roles:
//!
//! - **Host ([`Driver`])**: Queries readiness, offers a dedicated port
//! - **Embedded ([`EmbeddedClient`])**: Announces readiness, adopts the port
//!
//! Key design principles:
//!
//! - Traffic starts on a shared [`Bus`], filtered by frame id when several
//!   contexts share it
//! - A scoped link upgrades once to a point-to-point [`Port`]
//! - Outbound messages are queued until the link is ready
//! - Requests are correlated by id and resolved at most once
//! - Protocol noise is dropped, never surfaced as an error
//!
//! # Quick Start
//!
//! ```no_run
//! use frame_rpc::{Bus, Driver, EmbeddedClient, Envelope, Result, listener};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let bus = Bus::new();
//!
//!     // Host side: queue a request before the context has loaded
//!     let driver = Driver::builder(&bus)
//!         .frame_url("https://sim.example/run.html?frameid=sim-1")
//!         .spawn()?;
//!     let pending = driver.send_request(Envelope::new("ping"))?;
//!
//!     // Embedded side: answer pings
//!     let client = EmbeddedClient::builder(&bus)
//!         .location("https://sim.example/run.html?frameid=sim-1")
//!         .spawn()?;
//!     let responder = client.clone();
//!     client.on("ping", listener(move |request| {
//!         let _ = responder.respond(request, Ok(Default::default()));
//!     }));
//!
//!     pending.await?;
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`driver`] | [`Driver`], [`EmbeddedClient`] and their configuration |
//! | [`link`] | Handshake, queueing, correlation and event dispatch |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`protocol`] | Wire message types |
//! | [`transport`] | Broadcast bus and point-to-point ports |

// ============================================================================
// Modules
// ============================================================================

/// Public link handles and configuration.
///
/// Use [`Driver::builder()`] or [`EmbeddedClient::builder()`] to spawn a
/// link.
pub mod driver;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers.
pub mod identifiers;

/// Link internals shared by both roles.
pub mod link;

/// Wire message types.
pub mod protocol;

/// Message transports.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Driver types
pub use driver::{
    Driver, DriverBuilder, EmbeddedClient, EmbeddedClientBuilder, FRAME_ID_PARAM, FrameHandle,
    LinkOptions,
};

// Link types
pub use link::{
    ANY_MESSAGE_EVENT, ChannelState, Listener, MESSAGE_SENT_EVENT, ResponseFuture, Role, listener,
};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{FrameId, RequestId};

// Protocol types
pub use protocol::{Envelope, Outcome, Response};

// Transport types
pub use transport::{Bus, Port, TransportKind};
