//! Host side of a link.
//!
//! The [`Driver`] owns the relationship with one embedded context. It
//! queries readiness on start, offers a dedicated port once the context
//! answers (when scoped), and from then on exchanges requests and events.
//!
//! # Example
//!
//! ```no_run
//! use frame_rpc::{Bus, Driver, Envelope, listener};
//!
//! # async fn example() -> frame_rpc::Result<()> {
//! let bus = Bus::new();
//! let driver = Driver::builder(&bus)
//!     .frame_url("https://sim.example/run.html?frameid=sim-1")
//!     .spawn()?;
//!
//! driver.on("simevent", listener(|event| {
//!     println!("{}", event.get_str("state"));
//! }));
//!
//! // Queued until the embedded context is ready.
//! let response = driver
//!     .send_request(Envelope::new("compile").field("code", "basic.showNumber(1)"))?
//!     .await?;
//! println!("{:?}", response.get("binary"));
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use crate::error::Result;
use crate::identifiers::FrameId;
use crate::link::{ChannelState, Link, Listener, ResponseFuture};
use crate::protocol::{Envelope, Outcome};
use crate::transport::{Bus, TransportKind};

use super::builder::DriverBuilder;
use super::frame::FrameHandle;

// ============================================================================
// Driver
// ============================================================================

/// Host-side handle to an embedded context.
///
/// Cheap to clone; clones share the link. The link runs until
/// [`dispose`](Self::dispose) is called or every clone is dropped.
#[derive(Clone)]
pub struct Driver {
    link: Link,
    frame: Arc<FrameHandle>,
}

// ============================================================================
// Driver - Construction
// ============================================================================

impl Driver {
    /// Creates a builder for a driver on `bus`.
    #[inline]
    #[must_use]
    pub fn builder(bus: &Bus) -> DriverBuilder {
        DriverBuilder::new(bus)
    }

    pub(crate) fn new(link: Link, frame: FrameHandle) -> Self {
        Self {
            link,
            frame: Arc::new(frame),
        }
    }

    /// Returns the embedded context this driver talks to.
    #[inline]
    #[must_use]
    pub fn frame(&self) -> &FrameHandle {
        &self.frame
    }

    /// Returns the frame id scoping bus traffic, if any.
    #[inline]
    #[must_use]
    pub fn frame_id(&self) -> Option<&FrameId> {
        self.frame.frame_id()
    }
}

// ============================================================================
// Driver - Messaging
// ============================================================================

impl Driver {
    /// Sends a request and returns a future for its response.
    ///
    /// The request is queued immediately, even if the future is never
    /// polled, and sent once the link is ready. The future resolves with
    /// the first response carrying the request's id and never resolves if
    /// none arrives.
    ///
    /// # Errors
    ///
    /// - [`Error::Disposed`] after [`dispose`](Self::dispose)
    /// - [`Error::Protocol`] if the kind is reserved for the handshake
    ///
    /// The returned future fails with [`Error::Remote`] or
    /// [`Error::RemoteFailure`] when the remote side reports failure.
    ///
    /// [`Error::Disposed`]: crate::Error::Disposed
    /// [`Error::Protocol`]: crate::Error::Protocol
    /// [`Error::Remote`]: crate::Error::Remote
    /// [`Error::RemoteFailure`]: crate::Error::RemoteFailure
    pub fn send_request(&self, envelope: Envelope) -> Result<ResponseFuture> {
        self.link.send_request(envelope)
    }

    /// Sends a notification, queued until the link is ready.
    ///
    /// # Errors
    ///
    /// Same as [`send_request`](Self::send_request).
    pub fn post_message(&self, envelope: Envelope) -> Result<()> {
        self.link.post_message(envelope)
    }

    /// Answers a request received from the embedded context.
    ///
    /// Returns `false`, sending nothing, if the request did not ask for a
    /// response.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Disposed`](crate::Error::Disposed) after
    /// [`dispose`](Self::dispose).
    pub fn respond(&self, request: &Envelope, outcome: Outcome) -> Result<bool> {
        self.link.respond(request, outcome)
    }
}

// ============================================================================
// Driver - Events
// ============================================================================

impl Driver {
    /// Registers a listener for `event`.
    ///
    /// `event` is an inbound message kind, [`ANY_MESSAGE_EVENT`] for every
    /// inbound message, or [`MESSAGE_SENT_EVENT`] for every message this
    /// driver transmits.
    ///
    /// [`ANY_MESSAGE_EVENT`]: crate::ANY_MESSAGE_EVENT
    /// [`MESSAGE_SENT_EVENT`]: crate::MESSAGE_SENT_EVENT
    #[inline]
    pub fn on(&self, event: impl Into<String>, listener: Listener) {
        self.link.on(event, listener);
    }

    /// Removes every registration of `listener` for `event`.
    #[inline]
    pub fn off(&self, event: &str, listener: &Listener) -> bool {
        self.link.off(event, listener)
    }

    /// Returns the number of registrations for `event`.
    #[inline]
    #[must_use]
    pub fn listener_count(&self, event: &str) -> usize {
        self.link.listener_count(event)
    }
}

// ============================================================================
// Driver - Lifecycle
// ============================================================================

impl Driver {
    /// Moves the link to a dedicated port.
    ///
    /// Happens automatically for scoped drivers unless disabled. Offered
    /// once the embedded context is ready; later calls return `false`.
    ///
    /// The state stays ready over the bus until the port is confirmed;
    /// messages sent meanwhile are held. The driver keeps listening on the
    /// bus and offers a fresh port if the embedded context reloads.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Disposed`](crate::Error::Disposed) after
    /// [`dispose`](Self::dispose).
    pub fn upgrade(&self) -> Result<bool> {
        self.link.upgrade()
    }

    /// Returns the current channel state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> ChannelState {
        self.link.state()
    }

    /// Waits until the link is ready and returns the active transport.
    ///
    /// Does not time out; wrap it in `tokio::time::timeout` if needed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Disposed`](crate::Error::Disposed) if the driver is
    /// or becomes disposed first.
    pub async fn wait_ready(&self) -> Result<TransportKind> {
        self.link.wait_ready().await
    }

    /// Returns the number of requests awaiting a response.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.link.pending_count()
    }

    /// Returns the number of messages queued for the channel.
    #[inline]
    #[must_use]
    pub fn queued_count(&self) -> usize {
        self.link.queued_count()
    }

    /// Stops the driver.
    ///
    /// Leaves the bus, closes the port, and leaves pending requests
    /// unresolved. Returns `false` if already disposed.
    pub fn dispose(&self) -> bool {
        self.link.dispose()
    }

    /// Returns `true` after [`dispose`](Self::dispose).
    #[inline]
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.link.is_disposed()
    }
}

impl fmt::Debug for Driver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Driver")
            .field("frame", &self.frame)
            .field("link", &self.link)
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
