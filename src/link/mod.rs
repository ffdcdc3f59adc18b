//! One end of a cross-context link.
//!
//! A [`Link`] is shared by the host-side [`Driver`] and the embedded-side
//! [`EmbeddedClient`]; the two differ only in their [`Role`].
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `scope` | Frame identity filter for bus traffic |
//! | `handshake` | Readiness and port upgrade state machine |
//! | `queue` | Outbound FIFO held until ready |
//! | `correlator` | Request ids and pending responses |
//! | `dispatcher` | Named event listeners |
//! | `core` | Synchronous link state and routing |
//! | `pump` | Inbound event loop task |
//!
//! [`Driver`]: crate::Driver
//! [`EmbeddedClient`]: crate::EmbeddedClient

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use regex::Regex;
use serde_json::Value;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};

use crate::error::{Error, Result};
use crate::identifiers::FrameId;
use crate::protocol::{Envelope, Outcome};
use crate::transport::{Bus, TransferSlot, TransportKind};

use self::core::{Effects, LinkCore};

// ============================================================================
// Submodules
// ============================================================================

/// Request/response correlation.
pub mod correlator;

/// Named event listeners.
pub mod dispatcher;

/// Readiness handshake.
pub mod handshake;

/// Frame identity filter.
pub mod scope;

mod core;
mod pump;
mod queue;

// ============================================================================
// Re-exports
// ============================================================================

pub use correlator::ResponseFuture;
pub use dispatcher::{ANY_MESSAGE_EVENT, Listener, MESSAGE_SENT_EVENT, listener};
pub use handshake::{ChannelState, Role};
pub use scope::FrameScope;

use dispatcher::EventDispatcher;

// ============================================================================
// LinkConfig
// ============================================================================

/// Validated link settings.
#[derive(Debug, Clone)]
pub(crate) struct LinkConfig {
    /// Frame the link is scoped to on the bus.
    pub(crate) frame_id: Option<FrameId>,
    /// Upgrade to a port automatically when scoped (hosts only).
    pub(crate) upgrade: bool,
    /// Inbound event kinds to accept; everything else is dropped.
    pub(crate) kind_filter: Option<Regex>,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            frame_id: None,
            upgrade: true,
            kind_filter: None,
        }
    }
}

// ============================================================================
// Shared
// ============================================================================

/// State shared by the handles and the pump.
pub(crate) struct Shared {
    core: Mutex<LinkCore>,
    dispatcher: EventDispatcher,
}

impl Shared {
    /// Routes an inbound message and runs the resulting listeners.
    fn receive(&self, data: Value, via: TransportKind, transfer: Option<TransferSlot>) {
        let effects = self.core.lock().handle_inbound(data, via, transfer);
        self.deliver(effects);
    }

    /// Runs listeners. Must be called with the core unlocked.
    fn deliver(&self, effects: Effects) {
        for (event, envelope) in effects.events {
            self.dispatcher.dispatch(&event, &envelope);
        }
    }
}

// ============================================================================
// Link
// ============================================================================

/// Handle to a running link. Clones share the link.
#[derive(Clone)]
pub(crate) struct Link {
    shared: Arc<Shared>,
    state_rx: watch::Receiver<ChannelState>,
}

impl Link {
    /// Subscribes to `bus`, announces readiness and spawns the pump.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] outside a tokio runtime.
    pub(crate) fn spawn(role: Role, bus: &Bus, config: LinkConfig) -> Result<Self> {
        let runtime = Handle::try_current()
            .map_err(|_| Error::config("a link must be spawned inside a tokio runtime"))?;

        let (pump_tx, pump_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ChannelState::Uninitialized);

        let mut core = LinkCore::new(role, bus, config, pump_tx, state_tx);
        let listener = core.listen();
        core.start();

        let shared = Arc::new(Shared {
            core: Mutex::new(core),
            dispatcher: EventDispatcher::default(),
        });

        runtime.spawn(pump::run(Arc::downgrade(&shared), listener, pump_rx));

        Ok(Self { shared, state_rx })
    }

    pub(crate) fn send_request(&self, envelope: Envelope) -> Result<ResponseFuture> {
        let (future, effects) = self.shared.core.lock().send_request(envelope)?;
        self.shared.deliver(effects);
        Ok(future)
    }

    pub(crate) fn post_message(&self, envelope: Envelope) -> Result<()> {
        let effects = self.shared.core.lock().post_message(envelope)?;
        self.shared.deliver(effects);
        Ok(())
    }

    pub(crate) fn respond(&self, request: &Envelope, outcome: Outcome) -> Result<bool> {
        self.shared.core.lock().respond(request, outcome)
    }

    pub(crate) fn upgrade(&self) -> Result<bool> {
        self.shared.core.lock().upgrade()
    }

    pub(crate) fn on(&self, event: impl Into<String>, listener: Listener) {
        self.shared.dispatcher.on(event, listener);
    }

    pub(crate) fn off(&self, event: &str, listener: &Listener) -> bool {
        self.shared.dispatcher.off(event, listener)
    }

    pub(crate) fn listener_count(&self, event: &str) -> usize {
        self.shared.dispatcher.listener_count(event)
    }

    pub(crate) fn state(&self) -> ChannelState {
        *self.state_rx.borrow()
    }

    /// Waits until the link is ready and returns the active transport.
    pub(crate) async fn wait_ready(&self) -> Result<TransportKind> {
        if self.is_disposed() {
            return Err(Error::Disposed);
        }

        let mut state_rx = self.state_rx.clone();
        let state = *state_rx
            .wait_for(ChannelState::is_ready)
            .await
            .map_err(|_| Error::Disposed)?;

        state
            .transport()
            .ok_or_else(|| Error::protocol("ready state without a transport"))
    }

    pub(crate) fn pending_count(&self) -> usize {
        self.shared.core.lock().pending_count()
    }

    pub(crate) fn queued_count(&self) -> usize {
        self.shared.core.lock().queued_count()
    }

    pub(crate) fn dispose(&self) -> bool {
        self.shared.core.lock().dispose()
    }

    pub(crate) fn is_disposed(&self) -> bool {
        self.shared.core.lock().is_disposed()
    }
}

impl fmt::Debug for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let core = self.shared.core.lock();
        f.debug_struct("Link")
            .field("state", &core.state())
            .field("pending", &core.pending_count())
            .field("queued", &core.queued_count())
            .finish_non_exhaustive()
    }
}
