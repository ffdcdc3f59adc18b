//! Named event listeners.
//!
//! Inbound messages that are not responses are delivered to listeners
//! registered under their `kind`, then again under [`ANY_MESSAGE_EVENT`].
//! Messages a link transmits are delivered locally under
//! [`MESSAGE_SENT_EVENT`].

// ============================================================================
// Imports
// ============================================================================

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tracing::error;

use crate::protocol::Envelope;

// ============================================================================
// Constants
// ============================================================================

/// Event receiving every inbound non-response message.
pub const ANY_MESSAGE_EVENT: &str = "message";

/// Event receiving every message this side transmits.
pub const MESSAGE_SENT_EVENT: &str = "sent";

// ============================================================================
// Types
// ============================================================================

/// Event listener callback.
///
/// Listeners are compared by pointer identity, so keep the `Arc` around to
/// remove one later.
pub type Listener = Arc<dyn Fn(&Envelope) + Send + Sync>;

/// Map of event names to listeners in registration order.
type ListenerRegistry = FxHashMap<String, Vec<Listener>>;

/// Wraps a closure as a [`Listener`].
#[inline]
#[must_use]
pub fn listener(f: impl Fn(&Envelope) + Send + Sync + 'static) -> Listener {
    Arc::new(f)
}

// ============================================================================
// EventDispatcher
// ============================================================================

/// Registry of listeners keyed by event name.
#[derive(Default)]
pub(crate) struct EventDispatcher {
    registry: Mutex<ListenerRegistry>,
}

impl EventDispatcher {
    /// Registers a listener. Registering the same listener twice makes it
    /// run twice per dispatch.
    pub(crate) fn on(&self, event: impl Into<String>, listener: Listener) {
        self.registry
            .lock()
            .entry(event.into())
            .or_default()
            .push(listener);
    }

    /// Removes every registration of `listener` under `event`.
    ///
    /// Returns `true` if anything was removed.
    pub(crate) fn off(&self, event: &str, listener: &Listener) -> bool {
        let mut registry = self.registry.lock();
        let Some(listeners) = registry.get_mut(event) else {
            return false;
        };

        let before = listeners.len();
        listeners.retain(|l| !Arc::ptr_eq(l, listener));
        let removed = listeners.len() != before;

        if listeners.is_empty() {
            registry.remove(event);
        }
        removed
    }

    /// Invokes the listeners registered under `event`.
    ///
    /// Runs on a snapshot taken before the first call, with no lock held.
    /// A panicking listener is logged and skipped. Returns the number of
    /// listeners that completed.
    pub(crate) fn dispatch(&self, event: &str, envelope: &Envelope) -> usize {
        let snapshot = match self.registry.lock().get(event) {
            Some(listeners) => listeners.clone(),
            None => return 0,
        };

        let mut completed = 0;
        for listener in snapshot {
            match catch_unwind(AssertUnwindSafe(|| listener(envelope))) {
                Ok(()) => completed += 1,
                Err(payload) => {
                    error!(
                        event,
                        kind = %envelope.kind,
                        panic = panic_message(payload.as_ref()),
                        "Event listener panicked"
                    );
                }
            }
        }
        completed
    }

    /// Returns the number of registrations under `event`.
    #[inline]
    pub(crate) fn listener_count(&self, event: &str) -> usize {
        self.registry.lock().get(event).map_or(0, Vec::len)
    }
}

/// Extracts a printable message from a panic payload.
fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}

// ============================================================================
// Tests
// ============================================================================
