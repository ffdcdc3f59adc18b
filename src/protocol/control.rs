//! Handshake control messages.

// ============================================================================
// Imports
// ============================================================================

use serde_json::{Map, Value};

use crate::identifiers::FrameId;

// ============================================================================
// Constants
// ============================================================================

/// Kind of the readiness announcement.
pub const READY_KIND: &str = "ready";

/// Kind of the port upgrade offer and its echo.
pub const SET_PORT_KIND: &str = "set-port";

// ============================================================================
// Control
// ============================================================================

/// The fixed control vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    /// Readiness announcement.
    ///
    /// An announcement (`ack == false`) must be answered with an ack.
    /// Acks are never answered.
    Ready {
        /// Whether this answers an earlier announcement.
        ack: bool,
    },

    /// Port upgrade offer (over the bus) or acknowledgement (over the port).
    SetPort,
}

impl Control {
    /// Returns `true` if `kind` is reserved for control messages.
    #[inline]
    #[must_use]
    pub fn is_reserved(kind: &str) -> bool {
        kind == READY_KIND || kind == SET_PORT_KIND
    }

    /// Reads a control message from its wire value.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        match value.get("kind").and_then(Value::as_str)? {
            READY_KIND => Some(Self::Ready {
                ack: value.get("ack").and_then(Value::as_bool).unwrap_or(false),
            }),
            SET_PORT_KIND => Some(Self::SetPort),
            _ => None,
        }
    }

    /// Renders the wire value, tagged with `frame_id` when given.
    #[must_use]
    pub fn to_value(self, frame_id: Option<&FrameId>) -> Value {
        let mut map = Map::new();
        match self {
            Self::Ready { ack } => {
                map.insert("kind".into(), READY_KIND.into());
                if ack {
                    map.insert("ack".into(), true.into());
                }
            }
            Self::SetPort => {
                map.insert("kind".into(), SET_PORT_KIND.into());
            }
        }
        if let Some(frame_id) = frame_id {
            map.insert("frameId".into(), frame_id.as_str().into());
        }
        Value::Object(map)
    }
}

// ============================================================================
// Tests
// ============================================================================
