//! Classification of inbound wire values.
//!
//! This is the single place where an untyped message is turned into one of
//! the three shapes the link knows how to route.

// ============================================================================
// Imports
// ============================================================================

use serde_json::{Value, from_value};

use crate::error::{Error, Result};

use super::{Control, Envelope, Response};

// ============================================================================
// Inbound
// ============================================================================

/// A classified inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// Handshake control message.
    Control(Control),
    /// Kindless message carrying an `id`; a response candidate.
    Response(Response),
    /// Any other message with a `kind`.
    Event(Envelope),
}

impl Inbound {
    /// Classifies a wire value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] for non-objects and [`Error::Json`] when
    /// the value has the wrong shape for its class.
    pub fn classify(value: Value) -> Result<Self> {
        if !value.is_object() {
            return Err(Error::protocol("message is not an object"));
        }

        if let Some(control) = Control::from_value(&value) {
            return Ok(Self::Control(control));
        }

        if value.get("kind").is_some() {
            Ok(Self::Event(from_value(value)?))
        } else {
            Ok(Self::Response(from_value(value)?))
        }
    }
}

/// Returns the `frameId` field of a wire value, if present.
#[inline]
#[must_use]
pub fn frame_id_of(value: &Value) -> Option<&str> {
    value.get("frameId").and_then(Value::as_str)
}

// ============================================================================
// Tests
// ============================================================================
