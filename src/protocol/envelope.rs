//! Application message envelope.
//!
//! Every non-response message carries a `kind`. Requests that expect an
//! answer additionally carry an `id` and `response: true`.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::identifiers::{FrameId, RequestId};

// ============================================================================
// Envelope
// ============================================================================

/// A domain message travelling in either direction.
///
/// # Format
///
/// Correlated request:
/// ```json
/// { "kind": "compile", "id": "0", "response": true, "target": "arcade" }
/// ```
///
/// Notification:
/// ```json
/// { "kind": "workspacesave", "project": { ... } }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Message kind, used as the event name on the receiving side.
    pub kind: String,

    /// Correlation id (requests only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RequestId>,

    /// Whether the sender waits for a response.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub response: bool,

    /// Frame identity, attached while travelling over a shared bus.
    #[serde(
        rename = "frameId",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub frame_id: Option<FrameId>,

    /// Kind-specific fields.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Envelope {
    /// Creates an envelope with no fields.
    #[inline]
    #[must_use]
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: None,
            response: false,
            frame_id: None,
            fields: Map::new(),
        }
    }

    /// Creates an envelope whose fields are taken from a JSON object.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if `fields` is not an object.
    pub fn with_fields(kind: impl Into<String>, fields: Value) -> Result<Self> {
        match fields {
            Value::Object(map) => Ok(Self {
                fields: map,
                ..Self::new(kind)
            }),
            other => Err(Error::protocol(format!(
                "envelope fields must be an object, got {other}"
            ))),
        }
    }

    /// Adds a single field.
    #[inline]
    #[must_use]
    pub fn field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Returns `true` if the sender expects a response.
    #[inline]
    #[must_use]
    pub fn wants_response(&self) -> bool {
        self.response && self.id.is_some()
    }

    /// Gets a field value.
    #[inline]
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Gets a string field.
    ///
    /// Returns empty string if key not found or not a string.
    #[inline]
    #[must_use]
    pub fn get_str(&self, key: &str) -> &str {
        self.fields
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    /// Serializes the envelope to its wire value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if a field fails to serialize.
    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn test_notification_omits_correlation_fields() {
        let envelope = Envelope::new("workspacesave").field("name", "blink");
        let value = envelope.to_value().expect("serialize");
        assert_eq!(value, json!({ "kind": "workspacesave", "name": "blink" }));
    }

    #[test]
    fn test_request_serialization() {
        let mut envelope = Envelope::new("ping");
        envelope.id = Some(RequestId::from_counter(0));
        envelope.response = true;
        envelope.frame_id = FrameId::new("a");

        let value = envelope.to_value().expect("serialize");
        assert_eq!(
            value,
            json!({ "kind": "ping", "id": "0", "response": true, "frameId": "a" })
        );
        assert!(envelope.wants_response());
    }

    #[test]
    fn test_parse_collects_extra_fields() {
        let envelope: Envelope = serde_json::from_value(json!({
            "kind": "simevent",
            "frameId": "x",
            "channel": "serial",
            "data": [1, 2]
        }))
        .expect("parse");

        assert_eq!(envelope.kind, "simevent");
        assert_eq!(envelope.frame_id.as_ref().map(FrameId::as_str), Some("x"));
        assert_eq!(envelope.get_str("channel"), "serial");
        assert_eq!(envelope.get("data"), Some(&json!([1, 2])));
        assert!(!envelope.wants_response());
    }

    #[test]
    fn test_with_fields_requires_object() {
        let ok = Envelope::with_fields("open", json!({ "headerId": "h1" })).expect("object");
        assert_eq!(ok.get_str("headerId"), "h1");

        assert!(Envelope::with_fields("open", json!([1])).is_err());
    }
}
