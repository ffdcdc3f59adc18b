//! Response message type.
//!
//! A response has no `kind`; it is matched to its request by `id` alone.

// ============================================================================
// Imports
// ============================================================================

use std::result::Result as StdResult;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::identifiers::{FrameId, RequestId};

use super::Envelope;

// ============================================================================
// Types
// ============================================================================

/// Local answer to an inbound request: result fields, or an error value.
pub type Outcome = StdResult<Map<String, Value>, Value>;

// ============================================================================
// Response
// ============================================================================

/// A response to a correlated request.
///
/// # Format
///
/// Success:
/// ```json
/// { "id": "0", "success": true, "value": 42 }
/// ```
///
/// Failure:
/// ```json
/// { "id": "0", "success": false, "error": "boom" }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Matches the request `id`.
    pub id: RequestId,

    /// Whether the remote side completed the request.
    pub success: bool,

    /// Error value (failure only, optional).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,

    /// Frame identity, attached while travelling over a shared bus.
    #[serde(
        rename = "frameId",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub frame_id: Option<FrameId>,

    /// Result fields.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Response {
    /// Creates a success response carrying `fields`.
    #[inline]
    #[must_use]
    pub fn success(id: RequestId, fields: Map<String, Value>) -> Self {
        Self {
            id,
            success: true,
            error: None,
            frame_id: None,
            fields,
        }
    }

    /// Creates a failure response.
    #[inline]
    #[must_use]
    pub fn failure(id: RequestId, error: Option<Value>) -> Self {
        Self {
            id,
            success: false,
            error,
            frame_id: None,
            fields: Map::new(),
        }
    }

    /// Builds the answer to `request`.
    ///
    /// Returns `None` when the request did not ask for a response.
    #[must_use]
    pub fn answering(request: &Envelope, outcome: Outcome) -> Option<Self> {
        if !request.wants_response() {
            return None;
        }
        let id = request.id.clone()?;
        Some(match outcome {
            Ok(fields) => Self::success(id, fields),
            Err(error) => Self::failure(id, Some(error)),
        })
    }

    /// Converts into the caller-facing outcome.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Remote`] or [`Error::RemoteFailure`] when
    /// `success` is `false`.
    pub fn into_result(self) -> Result<Self> {
        if self.success {
            Ok(self)
        } else {
            Err(Error::remote(self.error))
        }
    }

    /// Gets a result field.
    #[inline]
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Gets a string value from the result.
    ///
    /// Returns empty string if key not found or not a string.
    #[inline]
    #[must_use]
    pub fn get_string(&self, key: &str) -> String {
        self.fields
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    }

    /// Gets a u64 value from the result.
    ///
    /// Returns 0 if key not found or not a number.
    #[inline]
    #[must_use]
    pub fn get_u64(&self, key: &str) -> u64 {
        self.fields
            .get(key)
            .and_then(Value::as_u64)
            .unwrap_or_default()
    }

    /// Gets a boolean value from the result.
    ///
    /// Returns false if key not found or not a boolean.
    #[inline]
    #[must_use]
    pub fn get_bool(&self, key: &str) -> bool {
        self.fields
            .get(key)
            .and_then(Value::as_bool)
            .unwrap_or_default()
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
    fn test_success_response() {
        let response: Response =
            serde_json::from_value(json!({ "id": "0", "success": true, "value": 42 }))
                .expect("parse");

        assert!(response.success);
        assert_eq!(response.get("value"), Some(&json!(42)));
        assert_eq!(response.get_u64("value"), 42);
    }

    #[test]
    fn test_failure_into_result() {
        let response: Response =
            serde_json::from_value(json!({ "id": "1", "success": false, "error": "boom" }))
                .expect("parse");

        let err = response.into_result().expect_err("failure");
        assert!(matches!(err, Error::Remote { ref message, .. } if message == "boom"));
    }

    #[test]
    fn test_failure_without_error() {
        let response = Response::failure(RequestId::from("2"), None);
        assert!(matches!(response.into_result(), Err(Error::RemoteFailure)));
    }

    #[test]
    fn test_success_serialization() {
        let mut fields = Map::new();
        fields.insert("python".into(), json!("print(1)"));
        let value = serde_json::to_value(Response::success(RequestId::from("5"), fields))
            .expect("serialize");

        assert_eq!(value, json!({ "id": "5", "success": true, "python": "print(1)" }));
    }

    #[test]
    fn test_answering_request() {
        let mut request = Envelope::new("compile");
        request.id = Some(RequestId::from("3"));
        request.response = true;

        let mut fields = Map::new();
        fields.insert("binary".into(), json!("hex"));
        let ok = Response::answering(&request, Ok(fields)).expect("answer");
        assert!(ok.success);
        assert_eq!(ok.id.as_str(), "3");

        let failed = Response::answering(&request, Err(json!("boom"))).expect("answer");
        assert_eq!(failed.error, Some(json!("boom")));
    }

    #[test]
    fn test_answering_notification() {
        let notification = Envelope::new("simevent");
        assert!(Response::answering(&notification, Ok(Map::new())).is_none());
    }

    #[test]
    fn test_get_helpers_defaults() {
        let response = Response::success(RequestId::from("0"), Map::new());
        assert_eq!(response.get_string("missing"), "");
        assert_eq!(response.get_u64("missing"), 0);
        assert!(!response.get_bool("missing"));
    }
}
