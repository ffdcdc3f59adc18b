//! Request/response correlation.
//!
//! Each outbound request that expects an answer gets a fresh id and a
//! pending entry. The first response with that id settles the entry;
//! anything after that is dropped.

// ============================================================================
// Imports
// ============================================================================

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::ready;
use rustc_hash::FxHashMap;
use tokio::sync::oneshot;
use tracing::{debug, trace};

use crate::error::Result;
use crate::identifiers::RequestId;
use crate::protocol::{Envelope, Response};

// ============================================================================
// Types
// ============================================================================

/// An issued request waiting for its response.
struct PendingRequest {
    /// Kind of the original request, for diagnostics.
    kind: String,
    /// Settles the caller's [`ResponseFuture`].
    response_tx: oneshot::Sender<Result<Response>>,
}

/// Map of request IDs to pending entries.
type PendingMap = FxHashMap<RequestId, PendingRequest>;

// ============================================================================
// ResponseFuture
// ============================================================================

/// Resolves with the remote side's answer to a request.
///
/// Settles with `Ok` on `success: true`, with [`Error::Remote`] or
/// [`Error::RemoteFailure`] on `success: false`. Stays pending if no answer
/// ever arrives; bound the wait with `tokio::time::timeout` if needed.
///
/// [`Error::Remote`]: crate::Error::Remote
/// [`Error::RemoteFailure`]: crate::Error::RemoteFailure
#[derive(Debug)]
#[must_use = "a response future does nothing unless awaited"]
pub struct ResponseFuture {
    id: RequestId,
    response_rx: oneshot::Receiver<Result<Response>>,
}

impl ResponseFuture {
    /// Returns the correlation id of the request.
    #[inline]
    #[must_use]
    pub fn id(&self) -> &RequestId {
        &self.id
    }
}

impl Future for ResponseFuture {
    type Output = Result<Response>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let outcome = ready!(Pin::new(&mut this.response_rx).poll(cx));
        Poll::Ready(outcome.map_err(Into::into).and_then(|result| result))
    }
}

// ============================================================================
// RequestCorrelator
// ============================================================================

/// Assigns request ids and settles pending requests.
#[derive(Default)]
pub(crate) struct RequestCorrelator {
    next_id: u64,
    pending: PendingMap,
}

impl RequestCorrelator {
    /// Stamps `envelope` as a correlated request and registers it.
    pub(crate) fn issue(&mut self, envelope: &mut Envelope) -> ResponseFuture {
        let id = RequestId::from_counter(self.next_id);
        self.next_id += 1;

        envelope.id = Some(id.clone());
        envelope.response = true;

        let (response_tx, response_rx) = oneshot::channel();
        self.pending.insert(
            id.clone(),
            PendingRequest {
                kind: envelope.kind.clone(),
                response_tx,
            },
        );

        trace!(%id, kind = %envelope.kind, "Request issued");

        ResponseFuture { id, response_rx }
    }

    /// Settles the pending request matching `response.id`.
    ///
    /// Returns `false` when no request is pending under that id; the
    /// response is then dropped.
    pub(crate) fn resolve(&mut self, response: Response) -> bool {
        let Some(pending) = self.pending.remove(&response.id) else {
            debug!(id = %response.id, "Response for unknown request");
            return false;
        };

        trace!(
            id = %response.id,
            kind = %pending.kind,
            success = response.success,
            "Request settled"
        );

        if pending.response_tx.send(response.into_result()).is_err() {
            trace!(kind = %pending.kind, "Caller dropped its response future");
        }
        true
    }

    /// Returns the number of pending requests.
    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.pending.len()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashSet;

    use proptest::prelude::*;
    use serde_json::json;
    use tokio_test::{assert_pending, assert_ready, task};

    use crate::error::Error;

    fn response(value: serde_json::Value) -> Response {
        serde_json::from_value(value).expect("response")
    }

    #[test]
    fn test_issue_stamps_envelope() {
        let mut correlator = RequestCorrelator::default();
        let mut envelope = Envelope::new("ping");

        let future = correlator.issue(&mut envelope);

        assert_eq!(future.id().as_str(), "0");
        assert_eq!(envelope.id.as_ref().map(RequestId::as_str), Some("0"));
        assert!(envelope.response);
        assert_eq!(correlator.len(), 1);
    }

    #[tokio::test]
    async fn test_resolve_success_once() {
        let mut correlator = RequestCorrelator::default();
        let future = correlator.issue(&mut Envelope::new("ping"));

        let reply = json!({ "id": "0", "success": true, "value": 42 });
        assert!(correlator.resolve(response(reply.clone())));
        assert!(!correlator.resolve(response(reply)));
        assert_eq!(correlator.len(), 0);

        let settled = future.await.expect("success");
        assert_eq!(settled.get("value"), Some(&json!(42)));
    }

    #[tokio::test]
    async fn test_resolve_failure_carries_error() {
        let mut correlator = RequestCorrelator::default();
        let future = correlator.issue(&mut Envelope::new("ping"));

        correlator.resolve(response(json!({ "id": "0", "success": false, "error": "boom" })));

        let err = future.await.expect_err("failure");
        assert!(matches!(err, Error::Remote { ref message, .. } if message == "boom"));
    }

    #[tokio::test]
    async fn test_resolve_failure_without_error() {
        let mut correlator = RequestCorrelator::default();
        let future = correlator.issue(&mut Envelope::new("ping"));

        correlator.resolve(response(json!({ "id": "0", "success": false })));

        assert!(matches!(future.await, Err(Error::RemoteFailure)));
    }

    #[test]
    fn test_unknown_response_is_dropped() {
        let mut correlator = RequestCorrelator::default();
        assert!(!correlator.resolve(response(json!({ "id": "9", "success": true }))));
    }

    #[test]
    fn test_future_never_settles_synchronously() {
        let mut correlator = RequestCorrelator::default();
        let mut future = task::spawn(correlator.issue(&mut Envelope::new("ping")));

        assert_pending!(future.poll());

        correlator.resolve(response(json!({ "id": "0", "success": true })));
        assert!(future.is_woken());
        let settled = assert_ready!(future.poll());
        assert!(settled.is_ok());
    }

    #[test]
    fn test_dropped_future_does_not_break_resolution() {
        let mut correlator = RequestCorrelator::default();
        drop(correlator.issue(&mut Envelope::new("ping")));
        assert!(correlator.resolve(response(json!({ "id": "0", "success": true }))));
    }

    proptest! {
        #[test]
        fn prop_ids_are_unique(count in 1usize..256) {
            let mut correlator = RequestCorrelator::default();
            let ids: HashSet<_> = (0..count)
                .map(|_| correlator.issue(&mut Envelope::new("x")).id().clone())
                .collect();
            prop_assert_eq!(ids.len(), count);
        }
    }
}
