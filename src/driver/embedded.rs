//! Embedded side of a link.
//!
//! Runs inside the embedded context. Announces readiness on start, answers
//! every later readiness query from the host, and adopts the port the host
//! offers.

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

use super::builder::EmbeddedClientBuilder;
use super::frame::FrameHandle;

// ============================================================================
// EmbeddedClient
// ============================================================================

/// Embedded-side handle to the host.
///
/// Mirrors [`Driver`](crate::Driver), except that it never initiates a
/// port upgrade.
///
/// An unscoped client only adopts port offers carrying no frame id. Clients
/// sharing a bus with scoped drivers should be scoped themselves.
#[derive(Clone)]
pub struct EmbeddedClient {
    link: Link,
    location: Arc<FrameHandle>,
}

impl EmbeddedClient {
    /// Creates a builder for a client on `bus`.
    #[inline]
    #[must_use]
    pub fn builder(bus: &Bus) -> EmbeddedClientBuilder {
        EmbeddedClientBuilder::new(bus)
    }

    pub(crate) fn new(link: Link, location: FrameHandle) -> Self {
        Self {
            link,
            location: Arc::new(location),
        }
    }

    /// Returns this context's own address and frame id.
    #[inline]
    #[must_use]
    pub fn location(&self) -> &FrameHandle {
        &self.location
    }

    /// Returns the frame id this client is scoped to, if any.
    #[inline]
    #[must_use]
    pub fn frame_id(&self) -> Option<&FrameId> {
        self.location.frame_id()
    }

    /// See [`Driver::send_request`](crate::Driver::send_request).
    pub fn send_request(&self, envelope: Envelope) -> Result<ResponseFuture> {
        self.link.send_request(envelope)
    }

    /// See [`Driver::post_message`](crate::Driver::post_message).
    pub fn post_message(&self, envelope: Envelope) -> Result<()> {
        self.link.post_message(envelope)
    }

    /// Answers a request received from the host.
    pub fn respond(&self, request: &Envelope, outcome: Outcome) -> Result<bool> {
        self.link.respond(request, outcome)
    }

    /// Registers a listener for an event kind, `"message"` or `"sent"`.
    #[inline]
    pub fn on(&self, event: impl Into<String>, listener: Listener) {
        self.link.on(event, listener);
    }

    /// Removes one registration of `listener`. Returns `false` if absent.
    #[inline]
    pub fn off(&self, event: &str, listener: &Listener) -> bool {
        self.link.off(event, listener)
    }

    /// Returns the number of listeners registered for `event`.
    #[inline]
    #[must_use]
    pub fn listener_count(&self, event: &str) -> usize {
        self.link.listener_count(event)
    }

    /// Returns the current channel state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> ChannelState {
        self.link.state()
    }

    /// Waits until the link is ready and returns the active transport.
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

    /// Stops the client. Returns `false` if already disposed.
    pub fn dispose(&self) -> bool {
        self.link.dispose()
    }

    /// Returns `true` once [`dispose`](Self::dispose) has been called.
    #[inline]
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.link.is_disposed()
    }
}

impl fmt::Debug for EmbeddedClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmbeddedClient")
            .field("location", &self.location)
            .field("link", &self.link)
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use serde_json::json;
    use tokio::time::timeout;

    use crate::Driver;
    use crate::transport::{BroadcastTransport, Transport};

    const WAIT: Duration = Duration::from_secs(2);

    #[tokio::test]
    async fn test_announces_with_frame_id() {
        let bus = Bus::new();
        let mut spy = BroadcastTransport::new(&bus).listen();
        let client = EmbeddedClient::builder(&bus)
            .location("https://sim.example/?frameid=a")
            .spawn()
            .expect("client");

        let packet = spy.try_recv().expect("announcement");
        assert_eq!(packet.data, json!({ "kind": "ready", "frameId": "a" }));
        assert_eq!(client.frame_id().map(FrameId::as_str), Some("a"));
        assert_eq!(client.state(), ChannelState::AwaitingReady);
    }

    #[tokio::test]
    async fn test_requests_to_host() {
        let bus = Bus::new();
        let client = EmbeddedClient::builder(&bus).spawn().expect("client");
        let driver = Driver::builder(&bus).spawn().expect("driver");

        let responder = driver.clone();
        driver.on(
            "fetch",
            crate::listener(move |request| {
                let mut fields = serde_json::Map::new();
                fields.insert("text".into(), json!("hi"));
                responder.respond(request, Ok(fields)).expect("respond");
            }),
        );

        let future = client.send_request(Envelope::new("fetch")).expect("send");
        let response = timeout(WAIT, future).await.expect("timely").expect("response");
        assert_eq!(response.get_string("text"), "hi");
    }

    #[tokio::test]
    async fn test_ignores_offer_once_upgraded() {
        let bus = Bus::new();
        let host = BroadcastTransport::new(&bus);
        let client = EmbeddedClient::builder(&bus).spawn().expect("client");

        let (offered, kept) = crate::transport::Port::pair();
        let (_, mut host_rx) = kept.split();
        host.post_with_transfer(json!({ "kind": "set-port" }), offered);

        let echo = timeout(WAIT, host_rx.recv()).await.expect("timely");
        assert_eq!(echo, Some(json!({ "kind": "set-port" })));
        assert_eq!(client.state(), ChannelState::Ready(TransportKind::Port));

        // A second offer is never adopted; its port stays untaken.
        let (second, _keep) = crate::transport::Port::pair();
        host.post(json!({ "kind": "ready" }));
        host.post_with_transfer(json!({ "kind": "set-port" }), second);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(client.state(), ChannelState::Ready(TransportKind::Port));
    }

    #[tokio::test]
    async fn test_unscoped_client_leaves_scoped_offer() {
        let bus = Bus::new();
        let bystander = EmbeddedClient::builder(&bus).spawn().expect("bystander");
        let client = EmbeddedClient::builder(&bus).frame_id("a").spawn().expect("client");
        let driver = Driver::builder(&bus).frame_id("a").spawn().expect("driver");

        let ready = timeout(WAIT, driver.wait_ready()).await.expect("timely");
        assert_eq!(ready.expect("ready"), TransportKind::Port);
        assert_eq!(client.state(), ChannelState::Ready(TransportKind::Port));
        assert_ne!(bystander.state(), ChannelState::Ready(TransportKind::Port));
    }
}
