//! Synchronous link state.
//!
//! [`LinkCore`] owns every piece of per-link state and is driven from two
//! directions: public calls on the handles, and inbound packets from the
//! pump. Its methods never call user code; anything a listener must see is
//! returned as [`Effects`] and delivered after the core lock is released.

// ============================================================================
// Imports
// ============================================================================

use regex::Regex;
use serde_json::Value;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, trace, warn};

use crate::error::{Error, Result};
use crate::protocol::{Control, Envelope, Inbound, Outcome, Response, frame_id_of};
use crate::transport::{
    BroadcastTransport, Bus, BusListener, Port, PortSender, TransferSlot, Transport,
    TransportKind,
};

use super::LinkConfig;
use super::correlator::{RequestCorrelator, ResponseFuture};
use super::dispatcher::{ANY_MESSAGE_EVENT, MESSAGE_SENT_EVENT};
use super::handshake::{ChannelState, Handshake, ReadyStep, Role, UpgradeRequest};
use super::pump::PumpCommand;
use super::queue::{Outbound, OutboundQueue};
use super::scope::FrameScope;

// ============================================================================
// Effects
// ============================================================================

/// Listener invocations produced while the core was locked.
#[derive(Debug, Default)]
#[must_use = "effects must be delivered to the dispatcher"]
pub(crate) struct Effects {
    /// Event name and payload, in delivery order.
    pub(crate) events: Vec<(String, Envelope)>,
}

impl Effects {
    fn emit(&mut self, event: &str, envelope: Envelope) {
        self.events.push((event.to_string(), envelope));
    }
}

// ============================================================================
// LinkCore
// ============================================================================

/// State of one end of a link.
pub(crate) struct LinkCore {
    role: Role,
    broadcast: BroadcastTransport,
    /// `false` once the link stopped listening on the bus.
    on_bus: bool,
    /// Active point-to-point transport.
    port: Option<PortSender>,
    /// Offered port, waiting for the echo.
    pending_port: Option<PortSender>,
    handshake: Handshake,
    scope: FrameScope,
    queue: OutboundQueue,
    correlator: RequestCorrelator,
    kind_filter: Option<Regex>,
    pump: mpsc::UnboundedSender<PumpCommand>,
    state_tx: Option<watch::Sender<ChannelState>>,
    disposed: bool,
}

impl LinkCore {
    /// Creates the core. Nothing is sent until [`start`](Self::start).
    pub(crate) fn new(
        role: Role,
        bus: &Bus,
        config: LinkConfig,
        pump: mpsc::UnboundedSender<PumpCommand>,
        state_tx: watch::Sender<ChannelState>,
    ) -> Self {
        let auto_upgrade = config.upgrade && config.frame_id.is_some();

        Self {
            role,
            broadcast: BroadcastTransport::new(bus),
            on_bus: true,
            port: None,
            pending_port: None,
            handshake: Handshake::new(role, auto_upgrade),
            scope: FrameScope::new(config.frame_id),
            queue: OutboundQueue::default(),
            correlator: RequestCorrelator::default(),
            kind_filter: config.kind_filter,
            pump,
            state_tx: Some(state_tx),
            disposed: false,
        }
    }

    /// Subscribes to the bus. Call before [`start`](Self::start) so the
    /// remote side's answer is not missed.
    pub(crate) fn listen(&self) -> BusListener {
        self.broadcast.listen()
    }

    /// Sends the initial `ready` announcement.
    pub(crate) fn start(&mut self) {
        if let Some(control) = self.handshake.start() {
            debug!(role = %self.role, origin = %self.broadcast.origin(), "Link starting");
            self.send_control(control);
            self.publish();
        }
    }

    // ========================================================================
    // Outbound
    // ========================================================================

    /// Sends a notification, queueing it until the channel is ready.
    pub(crate) fn post_message(&mut self, envelope: Envelope) -> Result<Effects> {
        self.ensure_live()?;
        ensure_application_kind(&envelope.kind)?;
        Ok(self.enqueue(Outbound::Message(envelope)))
    }

    /// Issues a correlated request, queueing it until the channel is ready.
    pub(crate) fn send_request(
        &mut self,
        mut envelope: Envelope,
    ) -> Result<(ResponseFuture, Effects)> {
        self.ensure_live()?;
        ensure_application_kind(&envelope.kind)?;

        let future = self.correlator.issue(&mut envelope);
        let effects = self.enqueue(Outbound::Message(envelope));
        Ok((future, effects))
    }

    /// Answers an inbound request. Returns `false` if it asked for no answer.
    pub(crate) fn respond(&mut self, request: &Envelope, outcome: Outcome) -> Result<bool> {
        self.ensure_live()?;

        let Some(response) = Response::answering(request, outcome) else {
            trace!(kind = %request.kind, "Request did not ask for a response");
            return Ok(false);
        };

        // Replies produce no events.
        let _ = self.enqueue(Outbound::Reply(response));
        Ok(true)
    }

    /// Requests the port upgrade. Returns `false` if one was already
    /// requested, is in progress, or is done.
    pub(crate) fn upgrade(&mut self) -> Result<bool> {
        self.ensure_live()?;

        match self.handshake.request_upgrade() {
            UpgradeRequest::Initiate => {
                self.offer_port();
                Ok(true)
            }
            UpgradeRequest::Deferred => {
                debug!("Upgrade deferred until the remote side is ready");
                Ok(true)
            }
            UpgradeRequest::Ignored => Ok(false),
        }
    }

    fn enqueue(&mut self, item: Outbound) -> Effects {
        self.queue.push(item);
        let mut effects = Effects::default();
        self.flush(&mut effects);
        effects
    }

    /// Drains the queue into the active transport once ready. Held while a
    /// port offer is outstanding.
    fn flush(&mut self, effects: &mut Effects) {
        if !self.handshake.can_deliver() {
            return;
        }

        let mut drained = Vec::with_capacity(self.queue.len());
        let count = self.queue.flush(|item| drained.push(item));
        for item in drained {
            self.transmit(item, effects);
        }

        if count > 1 {
            debug!(count, "Outbound queue flushed");
        }
    }

    fn transmit(&self, mut item: Outbound, effects: &mut Effects) {
        // Port traffic needs no frame tag.
        let frame_id = match &self.port {
            Some(_) => None,
            None => self.scope.frame_id().cloned(),
        };
        item.set_frame_id(frame_id);

        let data = match item.to_value() {
            Ok(data) => data,
            Err(e) => {
                warn!(error = %e, "Outbound message dropped, serialization failed");
                return;
            }
        };

        match &self.port {
            Some(port) => port.post(data),
            None => self.broadcast.post(data),
        }

        if let Outbound::Message(envelope) = item {
            trace!(kind = %envelope.kind, "Message sent");
            effects.emit(MESSAGE_SENT_EVENT, envelope);
        }
    }

    fn send_control(&self, control: Control) {
        trace!(?control, "Control sent");
        self.broadcast
            .post(control.to_value(self.scope.frame_id()));
    }

    // ========================================================================
    // Inbound
    // ========================================================================

    /// Routes one inbound message.
    pub(crate) fn handle_inbound(
        &mut self,
        data: Value,
        via: TransportKind,
        transfer: Option<TransferSlot>,
    ) -> Effects {
        let mut effects = Effects::default();
        if self.disposed {
            return effects;
        }

        if via == TransportKind::Broadcast {
            if !self.on_bus {
                trace!("Bus packet after leaving the bus dropped");
                return effects;
            }
            if !self.scope.admits(&data) {
                trace!("Out-of-scope packet dropped");
                return effects;
            }
        }

        let tagged = frame_id_of(&data).is_some();
        let inbound = match Inbound::classify(data) {
            Ok(inbound) => inbound,
            Err(e) => {
                trace!(error = %e, "Malformed message dropped");
                return effects;
            }
        };

        match inbound {
            Inbound::Control(Control::Ready { ack }) => {
                if via == TransportKind::Broadcast {
                    self.on_ready(ack, &mut effects);
                }
            }
            Inbound::Control(Control::SetPort) => {
                self.on_set_port(via, tagged, transfer, &mut effects);
            }
            Inbound::Response(response) => {
                self.correlator.resolve(response);
            }
            Inbound::Event(envelope) => {
                if let Some(filter) = &self.kind_filter
                    && !filter.is_match(&envelope.kind)
                {
                    trace!(kind = %envelope.kind, "Event kind not accepted");
                    return effects;
                }
                effects.emit(&envelope.kind, envelope.clone());
                effects.emit(ANY_MESSAGE_EVENT, envelope);
            }
        }

        effects
    }

    fn on_ready(&mut self, ack: bool, effects: &mut Effects) {
        match self.handshake.on_ready(ack) {
            ReadyStep::Ready { reply } => {
                if reply {
                    self.send_control(Control::Ready { ack: true });
                }
                info!(role = %self.role, transport = %TransportKind::Broadcast, "Link ready");
                self.publish();
                self.flush(effects);
            }
            ReadyStep::Upgrade => self.offer_port(),
            ReadyStep::Reconfirm => {
                debug!("Remote side reloaded, confirming readiness");
                self.send_control(Control::Ready { ack: true });
            }
            ReadyStep::Reoffer => {
                debug!("Remote side reloaded, replacing its port");
                if let Some(mut port) = self.port.take() {
                    port.close();
                }
                self.offer_port();
            }
            ReadyStep::Ignore => trace!(ack, "Ready ignored"),
        }
    }

    fn offer_port(&mut self) {
        let (local, remote) = Port::pair();
        let (sender, receiver) = local.split();

        self.pending_port = Some(sender);
        self.command(PumpCommand::ListenPort(receiver));
        self.broadcast
            .post_with_transfer(Control::SetPort.to_value(self.scope.frame_id()), remote);
        self.publish();

        debug!("Port offered");
    }

    /// Handles a port offer (bus) or the echo of our own offer (port).
    ///
    /// An unscoped link leaves offers tagged for a frame to the scoped link
    /// they were meant for.
    fn on_set_port(
        &mut self,
        via: TransportKind,
        tagged: bool,
        transfer: Option<TransferSlot>,
        effects: &mut Effects,
    ) {
        match via {
            TransportKind::Broadcast => {
                if !self.handshake.accepts_offer() {
                    trace!("Port offer ignored");
                    return;
                }
                if tagged && !self.scope.is_active() {
                    trace!("Port offer for a scoped frame ignored");
                    return;
                }
                let Some(port) = transfer.as_ref().and_then(TransferSlot::take) else {
                    debug!("Port offer without a port ignored");
                    return;
                };

                let (sender, receiver) = port.split();
                sender.post(Control::SetPort.to_value(None));
                self.port = Some(sender);
                self.command(PumpCommand::ListenPort(receiver));
                self.handshake.adopt();
                self.leave_bus();
            }
            TransportKind::Port => {
                if !self.handshake.on_port_ack() {
                    trace!("Port echo ignored");
                    return;
                }
                // Still listening on the bus, in scope, for reloads.
                self.port = self.pending_port.take();
            }
        }

        info!(role = %self.role, transport = %TransportKind::Port, "Link ready");
        self.publish();
        self.flush(effects);
    }

    fn leave_bus(&mut self) {
        self.on_bus = false;
        self.scope.clear();
        self.command(PumpCommand::LeaveBus);
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Stops the link. Returns `false` if it was already disposed.
    ///
    /// Pending requests are left unresolved.
    pub(crate) fn dispose(&mut self) -> bool {
        if self.disposed {
            return false;
        }
        self.disposed = true;
        self.on_bus = false;

        if let Some(port) = &mut self.port {
            port.close();
        }
        if let Some(port) = &mut self.pending_port {
            port.close();
        }
        self.command(PumpCommand::Shutdown);
        // Wakes `wait_ready` callers.
        self.state_tx = None;

        info!(
            role = %self.role,
            pending = self.correlator.len(),
            queued = self.queue.len(),
            "Link disposed"
        );
        true
    }

    #[inline]
    pub(crate) fn is_disposed(&self) -> bool {
        self.disposed
    }

    #[inline]
    pub(crate) fn state(&self) -> ChannelState {
        self.handshake.state()
    }

    #[inline]
    pub(crate) fn pending_count(&self) -> usize {
        self.correlator.len()
    }

    #[inline]
    pub(crate) fn queued_count(&self) -> usize {
        self.queue.len()
    }

    fn ensure_live(&self) -> Result<()> {
        if self.disposed {
            Err(Error::Disposed)
        } else {
            Ok(())
        }
    }

    fn publish(&self) {
        if let Some(state_tx) = &self.state_tx {
            state_tx.send_replace(self.handshake.state());
        }
    }

    fn command(&self, command: PumpCommand) {
        if self.pump.send(command).is_err() {
            trace!("Link pump already stopped");
        }
    }
}

fn ensure_application_kind(kind: &str) -> Result<()> {
    if Control::is_reserved(kind) {
        return Err(Error::protocol(format!(
            "kind `{kind}` is reserved for the handshake"
        )));
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    use crate::identifiers::FrameId;

    struct Fixture {
        core: LinkCore,
        peer: BusListener,
        commands: mpsc::UnboundedReceiver<PumpCommand>,
        state_rx: watch::Receiver<ChannelState>,
    }

    fn fixture(role: Role, config: LinkConfig) -> Fixture {
        let bus = Bus::new();
        let peer = BroadcastTransport::new(&bus).listen();
        let (pump, commands) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ChannelState::Uninitialized);

        let mut core = LinkCore::new(role, &bus, config, pump, state_tx);
        core.start();

        Fixture {
            core,
            peer,
            commands,
            state_rx,
        }
    }

    fn unscoped() -> LinkConfig {
        LinkConfig::default()
    }

    fn scoped(frame_id: &str) -> LinkConfig {
        LinkConfig {
            frame_id: FrameId::new(frame_id),
            upgrade: true,
            kind_filter: None,
        }
    }

    fn drain(peer: &mut BusListener) -> Vec<Value> {
        std::iter::from_fn(|| peer.try_recv().map(|packet| packet.data)).collect()
    }

    fn event_names(effects: &Effects) -> Vec<&str> {
        effects.events.iter().map(|(name, _)| name.as_str()).collect()
    }

    #[test]
    fn test_start_announces_ready() {
        let mut f = fixture(Role::Embedded, unscoped());
        assert_eq!(drain(&mut f.peer), vec![json!({ "kind": "ready" })]);
        assert_eq!(*f.state_rx.borrow(), ChannelState::AwaitingReady);
    }

    #[test]
    fn test_ping_is_queued_then_flushed() {
        let mut f = fixture(Role::Host, unscoped());
        drain(&mut f.peer);

        let (future, effects) = f.core.send_request(Envelope::new("ping")).expect("send");
        assert_eq!(future.id().as_str(), "0");
        assert!(effects.events.is_empty());
        assert_eq!(f.core.queued_count(), 1);
        assert!(drain(&mut f.peer).is_empty());

        let effects = f
            .core
            .handle_inbound(json!({ "kind": "ready" }), TransportKind::Broadcast, None);

        assert_eq!(event_names(&effects), vec![MESSAGE_SENT_EVENT]);
        assert_eq!(f.core.queued_count(), 0);
        assert_eq!(
            drain(&mut f.peer),
            vec![
                json!({ "kind": "ready", "ack": true }),
                json!({ "kind": "ping", "id": "0", "response": true }),
            ]
        );
        assert_eq!(
            *f.state_rx.borrow(),
            ChannelState::Ready(TransportKind::Broadcast)
        );
    }

    #[test]
    fn test_reload_reconfirms_without_reflush() {
        let mut f = fixture(Role::Host, unscoped());
        let _ = f
            .core
            .handle_inbound(json!({ "kind": "ready" }), TransportKind::Broadcast, None);
        let _ = f.core.post_message(Envelope::new("hello")).expect("post");
        drain(&mut f.peer);

        let effects = f
            .core
            .handle_inbound(json!({ "kind": "ready" }), TransportKind::Broadcast, None);

        assert!(effects.events.is_empty());
        assert_eq!(
            drain(&mut f.peer),
            vec![json!({ "kind": "ready", "ack": true })]
        );
    }

    #[test]
    fn test_event_routing_dispatches_kind_then_message() {
        let mut f = fixture(Role::Embedded, unscoped());
        let effects = f.core.handle_inbound(
            json!({ "kind": "simevent", "payload": 1 }),
            TransportKind::Broadcast,
            None,
        );
        assert_eq!(event_names(&effects), vec!["simevent", ANY_MESSAGE_EVENT]);
    }

    #[test]
    fn test_scope_drops_foreign_and_untagged_packets() {
        let mut f = fixture(Role::Embedded, scoped("b"));

        for data in [
            json!({ "kind": "simevent", "frameId": "a" }),
            json!({ "kind": "simevent" }),
        ] {
            let effects = f.core.handle_inbound(data, TransportKind::Broadcast, None);
            assert!(effects.events.is_empty());
        }

        let effects = f.core.handle_inbound(
            json!({ "kind": "simevent", "frameId": "b" }),
            TransportKind::Broadcast,
            None,
        );
        assert_eq!(effects.events.len(), 2);
    }

    #[test]
    fn test_kind_filter_drops_unaccepted_events() {
        let config = LinkConfig {
            kind_filter: Some(Regex::new("^sim").expect("regex")),
            ..LinkConfig::default()
        };
        let mut f = fixture(Role::Embedded, config);

        let dropped =
            f.core
                .handle_inbound(json!({ "kind": "other" }), TransportKind::Broadcast, None);
        assert!(dropped.events.is_empty());

        let kept =
            f.core
                .handle_inbound(json!({ "kind": "simevent" }), TransportKind::Broadcast, None);
        assert_eq!(kept.events.len(), 2);
    }

    #[test]
    fn test_noise_is_dropped() {
        let mut f = fixture(Role::Embedded, unscoped());
        for data in [
            json!("not an object"),
            json!({ "success": true }),
            json!({ "id": "77", "success": true }),
        ] {
            let effects = f.core.handle_inbound(data, TransportKind::Broadcast, None);
            assert!(effects.events.is_empty());
        }
        assert_eq!(f.core.state(), ChannelState::AwaitingReady);
    }

    #[test]
    fn test_reserved_kinds_rejected() {
        let mut f = fixture(Role::Host, unscoped());
        assert!(f.core.post_message(Envelope::new("ready")).is_err());
        assert!(f.core.send_request(Envelope::new("set-port")).is_err());
        assert_eq!(f.core.pending_count(), 0);
    }

    #[test]
    fn test_respond_tags_reply_with_scope() {
        let mut f = fixture(Role::Embedded, scoped("a"));
        let _ = f.core.handle_inbound(
            json!({ "kind": "ready", "ack": true, "frameId": "a" }),
            TransportKind::Broadcast,
            None,
        );
        drain(&mut f.peer);

        let request: Envelope = serde_json::from_value(
            json!({ "kind": "compile", "id": "4", "response": true }),
        )
        .expect("request");
        assert!(f.core.respond(&request, Err(json!("boom"))).expect("respond"));
        assert!(!f.core.respond(&Envelope::new("simevent"), Ok(Default::default())).expect("respond"));

        assert_eq!(
            drain(&mut f.peer),
            vec![json!({ "id": "4", "success": false, "error": "boom", "frameId": "a" })]
        );
    }

    #[test]
    fn test_embedded_adopts_offered_port() {
        let mut f = fixture(Role::Embedded, scoped("a"));
        let _ = f.core.post_message(Envelope::new("hello")).expect("post");

        let (offered, kept) = Port::pair();
        let (_, mut host_rx) = kept.split();
        let slot = TransferSlot::new(offered);

        let effects = f.core.handle_inbound(
            json!({ "kind": "set-port", "frameId": "a" }),
            TransportKind::Broadcast,
            Some(slot.clone()),
        );

        assert_eq!(event_names(&effects), vec![MESSAGE_SENT_EVENT]);
        assert_eq!(f.core.state(), ChannelState::Ready(TransportKind::Port));
        assert_eq!(host_rx.try_recv(), Some(json!({ "kind": "set-port" })));
        assert_eq!(host_rx.try_recv(), Some(json!({ "kind": "hello" })));

        assert!(matches!(f.commands.try_recv(), Ok(PumpCommand::ListenPort(_))));
        assert!(matches!(f.commands.try_recv(), Ok(PumpCommand::LeaveBus)));

        // Bus traffic is ignored once on the port.
        let late = f.core.handle_inbound(
            json!({ "kind": "simevent", "frameId": "a" }),
            TransportKind::Broadcast,
            None,
        );
        assert!(late.events.is_empty());
    }

    #[test]
    fn test_host_upgrade_completes_on_echo() {
        let mut f = fixture(Role::Host, scoped("a"));
        drain(&mut f.peer);

        let _ = f.core.handle_inbound(
            json!({ "kind": "ready", "frameId": "a" }),
            TransportKind::Broadcast,
            None,
        );
        assert_eq!(f.core.state(), ChannelState::AwaitingPortAck);

        let offer = f.peer.try_recv().expect("offer");
        assert_eq!(offer.data, json!({ "kind": "set-port", "frameId": "a" }));
        assert!(offer.transfer.is_some());

        // Held during the upgrade window.
        let _ = f.core.post_message(Envelope::new("hello")).expect("post");
        assert_eq!(f.core.queued_count(), 1);

        let effects =
            f.core
                .handle_inbound(json!({ "kind": "set-port" }), TransportKind::Port, None);
        assert_eq!(event_names(&effects), vec![MESSAGE_SENT_EVENT]);
        assert_eq!(f.core.state(), ChannelState::Ready(TransportKind::Port));
        assert!(!f.core.upgrade().expect("upgrade"));
    }

    #[test]
    fn test_host_replaces_port_after_reload() {
        let mut f = fixture(Role::Host, scoped("a"));
        let _ = f.core.handle_inbound(
            json!({ "kind": "ready", "frameId": "a" }),
            TransportKind::Broadcast,
            None,
        );
        let _ = f
            .core
            .handle_inbound(json!({ "kind": "set-port" }), TransportKind::Port, None);
        let _ = f.core.post_message(Envelope::new("hello")).expect("post");
        drain(&mut f.peer);

        // The host never leaves the bus.
        assert!(matches!(f.commands.try_recv(), Ok(PumpCommand::ListenPort(_))));
        assert!(f.commands.try_recv().is_err());

        let effects = f.core.handle_inbound(
            json!({ "kind": "ready", "frameId": "a" }),
            TransportKind::Broadcast,
            None,
        );
        assert!(effects.events.is_empty());
        assert_eq!(f.core.state(), ChannelState::Ready(TransportKind::Port));

        let offer = f.peer.try_recv().expect("offer");
        assert_eq!(offer.data, json!({ "kind": "set-port", "frameId": "a" }));
        let (_, mut fresh_rx) = offer
            .transfer
            .as_ref()
            .and_then(TransferSlot::take)
            .expect("port")
            .split();
        assert!(matches!(f.commands.try_recv(), Ok(PumpCommand::ListenPort(_))));

        // Held until the fresh port is confirmed.
        let _ = f.core.post_message(Envelope::new("again")).expect("post");
        assert_eq!(f.core.queued_count(), 1);

        let effects =
            f.core
                .handle_inbound(json!({ "kind": "set-port" }), TransportKind::Port, None);
        assert_eq!(event_names(&effects), vec![MESSAGE_SENT_EVENT]);
        assert_eq!(fresh_rx.try_recv(), Some(json!({ "kind": "again" })));
        assert_eq!(fresh_rx.try_recv(), None);
        assert!(drain(&mut f.peer).is_empty());
    }

    #[test]
    fn test_explicit_upgrade_holds_traffic_while_ready() {
        let mut f = fixture(Role::Host, unscoped());
        let _ = f
            .core
            .handle_inbound(json!({ "kind": "ready", "ack": true }), TransportKind::Broadcast, None);
        drain(&mut f.peer);

        assert!(f.core.upgrade().expect("upgrade"));
        assert_eq!(*f.state_rx.borrow(), ChannelState::Ready(TransportKind::Broadcast));

        let _ = f.core.post_message(Envelope::new("hello")).expect("post");
        let offers = drain(&mut f.peer);
        assert_eq!(offers, vec![json!({ "kind": "set-port" })]);
        assert_eq!(f.core.queued_count(), 1);

        let _ = f
            .core
            .handle_inbound(json!({ "kind": "set-port" }), TransportKind::Port, None);
        assert_eq!(f.core.queued_count(), 0);
        assert_eq!(*f.state_rx.borrow(), ChannelState::Ready(TransportKind::Port));
    }

    #[test]
    fn test_unscoped_client_leaves_tagged_offers() {
        let mut f = fixture(Role::Embedded, unscoped());
        let (offered, _kept) = Port::pair();
        let slot = TransferSlot::new(offered);

        let _ = f.core.handle_inbound(
            json!({ "kind": "set-port", "frameId": "a" }),
            TransportKind::Broadcast,
            Some(slot.clone()),
        );

        assert_eq!(f.core.state(), ChannelState::AwaitingReady);
        assert!(slot.take().is_some());
    }

    #[test]
    fn test_dispose_rejects_later_calls() {
        let mut f = fixture(Role::Host, unscoped());
        let (_future, _) = f.core.send_request(Envelope::new("ping")).expect("send");

        assert!(f.core.dispose());
        assert!(!f.core.dispose());

        assert!(f.core.post_message(Envelope::new("x")).is_err_and(|e| e.is_disposed()));
        assert!(f.core.send_request(Envelope::new("x")).is_err_and(|e| e.is_disposed()));
        assert!(f.core.upgrade().is_err_and(|e| e.is_disposed()));
        assert_eq!(f.core.pending_count(), 1);
        assert!(f.state_rx.has_changed().is_err());
    }
}
