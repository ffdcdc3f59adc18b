//! Outbound FIFO buffer.

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;

use serde_json::Value;

use crate::error::Result;
use crate::identifiers::FrameId;
use crate::protocol::{Envelope, Response};

// ============================================================================
// Outbound
// ============================================================================

/// A message waiting for the channel.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Outbound {
    /// Request or notification.
    Message(Envelope),
    /// Answer to a remote request.
    Reply(Response),
}

impl Outbound {
    /// Tags the message with the sender's frame id.
    pub(crate) fn set_frame_id(&mut self, frame_id: Option<FrameId>) {
        match self {
            Self::Message(envelope) => envelope.frame_id = frame_id,
            Self::Reply(response) => response.frame_id = frame_id,
        }
    }

    /// Serializes to the wire value.
    pub(crate) fn to_value(&self) -> Result<Value> {
        Ok(match self {
            Self::Message(envelope) => serde_json::to_value(envelope)?,
            Self::Reply(response) => serde_json::to_value(response)?,
        })
    }
}

// ============================================================================
// OutboundQueue
// ============================================================================

/// Buffers messages produced before the channel is ready.
#[derive(Debug, Default)]
pub(crate) struct OutboundQueue {
    items: VecDeque<Outbound>,
}

impl OutboundQueue {
    /// Appends a message.
    #[inline]
    pub(crate) fn push(&mut self, item: Outbound) {
        self.items.push_back(item);
    }

    /// Hands every buffered message to `send`, oldest first.
    ///
    /// Returns the number of messages drained.
    pub(crate) fn flush(&mut self, mut send: impl FnMut(Outbound)) -> usize {
        let mut sent = 0;
        while let Some(item) = self.items.pop_front() {
            send(item);
            sent += 1;
        }
        sent
    }

    /// Returns the number of buffered messages.
    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }
}

// ============================================================================
// Tests
// ============================================================================
