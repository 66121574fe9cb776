//! Lifecycle states of the two roles.
//!
//! Stop-and-wait needs very little state machine: the interesting state
//! (sequence numbers, the in-flight frame) lives in [`crate::sender`] and
//! [`crate::receiver`].  These enums only track where an endpoint is in its
//! lifetime so misuse (sending after close) can be refused.

use std::fmt;

/// Sender lifecycle.
///
/// ```text
///  IDLE ──frame sent──▶ AWAITING_ACK ──ACK──▶ IDLE
///    │
///    │ close()
///    ▼
///  CLOSING ──FIN acked / given up──▶ CLOSED
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SenderPhase {
    /// Nothing in flight.
    #[default]
    Idle,
    /// One frame in flight, waiting for its acknowledgment.
    AwaitingAck,
    /// FIN sent, waiting for its acknowledgment.
    Closing,
    Closed,
}

/// Receiver lifecycle.
///
/// ```text
///  AWAITING_FRAME ──FIN──▶ LINGERING ──silence──▶ CLOSED
///        │                                          ▲
///        └────────────── idle timeout ──────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReceiverPhase {
    #[default]
    AwaitingFrame,
    /// FIN acknowledged; answering repeated FINs until the channel is quiet.
    Lingering,
    Closed,
}

impl fmt::Display for SenderPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

impl fmt::Display for ReceiverPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}
