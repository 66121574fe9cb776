//! Outbound frame state for stop-and-wait reliability.
//!
//! [`SenderState`] tracks sequence numbers and the single in-flight frame.
//! It does **not** touch the transport; [`crate::connection::ArqSender`]
//! calls these methods and owns the actual send/receive loop.
//!
//! # Stop-and-Wait contract
//! - At most **one** frame is in flight at any moment (`unacked`).
//! - A new frame may only be sent once `unacked` is `None`.
//! - On a matching ACK: advance `next_seq` modulo M; clear `unacked`.
//! - On anything else: the caller resends the same datagram unchanged.

use std::time::{Duration, Instant};

use crate::packet::{next_seq, Reply};

// ---------------------------------------------------------------------------
// RetransmitEntry
// ---------------------------------------------------------------------------

/// A frame that has been sent but not yet acknowledged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetransmitEntry {
    pub seq: u16,
    /// The encoded frame, resent byte-for-byte on every retransmission.
    pub datagram: Vec<u8>,
    /// How many times this frame has been transmitted (1 = first send).
    pub tx_count: u32,
    /// Wall-clock time of the most recent transmission.
    pub sent_at: Instant,
}

/// What a reply means for the in-flight frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AckOutcome {
    /// The in-flight frame is acknowledged; here it is, taken out of the slot.
    Delivered(RetransmitEntry),
    /// Stale ACK, NAK, or nothing in flight: resend.
    Retransmit,
}

// ---------------------------------------------------------------------------
// SenderState
// ---------------------------------------------------------------------------

/// Stop-and-wait send-side state for one logical stream.
#[derive(Debug)]
pub struct SenderState {
    /// Sequence number of the **next** frame to send.
    ///
    /// Remains unchanged while a frame is in flight.
    pub next_seq: u16,

    /// The in-flight frame, or `None` when the sender is idle.
    pub unacked: Option<RetransmitEntry>,

    seq_modulus: u16,
}

impl SenderState {
    /// Create a new [`SenderState`] numbering frames from `start`.
    pub fn new(start: u16, seq_modulus: u16) -> Self {
        debug_assert!(start < seq_modulus, "start {start} outside modulus {seq_modulus}");
        Self {
            next_seq: start,
            unacked: None,
            seq_modulus,
        }
    }

    /// Move an encoded frame into the in-flight slot (first transmission).
    ///
    /// Panics in debug mode if a frame is already in flight.
    pub fn record_sent(&mut self, datagram: Vec<u8>) {
        debug_assert!(
            self.unacked.is_none(),
            "record_sent called while a frame is already in flight"
        );
        self.unacked = Some(RetransmitEntry {
            seq: self.next_seq,
            datagram,
            tx_count: 1,
            sent_at: Instant::now(),
        });
    }

    /// Process a decoded reply.
    ///
    /// Only `Ack(seq)` for the in-flight frame counts.  On success `next_seq`
    /// advances (wrapping at the modulus) and the slot is cleared.
    pub fn on_reply(&mut self, reply: Reply) -> AckOutcome {
        let in_flight = self.in_flight_seq();
        match reply {
            Reply::Ack(seq) if in_flight == Some(seq) => {
                self.next_seq = next_seq(seq, self.seq_modulus);
                self.unacked
                    .take()
                    .map_or(AckOutcome::Retransmit, AckOutcome::Delivered)
            }
            _ => AckOutcome::Retransmit,
        }
    }

    /// The datagram to put back on the wire, bumping its transmission count.
    pub fn on_retransmit(&mut self) -> Option<&[u8]> {
        let entry = self.unacked.as_mut()?;
        entry.tx_count += 1;
        entry.sent_at = Instant::now();
        Some(entry.datagram.as_slice())
    }

    /// Returns the number of times the in-flight frame has been sent,
    /// or `0` if the sender is idle.
    pub fn retransmit_count(&self) -> u32 {
        self.unacked.as_ref().map_or(0, |e| e.tx_count)
    }

    /// Sequence number of the in-flight frame.
    pub fn in_flight_seq(&self) -> Option<u16> {
        self.unacked.as_ref().map(|e| e.seq)
    }

    /// `true` when a frame is waiting for an ACK.
    pub fn has_unacked(&self) -> bool {
        self.unacked.is_some()
    }

    /// Time since the in-flight frame was last transmitted.
    pub fn in_flight_for(&self) -> Option<Duration> {
        self.unacked.as_ref().map(|e| e.sent_at.elapsed())
    }
}

/// Split `data` into the payloads of consecutive frames.
///
/// Empty input yields no frames; a length that is not a multiple of
/// `max_payload` yields a shorter final frame.
pub fn frames(data: &[u8], max_payload: usize) -> std::slice::Chunks<'_, u8> {
    data.chunks(max_payload)
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
