//! Inbound duplicate suppression.
//!
//! With a single frame in flight the receiver sees frames in send order,
//! except for retransmissions of the frame it delivered last (the sender lost
//! the ACK).  Remembering that one sequence number is enough to tell the two
//! apart.  [`ReceiverState`] holds it; [`crate::connection::ArqReceiver`]
//! owns the state and does all the I/O.

/// What to do with a frame that passed integrity checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// New data: deliver it, then ACK.
    Deliver,
    /// Retransmission of the frame delivered last: ACK again, do not deliver.
    Duplicate,
}

/// Receive-side state, alive for the receiver's whole run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReceiverState {
    /// Sequence number of the most recently delivered frame.
    ///
    /// `None` before the first delivery; it can never equal a valid number.
    last_delivered: Option<u16>,
}

impl ReceiverState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify a validated frame and record it if it is new.
    pub fn on_segment(&mut self, seq: u16) -> Disposition {
        if self.last_delivered == Some(seq) {
            Disposition::Duplicate
        } else {
            self.last_delivered = Some(seq);
            Disposition::Deliver
        }
    }

    pub fn last_delivered(&self) -> Option<u16> {
        self.last_delivered
    }

    /// Forget the last delivery so a fresh stream may start at any number.
    pub fn reset(&mut self) {
        self.last_delivered = None;
    }
}
