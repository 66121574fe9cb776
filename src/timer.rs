//! Retransmission timeout and retry ceiling.
//!
//! Stop-and-wait needs only one timer: the one guarding the single in-flight
//! frame.  [`RetransmitTimer`] holds the fixed timeout (no back-off) and
//! counts retransmissions of the current frame so that a sender can give up
//! after [`RetransmitTimer::max_retries`] instead of blocking forever on a
//! dead channel.

use std::time::Duration;

/// Timeout and retry bookkeeping for one in-flight frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetransmitTimer {
    timeout: Duration,
    max_retries: Option<u32>,
    retries: u32,
}

impl RetransmitTimer {
    /// `max_retries = None` never gives up.
    pub fn new(timeout: Duration, max_retries: Option<u32>) -> Self {
        Self {
            timeout,
            max_retries,
            retries: 0,
        }
    }

    /// How long to wait for a reply.  Constant for the life of the timer.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn max_retries(&self) -> Option<u32> {
        self.max_retries
    }

    /// Retransmissions granted so far for the current frame.
    pub fn retries(&self) -> u32 {
        self.retries
    }

    /// Ask for permission to retransmit.
    ///
    /// Returns `false` once the ceiling is reached; the count is left
    /// unchanged in that case.
    pub fn try_retransmit(&mut self) -> bool {
        if self.max_retries.is_some_and(|max| self.retries >= max) {
            return false;
        }
        self.retries += 1;
        true
    }

    /// Start over for the next frame.
    pub fn reset(&mut self) {
        self.retries = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ceiling_stops_retransmissions() {
        let mut t = RetransmitTimer::new(Duration::from_millis(10), Some(2));
        assert!(t.try_retransmit());
        assert!(t.try_retransmit());
        assert!(!t.try_retransmit());
        assert!(!t.try_retransmit());
        assert_eq!(t.retries(), 2);
    }

    #[test]
    fn zero_ceiling_never_retransmits() {
        let mut t = RetransmitTimer::new(Duration::from_millis(10), Some(0));
        assert!(!t.try_retransmit());
    }

    #[test]
    fn unbounded_keeps_going() {
        let mut t = RetransmitTimer::new(Duration::from_millis(10), None);
        for _ in 0..10_000 {
            assert!(t.try_retransmit());
        }
        assert_eq!(t.retries(), 10_000);
    }

    #[test]
    fn reset_restores_budget() {
        let mut t = RetransmitTimer::new(Duration::from_secs(1), Some(1));
        assert!(t.try_retransmit());
        assert!(!t.try_retransmit());
        t.reset();
        assert_eq!(t.retries(), 0);
        assert!(t.try_retransmit());
        assert_eq!(t.timeout(), Duration::from_secs(1));
    }
}
