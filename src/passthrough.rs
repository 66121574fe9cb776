//! The pass-through protocol: raw chunks, no digest, no sequence numbers.
//!
//! Kept for interoperability testing against the ARQ engines.  The sender
//! still waits for *some* reply after each chunk so a lossless channel gives
//! the same pacing as ARQ, but any datagram counts as an acknowledgment and
//! nothing is done about loss, corruption or duplication.

use crate::config::RdtConfig;
use crate::connection::{ReceiveStats, SendStats};
use crate::error::RdtError;
use crate::sender::frames;
use crate::timer::RetransmitTimer;
use crate::transport::{Transport, TransportError};

/// Reply sent by [`PassThroughReceiver`] for every datagram.
pub const PASS_THROUGH_ACK: &[u8] = b"ACK";

/// Chunk index as reported in [`RdtError::ExhaustedRetries`]; saturates
/// past `u16::MAX`.
fn chunk_label(index: usize) -> u16 {
    u16::try_from(index).unwrap_or(u16::MAX)
}

#[derive(Debug)]
pub struct PassThroughSender<T> {
    transport: T,
    config: RdtConfig,
    closed: bool,
}

impl<T: Transport> PassThroughSender<T> {
    pub fn new(transport: T, config: RdtConfig) -> Result<Self, RdtError> {
        config.validate()?;
        Ok(Self {
            transport,
            config,
            closed: false,
        })
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    pub async fn send(&mut self, data: &[u8]) -> Result<SendStats, RdtError> {
        if self.closed {
            return Err(RdtError::Closed);
        }
        let mut stats = SendStats::default();

        for (index, chunk) in frames(data, self.config.max_payload).enumerate() {
            let mut timer =
                RetransmitTimer::new(self.config.retransmit_timeout, self.config.max_retries);
            self.transport.send(chunk).await?;
            log::debug!("[pass] → chunk #{index} len={}", chunk.len());

            loop {
                match self.transport.recv(timer.timeout()).await {
                    Ok(_) => break,
                    Err(TransportError::Timeout(_)) => {}
                    Err(e) => return Err(e.into()),
                }
                if !timer.try_retransmit() {
                    return Err(RdtError::ExhaustedRetries {
                        seq: chunk_label(index),
                        attempts: timer.retries() + 1,
                    });
                }
                self.transport.send(chunk).await?;
                log::debug!("[pass] → chunk #{index} again");
            }

            stats.frames += 1;
            stats.bytes += chunk.len() as u64;
            stats.retransmissions += u64::from(timer.retries());
        }
        Ok(stats)
    }

    /// Pass-through has no end-of-stream marker; the receiver relies on
    /// silence.
    pub async fn close(&mut self) -> Result<(), RdtError> {
        self.closed = true;
        Ok(())
    }
}

#[derive(Debug)]
pub struct PassThroughReceiver<T> {
    transport: T,
    config: RdtConfig,
    stats: ReceiveStats,
    done: bool,
}

impl<T: Transport> PassThroughReceiver<T> {
    pub fn new(transport: T, config: RdtConfig) -> Result<Self, RdtError> {
        config.validate()?;
        Ok(Self {
            transport,
            config,
            stats: ReceiveStats::default(),
            done: false,
        })
    }

    pub fn stats(&self) -> ReceiveStats {
        self.stats
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Deliver every datagram as-is.  `Ok(None)` after `idle_timeout` of
    /// silence or once the transport closes.
    pub async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, RdtError> {
        if self.done {
            return Ok(None);
        }
        match self.transport.recv(self.config.idle_timeout).await {
            Ok(datagram) => {
                match self.transport.send(PASS_THROUGH_ACK).await {
                    Ok(()) | Err(TransportError::Closed) => {}
                    Err(e) => return Err(e.into()),
                }
                self.stats.frames += 1;
                self.stats.bytes += datagram.len() as u64;
                log::debug!("[pass] ← chunk len={}; → ACK", datagram.len());
                Ok(Some(datagram))
            }
            Err(TransportError::Timeout(_) | TransportError::Closed) => {
                log::info!(
                    "[pass] end of stream: {} chunks, {} bytes",
                    self.stats.frames,
                    self.stats.bytes
                );
                self.done = true;
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::transport::memory_pair;

    #[tokio::test(start_paused = true)]
    async fn receiver_acks_every_datagram() {
        let (mut peer, local) = memory_pair();
        let mut rx = PassThroughReceiver::new(local, RdtConfig::default()).unwrap();

        peer.send(b"one").await.unwrap();
        peer.send(b"two").await.unwrap();

        assert_eq!(rx.next_chunk().await.unwrap(), Some(b"one".to_vec()));
        assert_eq!(rx.next_chunk().await.unwrap(), Some(b"two".to_vec()));
        assert_eq!(rx.next_chunk().await.unwrap(), None);

        let wait = Duration::from_secs(1);
        assert_eq!(peer.recv(wait).await.unwrap(), PASS_THROUGH_ACK);
        assert_eq!(peer.recv(wait).await.unwrap(), PASS_THROUGH_ACK);
        assert_eq!(rx.stats().frames, 2);
        assert_eq!(rx.stats().bytes, 6);
    }

    #[tokio::test(start_paused = true)]
    async fn sender_gives_up_without_replies() {
        let (_peer, local) = memory_pair();
        let config = RdtConfig {
            max_retries: Some(2),
            ..Default::default()
        };
        let mut tx = PassThroughSender::new(local, config).unwrap();
        match tx.send(b"lost").await {
            Err(RdtError::ExhaustedRetries { seq, attempts }) => {
                assert_eq!(seq, 0);
                assert_eq!(attempts, 3);
            }
            other => panic!("expected ExhaustedRetries, got {other:?}"),
        }
    }

    #[test]
    fn chunk_label_saturates() {
        assert_eq!(chunk_label(0), 0);
        assert_eq!(chunk_label(65_535), u16::MAX);
        assert_eq!(chunk_label(65_536), u16::MAX);
        assert_eq!(chunk_label(usize::MAX), u16::MAX);
    }

    #[tokio::test(start_paused = true)]
    async fn send_after_close_is_refused() {
        let (_peer, local) = memory_pair();
        let mut tx = PassThroughSender::new(local, RdtConfig::default()).unwrap();
        tx.close().await.unwrap();
        assert!(matches!(tx.send(b"x").await, Err(RdtError::Closed)));
    }
}
