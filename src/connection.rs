//! Stop-and-wait ARQ engines.
//!
//! [`ArqSender`] and [`ArqReceiver`] each own one [`Transport`] and drive the
//! protocol over it.  Their responsibilities are:
//! - Coordinating [`crate::sender`] / [`crate::receiver`] state with the
//!   transport.
//! - Encoding and validating every datagram through the [`Codec`].
//! - Retransmitting on timeout, NAK, or a stale ACK.
//! - Absorbing every per-frame failure so that only completion (or a
//!   configured give-up) reaches the caller.
//!
//! ```text
//!  ArqSender                                ArqReceiver
//!    │ → DATA seq=n                            │
//!    │ ───────────────────────────────────────▶│ verify digest, dedupe
//!    │                          ACK n / NAK ←  │ deliver once
//!    │ ◀───────────────────────────────────────│
//!    │ (timeout / NAK / stale ACK: resend n)   │
//!    │ → FIN                                   │
//!    │ ───────────────────────────────────────▶│ ACK FIN, linger, end
//! ```

use crate::config::RdtConfig;
use crate::error::RdtError;
use crate::packet::{Codec, Reply, FIN_SEQ};
use crate::receiver::{Disposition, ReceiverState};
use crate::sender::{frames, AckOutcome, SenderState};
use crate::state::{ReceiverPhase, SenderPhase};
use crate::timer::RetransmitTimer;
use crate::transport::{Transport, TransportError};

/// Outcome of one completed `send` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SendStats {
    /// Frames acknowledged.
    pub frames: u64,
    /// Payload bytes acknowledged.
    pub bytes: u64,
    /// Transmissions beyond the first, summed over all frames.
    pub retransmissions: u64,
}

/// Running totals kept by a receiver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReceiveStats {
    /// Frames delivered to the application.
    pub frames: u64,
    /// Payload bytes delivered to the application.
    pub bytes: u64,
    /// Retransmitted frames recognised and not delivered again.
    pub duplicates: u64,
    /// Datagrams answered with a NAK.
    pub rejected: u64,
}

// ---------------------------------------------------------------------------
// ArqSender
// ---------------------------------------------------------------------------

/// Sending half of the stop-and-wait protocol.
#[derive(Debug)]
pub struct ArqSender<T> {
    transport: T,
    codec: Codec,
    config: RdtConfig,
    /// Sequence number the next `send` call starts from.
    next_seq: u16,
    phase: SenderPhase,
}

impl<T: Transport> ArqSender<T> {
    pub fn new(transport: T, config: RdtConfig) -> Result<Self, RdtError> {
        config.validate()?;
        Ok(Self {
            transport,
            codec: config.codec(),
            config,
            next_seq: 0,
            phase: SenderPhase::Idle,
        })
    }

    pub fn phase(&self) -> SenderPhase {
        self.phase
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Deliver `data` reliably, returning once every frame is acknowledged.
    ///
    /// Numbering continues where the previous call stopped.  Any error leaves
    /// the sender closed: the peer may or may not hold the frame that failed,
    /// so the stream cannot be continued safely.
    pub async fn send(&mut self, data: &[u8]) -> Result<SendStats, RdtError> {
        match self.phase {
            SenderPhase::Closing | SenderPhase::Closed => return Err(RdtError::Closed),
            // A previous `send` was dropped mid-frame; the peer may hold it.
            SenderPhase::AwaitingAck => {
                log::warn!("[arq] earlier send abandoned in {}; closing", self.phase);
                self.phase = SenderPhase::Closed;
                return Err(RdtError::Closed);
            }
            SenderPhase::Idle => {}
        }

        log::info!(
            "[arq] sending {} bytes in frames of up to {} bytes",
            data.len(),
            self.codec.max_payload()
        );
        let result = self.send_frames(data).await;
        self.phase = match result {
            Ok(_) => SenderPhase::Idle,
            Err(_) => SenderPhase::Closed,
        };
        result
    }

    async fn send_frames(&mut self, data: &[u8]) -> Result<SendStats, RdtError> {
        let mut state = SenderState::new(self.next_seq, self.codec.seq_modulus());
        let mut stats = SendStats::default();

        for payload in frames(data, self.codec.max_payload()) {
            let datagram = self.codec.encode_segment(state.next_seq, payload)?;
            self.transport.send(&datagram).await?;
            log::debug!("[arq] → DATA seq={} len={}", state.next_seq, payload.len());
            state.record_sent(datagram);
            self.phase = SenderPhase::AwaitingAck;

            stats.retransmissions += u64::from(self.await_ack(&mut state).await?);
            stats.frames += 1;
            stats.bytes += payload.len() as u64;
            self.next_seq = state.next_seq;
        }
        debug_assert!(!state.has_unacked());
        Ok(stats)
    }

    /// Block until the in-flight frame is acknowledged, retransmitting it on
    /// every timeout, NAK, unreadable reply or stale ACK.
    ///
    /// Returns the number of retransmissions it took.
    async fn await_ack(&mut self, state: &mut SenderState) -> Result<u32, RdtError> {
        let mut timer =
            RetransmitTimer::new(self.config.retransmit_timeout, self.config.max_retries);
        let seq = state.in_flight_seq().unwrap_or(state.next_seq);

        loop {
            match self.transport.recv(timer.timeout()).await {
                Ok(datagram) => match self.codec.decode_reply(&datagram) {
                    Ok(reply) => match state.on_reply(reply) {
                        AckOutcome::Delivered(entry) => {
                            log::debug!(
                                "[arq] ← ACK seq={} after {} transmission(s), {:?} since last send",
                                entry.seq,
                                entry.tx_count,
                                entry.sent_at.elapsed()
                            );
                            return Ok(timer.retries());
                        }
                        AckOutcome::Retransmit => {
                            log::debug!("[arq] ← {reply:?} while waiting for seq={seq}");
                        }
                    },
                    Err(e) => log::debug!("[arq] ← unreadable reply ({e})"),
                },
                Err(TransportError::Timeout(after)) => {
                    log::debug!(
                        "[arq] no ACK for seq={seq} within {after:?} ({:?} in flight)",
                        state.in_flight_for().unwrap_or_default()
                    );
                }
                Err(e) => return Err(e.into()),
            }

            if !timer.try_retransmit() {
                let attempts = state.retransmit_count();
                log::warn!("[arq] giving up on seq={seq} after {attempts} transmissions");
                return Err(RdtError::ExhaustedRetries { seq, attempts });
            }
            if let Some(datagram) = state.on_retransmit() {
                self.transport.send(datagram).await?;
                log::debug!("[arq] → DATA seq={seq} (retransmission {})", timer.retries());
            }
        }
    }

    /// Mark the end of the stream with a FIN frame.
    ///
    /// The FIN is retried up to `fin_retries` times.  If none is acknowledged
    /// the sender closes anyway; every data frame is already confirmed.
    pub async fn close(&mut self) -> Result<(), RdtError> {
        if self.phase == SenderPhase::Closed {
            return Ok(());
        }
        self.phase = SenderPhase::Closing;
        log::debug!("[arq] sender {}", self.phase);

        let fin = self.codec.encode_fin();
        let timeout = self.config.retransmit_timeout;

        for attempt in 1..=self.config.fin_retries {
            match self.transport.send(&fin).await {
                Ok(()) => log::debug!("[arq] → FIN (attempt {attempt})"),
                Err(TransportError::Closed) => break,
                Err(e) => {
                    self.phase = SenderPhase::Closed;
                    return Err(e.into());
                }
            }

            match self.transport.recv(timeout).await {
                Ok(datagram) => {
                    if self.codec.decode_reply(&datagram) == Ok(Reply::Ack(FIN_SEQ)) {
                        log::debug!("[arq] ← ACK of FIN; closed");
                        self.phase = SenderPhase::Closed;
                        return Ok(());
                    }
                }
                Err(TransportError::Timeout(_)) => {}
                Err(TransportError::Closed) => break,
                Err(e) => {
                    self.phase = SenderPhase::Closed;
                    return Err(e.into());
                }
            }
        }

        log::warn!("[arq] FIN not acknowledged; force-closing");
        self.phase = SenderPhase::Closed;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// ArqReceiver
// ---------------------------------------------------------------------------

/// Receiving half of the stop-and-wait protocol.
#[derive(Debug)]
pub struct ArqReceiver<T> {
    transport: T,
    codec: Codec,
    config: RdtConfig,
    state: ReceiverState,
    phase: ReceiverPhase,
    stats: ReceiveStats,
}

impl<T: Transport> ArqReceiver<T> {
    pub fn new(transport: T, config: RdtConfig) -> Result<Self, RdtError> {
        config.validate()?;
        Ok(Self {
            transport,
            codec: config.codec(),
            config,
            state: ReceiverState::new(),
            phase: ReceiverPhase::AwaitingFrame,
            stats: ReceiveStats::default(),
        })
    }

    pub fn phase(&self) -> ReceiverPhase {
        self.phase
    }

    pub fn state(&self) -> &ReceiverState {
        &self.state
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

    /// Wait for the next payload the sender has not delivered before.
    ///
    /// Returns `Ok(None)` once the stream has ended: a FIN was received, the
    /// channel stayed silent for `idle_timeout`, or the transport closed.
    /// Corrupt, short and out-of-range frames are answered with a NAK and
    /// never surface here.
    pub async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, RdtError> {
        while self.phase == ReceiverPhase::AwaitingFrame {
            let datagram = match self.transport.recv(self.config.idle_timeout).await {
                Ok(datagram) => datagram,
                Err(TransportError::Timeout(silence)) => {
                    log::info!("[arq] no frame for {silence:?}; treating silence as end of stream");
                    self.phase = ReceiverPhase::Closed;
                    break;
                }
                Err(TransportError::Closed) => {
                    log::info!("[arq] transport closed; end of stream");
                    self.phase = ReceiverPhase::Closed;
                    break;
                }
                Err(e) => return Err(e.into()),
            };

            let segment = match self.codec.decode_segment(&datagram) {
                Ok(segment) => segment,
                Err(e) => {
                    self.stats.rejected += 1;
                    log::debug!("[arq] ← rejected {} bytes ({e}); → NAK", datagram.len());
                    self.reply(Reply::Nak).await?;
                    continue;
                }
            };

            if segment.is_fin() {
                log::debug!("[arq] ← FIN; → ACK");
                self.reply(Reply::Ack(FIN_SEQ)).await?;
                self.state.reset();
                self.linger().await?;
                break;
            }

            match self.state.on_segment(segment.seq) {
                Disposition::Duplicate => {
                    self.stats.duplicates += 1;
                    log::debug!("[arq] ← duplicate seq={}; → ACK again", segment.seq);
                    self.reply(Reply::Ack(segment.seq)).await?;
                }
                Disposition::Deliver => {
                    self.stats.frames += 1;
                    self.stats.bytes += segment.payload.len() as u64;
                    log::debug!(
                        "[arq] ← DATA seq={} len={}; → ACK",
                        segment.seq,
                        segment.payload.len()
                    );
                    self.reply(Reply::Ack(segment.seq)).await?;
                    return Ok(Some(segment.payload));
                }
            }
        }
        Ok(None)
    }

    /// Keep answering repeated FINs (our ACK may have been lost) until the
    /// channel has been quiet for `linger`.
    async fn linger(&mut self) -> Result<(), RdtError> {
        self.phase = ReceiverPhase::Lingering;
        log::debug!("[arq] receiver {} for {:?}", self.phase, self.config.linger);
        loop {
            match self.transport.recv(self.config.linger).await {
                Ok(datagram) => match self.codec.decode_segment(&datagram) {
                    Ok(segment) if segment.is_fin() => {
                        log::debug!("[arq] ← FIN again; → ACK");
                        self.reply(Reply::Ack(FIN_SEQ)).await?;
                    }
                    Ok(segment) => {
                        log::debug!("[arq] ignoring seq={} after FIN", segment.seq);
                    }
                    Err(_) => self.reply(Reply::Nak).await?,
                },
                Err(TransportError::Timeout(_) | TransportError::Closed) => break,
                Err(e) => return Err(e.into()),
            }
        }
        log::info!(
            "[arq] end of stream: {} frames, {} bytes, {} duplicates, {} rejected",
            self.stats.frames,
            self.stats.bytes,
            self.stats.duplicates,
            self.stats.rejected
        );
        self.phase = ReceiverPhase::Closed;
        Ok(())
    }

    /// Send a reply.  A peer that has already gone away is not an error.
    async fn reply(&mut self, reply: Reply) -> Result<(), RdtError> {
        match self.transport.send(&self.codec.encode_reply(reply)).await {
            Ok(()) | Err(TransportError::Closed) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::transport::memory_pair;

    fn config() -> RdtConfig {
        RdtConfig {
            max_payload: 4,
            seq_modulus: 4,
            ..Default::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn receiver_answers_corrupt_frame_with_nak() {
        let (mut peer, local) = memory_pair();
        let mut rx = ArqReceiver::new(local, config()).unwrap();
        let codec = config().codec();

        let mut frame = codec.encode_segment(0, b"abcd").unwrap();
        frame[0] ^= 0x80;
        peer.send(&frame).await.unwrap();
        peer.send(&codec.encode_segment(0, b"abcd").unwrap()).await.unwrap();

        assert_eq!(rx.next_chunk().await.unwrap(), Some(b"abcd".to_vec()));
        let wait = Duration::from_secs(1);
        assert_eq!(codec.decode_reply(&peer.recv(wait).await.unwrap()), Ok(Reply::Nak));
        assert_eq!(codec.decode_reply(&peer.recv(wait).await.unwrap()), Ok(Reply::Ack(0)));
        assert_eq!(rx.stats().rejected, 1);
        assert_eq!(rx.state().last_delivered(), Some(0));
    }

    #[tokio::test(start_paused = true)]
    async fn receiver_naks_short_datagram() {
        let (mut peer, local) = memory_pair();
        let mut rx = ArqReceiver::new(local, config()).unwrap();
        let codec = config().codec();

        peer.send(&[1, 2, 3]).await.unwrap();
        peer.send(&codec.encode_fin()).await.unwrap();

        assert_eq!(rx.next_chunk().await.unwrap(), None);
        let wait = Duration::from_secs(1);
        assert_eq!(codec.decode_reply(&peer.recv(wait).await.unwrap()), Ok(Reply::Nak));
        assert_eq!(
            codec.decode_reply(&peer.recv(wait).await.unwrap()),
            Ok(Reply::Ack(FIN_SEQ))
        );
        assert_eq!(rx.phase(), ReceiverPhase::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn silence_ends_stream() {
        let (_peer, local) = memory_pair();
        let mut rx = ArqReceiver::new(local, config()).unwrap();
        assert_eq!(rx.next_chunk().await.unwrap(), None);
        assert_eq!(rx.phase(), ReceiverPhase::Closed);
        // Stays ended.
        assert_eq!(rx.next_chunk().await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn sender_refuses_to_send_after_close() {
        let (_peer, local) = memory_pair();
        let mut tx = ArqSender::new(
            local,
            RdtConfig {
                fin_retries: 1,
                ..config()
            },
        )
        .unwrap();
        tx.close().await.unwrap();
        assert_eq!(tx.phase(), SenderPhase::Closed);
        assert!(matches!(tx.send(b"late").await, Err(RdtError::Closed)));
    }

    #[tokio::test(start_paused = true)]
    async fn empty_send_transmits_nothing() {
        let (mut peer, local) = memory_pair();
        let mut tx = ArqSender::new(local, config()).unwrap();
        let stats = tx.send(b"").await.unwrap();
        assert_eq!(stats, SendStats::default());
        assert!(matches!(
            peer.recv(Duration::from_secs(1)).await,
            Err(TransportError::Timeout(_))
        ));
    }

    #[test]
    fn invalid_config_is_refused() {
        let (a, _b) = memory_pair();
        let bad = RdtConfig {
            seq_modulus: 1,
            ..Default::default()
        };
        assert!(matches!(ArqSender::new(a, bad), Err(RdtError::Config(_))));
    }
}
