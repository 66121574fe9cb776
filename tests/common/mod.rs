//! Shared helpers for the integration tests.
//!
//! [`Scripted`] injects faults at exact positions in the outbound datagram
//! sequence (the seeded `Simulator` covers the random case) and records
//! everything handed to it, so tests can inspect what went over the wire.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use rdt_over_udp::{
    Codec, RdtConfig, ReceiveStats, RdtError, Receiver, SendStats, Sender, Transport,
    TransportError,
};

/// What to do with the n-th outbound datagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    Drop,
    /// Flip the most significant bit of the given byte.
    Corrupt(usize),
}

/// Datagrams handed to a [`Scripted`] transport, before faults are applied.
pub type Wire = Arc<Mutex<Vec<Vec<u8>>>>;

pub struct Scripted<T> {
    inner: T,
    sent: usize,
    faults: HashMap<usize, Fault>,
    black_hole: bool,
    wire: Wire,
}

impl<T: Transport> Scripted<T> {
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            sent: 0,
            faults: HashMap::new(),
            black_hole: false,
            wire: Wire::default(),
        }
    }

    pub fn fault(mut self, index: usize, fault: Fault) -> Self {
        self.faults.insert(index, fault);
        self
    }

    /// Drop every outbound datagram.
    pub fn black_hole(mut self) -> Self {
        self.black_hole = true;
        self
    }

    pub fn wire(&self) -> Wire {
        Arc::clone(&self.wire)
    }
}

#[async_trait]
impl<T: Transport> Transport for Scripted<T> {
    async fn send(&mut self, datagram: &[u8]) -> Result<(), TransportError> {
        let index = self.sent;
        self.sent += 1;
        self.wire.lock().unwrap().push(datagram.to_vec());

        if self.black_hole {
            return Ok(());
        }
        match self.faults.get(&index) {
            Some(Fault::Drop) => Ok(()),
            Some(Fault::Corrupt(byte)) => {
                let mut out = datagram.to_vec();
                out[*byte] ^= 0x80;
                self.inner.send(&out).await
            }
            None => self.inner.send(datagram).await,
        }
    }

    async fn recv(&mut self, timeout: Duration) -> Result<Vec<u8>, TransportError> {
        self.inner.recv(timeout).await
    }
}

/// Sequence numbers of the frames recorded on `wire`, FIN included.
pub fn sequence_numbers(codec: &Codec, wire: &Wire) -> Vec<u16> {
    wire.lock()
        .unwrap()
        .iter()
        .map(|d| codec.parse(d).expect("recorded frame parses").seq)
        .collect()
}

/// Run a complete transfer: the receiver drains into a buffer in a
/// background task while the sender sends `data` and closes.
pub async fn transfer<S, R>(
    sender: S,
    receiver: R,
    config: RdtConfig,
    data: &[u8],
) -> (Result<SendStats, RdtError>, Vec<u8>, ReceiveStats)
where
    S: Transport + 'static,
    R: Transport + 'static,
{
    let mut receiver = Receiver::new(receiver, config.clone()).expect("receiver config");
    let rx = tokio::spawn(async move {
        let mut out = Vec::new();
        let stats = receiver.receive(&mut out).await.expect("receive");
        (out, stats)
    });

    let mut sender = Sender::new(sender, config).expect("sender config");
    let sent = sender.send(data).await;
    if sent.is_ok() {
        sender.close().await.expect("close");
    }
    drop(sender);

    let (out, stats) = rx.await.expect("receiver task panicked");
    (sent, out, stats)
}

/// Deterministic, non-repeating test payload.
pub fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 31 % 251) as u8).collect()
}
