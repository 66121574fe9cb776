//! The unreliable channel both roles talk through.
//!
//! A [`Transport`] moves whole datagrams and promises nothing else: datagrams
//! may be lost, corrupted, duplicated or delivered late.  The protocol engines
//! only ever call [`Transport::send`] and [`Transport::recv`], so anything that
//! implements the trait can carry a transfer:
//!
//! - [`crate::socket::UdpTransport`]: a real UDP socket.
//! - [`MemoryTransport`]: an in-process pair built on tokio channels.
//! - [`crate::simulator::Simulator`]: a fault-injecting wrapper around either.

use std::io;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors a transport can report.
#[derive(Debug, Error)]
pub enum TransportError {
    /// No datagram arrived within the requested time.
    #[error("no datagram within {0:?}")]
    Timeout(Duration),
    #[error("transport I/O error: {0}")]
    Io(#[from] io::Error),
    /// The other end of the channel is gone.
    #[error("transport closed")]
    Closed,
}

/// Unreliable datagram exchange with one fixed peer.
#[async_trait]
pub trait Transport: Send {
    /// Hand one datagram to the channel.
    async fn send(&mut self, datagram: &[u8]) -> Result<(), TransportError>;

    /// Wait up to `timeout` for the next datagram.
    async fn recv(&mut self, timeout: Duration) -> Result<Vec<u8>, TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Box<T> {
    async fn send(&mut self, datagram: &[u8]) -> Result<(), TransportError> {
        (**self).send(datagram).await
    }

    async fn recv(&mut self, timeout: Duration) -> Result<Vec<u8>, TransportError> {
        (**self).recv(timeout).await
    }
}

// ---------------------------------------------------------------------------
// MemoryTransport
// ---------------------------------------------------------------------------

/// One end of an in-process datagram channel.
///
/// Perfectly reliable on its own; wrap it in a
/// [`crate::simulator::Simulator`] to make it misbehave.
#[derive(Debug)]
pub struct MemoryTransport {
    tx: mpsc::UnboundedSender<Vec<u8>>,
    rx: mpsc::UnboundedReceiver<Vec<u8>>,
}

/// Two connected [`MemoryTransport`]s: what one sends, the other receives.
pub fn memory_pair() -> (MemoryTransport, MemoryTransport) {
    let (a_tx, b_rx) = mpsc::unbounded_channel();
    let (b_tx, a_rx) = mpsc::unbounded_channel();
    (
        MemoryTransport { tx: a_tx, rx: a_rx },
        MemoryTransport { tx: b_tx, rx: b_rx },
    )
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn send(&mut self, datagram: &[u8]) -> Result<(), TransportError> {
        self.tx
            .send(datagram.to_vec())
            .map_err(|_| TransportError::Closed)
    }

    async fn recv(&mut self, timeout: Duration) -> Result<Vec<u8>, TransportError> {
        match tokio::time::timeout(timeout, self.rx.recv()).await {
            Ok(Some(datagram)) => Ok(datagram),
            Ok(None) => Err(TransportError::Closed),
            Err(_elapsed) => Err(TransportError::Timeout(timeout)),
        }
    }
}
