//! UDP implementation of [`Transport`].
//!
//! [`UdpTransport`] is a thin wrapper around `tokio::net::UdpSocket` bound to
//! a local address and talking to one fixed peer.  All protocol logic lives
//! elsewhere; this module owns only byte I/O.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::UdpSocket;
use tokio::time::Instant;

use crate::transport::{Transport, TransportError};

/// Maximum UDP payload size (theoretical limit; in practice kept much smaller).
const MAX_DATAGRAM: usize = 65_535;

/// A datagram socket exchanging bytes with a single peer.
#[derive(Debug)]
pub struct UdpTransport {
    /// Address this socket is bound to (filled in after OS assigns ephemeral port).
    pub local_addr: SocketAddr,
    peer: SocketAddr,
    inner: UdpSocket,
    buf: Vec<u8>,
}

impl UdpTransport {
    /// Bind to `local_addr` and address every datagram to `peer`.
    ///
    /// Passing port `0` lets the OS choose an ephemeral port.
    pub async fn bind(local_addr: SocketAddr, peer: SocketAddr) -> Result<Self, TransportError> {
        let inner = UdpSocket::bind(local_addr).await?;
        let local_addr = inner.local_addr()?;
        log::debug!("[udp] bound {local_addr}, peer {peer}");
        Ok(Self {
            local_addr,
            peer,
            inner,
            buf: vec![0u8; MAX_DATAGRAM],
        })
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Point the socket at a different peer.
    pub fn set_peer(&mut self, peer: SocketAddr) {
        self.peer = peer;
    }
}

#[async_trait]
impl Transport for UdpTransport {
    async fn send(&mut self, datagram: &[u8]) -> Result<(), TransportError> {
        self.inner.send_to(datagram, self.peer).await?;
        Ok(())
    }

    /// Receive the next datagram from the peer.
    ///
    /// Datagrams from any other address are dropped, as are ICMP-triggered
    /// errors; both count against the same deadline.
    async fn recv(&mut self, timeout: Duration) -> Result<Vec<u8>, TransportError> {
        let deadline = Instant::now() + timeout;
        loop {
            match tokio::time::timeout_at(deadline, self.inner.recv_from(&mut self.buf)).await {
                Err(_elapsed) => return Err(TransportError::Timeout(timeout)),
                Ok(Ok((n, addr))) if addr == self.peer => return Ok(self.buf[..n].to_vec()),
                Ok(Ok((n, addr))) => {
                    log::debug!("[udp] ignoring {n} bytes from stranger {addr}");
                }
                Ok(Err(e)) if is_transient_io_error(&e) => {
                    log::debug!("[udp] transient receive error: {e}");
                }
                Ok(Err(e)) => return Err(e.into()),
            }
        }
    }
}

/// Returns true if the error is likely transient (the peer socket is not up
/// yet, or the call was interrupted).
fn is_transient_io_error(e: &io::Error) -> bool {
    use io::ErrorKind;
    matches!(
        e.kind(),
        ErrorKind::ConnectionRefused | ErrorKind::ConnectionReset | ErrorKind::Interrupted
    )
}
