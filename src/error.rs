//! The error type returned across the protocol boundary.
//!
//! Per-frame trouble (timeouts, corrupt frames, short frames, stray replies)
//! is absorbed inside the engines and never shows up here.

use std::io;

use thiserror::Error;

use crate::config::ConfigError;
use crate::packet::PacketError;
use crate::transport::TransportError;

#[derive(Debug, Error)]
pub enum RdtError {
    /// The transport failed for a reason other than a timeout.
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("failed to build frame: {0}")]
    Packet(#[from] PacketError),
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    /// A frame hit the configured retransmission ceiling.
    #[error("frame seq={seq} unacknowledged after {attempts} transmissions")]
    ExhaustedRetries { seq: u16, attempts: u32 },
    /// Writing delivered bytes to the output sink failed.
    #[error("output sink error: {0}")]
    Sink(#[source] io::Error),
    /// `send` was called after `close`.
    #[error("endpoint is closed")]
    Closed,
}
