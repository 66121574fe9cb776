//! `rdt-over-udp`: reliable one-way data transfer over an unreliable
//! datagram channel, using stop-and-wait ARQ (RDT 3.0).
//!
//! # Architecture
//!
//! ```text
//!  ┌──────────────┐   DATA seq=n   ┌──────────────┐
//!  │  ArqSender   │───────────────▶│ ArqReceiver  │
//!  └──────┬───────┘                └──────┬───────┘
//!         │        ACK n / NAK            │
//!         │◀──────────────────────────────┘
//!         │
//!  ┌──────▼────────────────────────────────┐
//!  │  Codec (digest ‖ seq ‖ payload)       │
//!  └──────┬────────────────────────────────┘
//!         │ whole datagrams
//!  ┌──────▼──────┐   optional   ┌───────────┐
//!  │  Transport  │◀─────────────│ Simulator │  (loss / corruption / dups)
//!  └─────────────┘              └───────────┘
//!   UdpTransport, MemoryTransport
//! ```
//!
//! Each module has a single responsibility:
//! - [`digest`]      : pluggable integrity digests
//! - [`packet`]      : frame and reply wire formats
//! - [`config`]      : protocol parameters and their validation
//! - [`error`]       : the error returned to callers
//! - [`transport`]   : the datagram channel trait and an in-memory pair
//! - [`socket`]      : UDP implementation of the channel
//! - [`simulator`]   : fault-injecting channel wrapper
//! - [`timer`]       : retransmission timeout and retry ceiling
//! - [`state`]       : lifecycle phases of each role
//! - [`sender`]      : stop-and-wait outbound frame state
//! - [`receiver`]    : duplicate suppression
//! - [`connection`]  : the ARQ sender and receiver engines
//! - [`passthrough`] : raw, unprotected variant for comparison
//! - [`endpoint`]    : protocol-agnostic `Sender` / `Receiver`

pub mod config;
pub mod connection;
pub mod digest;
pub mod endpoint;
pub mod error;
pub mod packet;
pub mod passthrough;
pub mod receiver;
pub mod sender;
pub mod simulator;
pub mod socket;
pub mod state;
pub mod timer;
pub mod transport;

pub use config::{Protocol, RdtConfig};
pub use connection::{ArqReceiver, ArqSender, ReceiveStats, SendStats};
pub use digest::DigestKind;
pub use endpoint::{Receiver, Sender};
pub use error::RdtError;
pub use packet::{Codec, Reply, Segment};
pub use simulator::{Simulator, SimulatorConfig};
pub use socket::UdpTransport;
pub use transport::{memory_pair, MemoryTransport, Transport, TransportError};
