//! Entry point for `rdt-over-udp`.
//!
//! `send` reads standard input to EOF and delivers it to the peer; `receive`
//! writes everything delivered to standard output.  All protocol work is
//! delegated to the library; `main.rs` owns only process setup (logging,
//! argument parsing, stdio).

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tokio::io::AsyncReadExt;

use rdt_over_udp::config::{DEFAULT_IDLE_TIMEOUT, DEFAULT_MAX_RETRIES, DEFAULT_RETRANSMIT_TIMEOUT};
use rdt_over_udp::{
    DigestKind, Protocol, RdtConfig, Receiver, Sender, Simulator, SimulatorConfig, Transport,
    UdpTransport,
};

const SENDER_ADDR: &str = "127.0.0.1:50006";
const RECEIVER_ADDR: &str = "127.0.0.1:50005";

/// Reliable one-way transfer over UDP using stop-and-wait ARQ.
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Subcommand)]
enum Mode {
    /// Send standard input to the peer.
    Send(Opts),
    /// Write everything received from the peer to standard output.
    Receive(Opts),
}

#[derive(Args)]
struct Opts {
    /// Local address to bind.
    #[arg(short, long)]
    bind: Option<SocketAddr>,
    /// Address of the other endpoint.
    #[arg(short, long)]
    peer: Option<SocketAddr>,
    /// `arq` or `pass-through`.
    #[arg(long, default_value_t = Protocol::Arq)]
    protocol: Protocol,
    /// `internet`, `crc32`, `sha256` or `blake3`.
    #[arg(long, default_value_t = DigestKind::Blake3)]
    digest: DigestKind,
    /// Largest payload per frame, in bytes.
    #[arg(long, default_value_t = rdt_over_udp::config::DEFAULT_MAX_PAYLOAD)]
    max_payload: usize,
    /// Size of the sequence number space.
    #[arg(long, default_value_t = rdt_over_udp::config::DEFAULT_SEQ_MODULUS)]
    modulus: u16,
    /// Retransmission timeout in milliseconds.
    #[arg(long, default_value_t = DEFAULT_RETRANSMIT_TIMEOUT.as_millis() as u64)]
    timeout_ms: u64,
    /// Retransmissions per frame before giving up; 0 retries forever.
    #[arg(long, default_value_t = DEFAULT_MAX_RETRIES)]
    max_retries: u32,
    /// Silence after which the receiver assumes the stream is over.
    #[arg(long, default_value_t = DEFAULT_IDLE_TIMEOUT.as_millis() as u64)]
    idle_timeout_ms: u64,
    /// Probability of dropping an outgoing datagram.
    #[arg(long, default_value_t = 0.0)]
    loss: f64,
    /// Probability of flipping one bit in an outgoing datagram.
    #[arg(long, default_value_t = 0.0)]
    corrupt: f64,
    /// Probability of sending an outgoing datagram twice.
    #[arg(long, default_value_t = 0.0)]
    duplicate: f64,
    /// Seed for the fault simulator.
    #[arg(long)]
    seed: Option<u64>,
}

impl Opts {
    fn config(&self) -> RdtConfig {
        RdtConfig {
            protocol: self.protocol,
            digest: self.digest,
            max_payload: self.max_payload,
            seq_modulus: self.modulus,
            retransmit_timeout: Duration::from_millis(self.timeout_ms),
            max_retries: (self.max_retries != 0).then_some(self.max_retries),
            idle_timeout: Duration::from_millis(self.idle_timeout_ms),
            ..Default::default()
        }
    }

    fn simulator(&self) -> SimulatorConfig {
        SimulatorConfig {
            loss_rate: self.loss,
            corrupt_rate: self.corrupt,
            duplicate_rate: self.duplicate,
            seed: self.seed,
        }
    }

    /// Bind the socket, wrapping it in a [`Simulator`] when any fault is
    /// requested.
    async fn transport(&self, bind: &str, peer: &str) -> Result<Box<dyn Transport>> {
        let bind = match self.bind {
            Some(addr) => addr,
            None => bind.parse().context("default bind address")?,
        };
        let peer = match self.peer {
            Some(addr) => addr,
            None => peer.parse().context("default peer address")?,
        };
        let socket = UdpTransport::bind(bind, peer)
            .await
            .with_context(|| format!("failed to bind {bind}"))?;
        log::info!("bound {}, peer {peer}", socket.local_addr);

        let faults = self.simulator();
        if faults.is_transparent() {
            return Ok(Box::new(socket));
        }
        let sim = Simulator::new(socket, faults).context("invalid simulator settings")?;
        Ok(Box::new(sim))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise env_logger; set RUST_LOG to control verbosity.
    env_logger::init();

    let cli = Cli::parse();

    match cli.mode {
        Mode::Send(opts) => {
            let transport = opts.transport(SENDER_ADDR, RECEIVER_ADDR).await?;
            let mut sender = Sender::new(transport, opts.config())?;

            let mut data = Vec::new();
            tokio::io::stdin()
                .read_to_end(&mut data)
                .await
                .context("failed to read standard input")?;

            let stats = sender.send(&data).await.context("transfer failed")?;
            sender.close().await.context("failed to close stream")?;
            log::info!(
                "sent {} bytes in {} frames ({} retransmissions)",
                stats.bytes,
                stats.frames,
                stats.retransmissions
            );
        }
        Mode::Receive(opts) => {
            let transport = opts.transport(RECEIVER_ADDR, SENDER_ADDR).await?;
            let mut receiver = Receiver::new(transport, opts.config())?;
            let stats = receiver
                .receive(&mut tokio::io::stdout())
                .await
                .context("receive failed")?;
            log::info!(
                "received {} bytes in {} frames ({} duplicates, {} rejected)",
                stats.bytes,
                stats.frames,
                stats.duplicates,
                stats.rejected
            );
        }
    }
    Ok(())
}
