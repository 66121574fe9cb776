//! Transfers over real UDP sockets on loopback.
//!
//! Both halves bind OS-chosen ports; the receiver runs in a background task.

use std::net::SocketAddr;
use std::time::Duration;

use rdt_over_udp::{
    Protocol, RdtConfig, Receiver, Sender, Simulator, SimulatorConfig, Transport, UdpTransport,
};

// ---------------------------------------------------------------------------
// Helper
// ---------------------------------------------------------------------------

/// Two sockets addressed at each other.
async fn socket_pair() -> (UdpTransport, UdpTransport) {
    let any: SocketAddr = "127.0.0.1:0".parse().unwrap();
    let mut receiver = UdpTransport::bind(any, any).await.expect("bind receiver");
    let sender = UdpTransport::bind(any, receiver.local_addr)
        .await
        .expect("bind sender");
    receiver.set_peer(sender.local_addr);
    (sender, receiver)
}

fn fast_config() -> RdtConfig {
    RdtConfig {
        max_payload: 512,
        retransmit_timeout: Duration::from_millis(50),
        max_retries: Some(200),
        idle_timeout: Duration::from_secs(3),
        linger: Duration::from_millis(200),
        ..Default::default()
    }
}

async fn run<S, R>(sender: S, receiver: R, config: RdtConfig, data: Vec<u8>) -> Vec<u8>
where
    S: Transport + 'static,
    R: Transport + 'static,
{
    let mut receiver = Receiver::new(receiver, config.clone()).expect("receiver config");
    let rx = tokio::spawn(async move {
        let mut out = Vec::new();
        receiver.receive(&mut out).await.expect("receive");
        out
    });

    let mut sender = Sender::new(sender, config).expect("sender config");
    tokio::time::timeout(Duration::from_secs(30), sender.send(&data))
        .await
        .expect("send timed out")
        .expect("send failed");
    sender.close().await.expect("close");

    tokio::time::timeout(Duration::from_secs(30), rx)
        .await
        .expect("receiver timed out")
        .expect("receiver task panicked")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn loopback_transfer() {
    let (sender, receiver) = socket_pair().await;
    let data: Vec<u8> = (0..8_000u32).map(|i| (i % 253) as u8).collect();

    let out = run(sender, receiver, fast_config(), data.clone()).await;
    assert_eq!(out, data);
}

#[tokio::test]
async fn loopback_transfer_through_simulator() {
    let (sender, receiver) = socket_pair().await;
    let faults = |seed| SimulatorConfig {
        loss_rate: 0.1,
        corrupt_rate: 0.1,
        duplicate_rate: 0.1,
        seed: Some(seed),
    };
    let sender = Simulator::new(sender, faults(3)).expect("simulator");
    let receiver = Simulator::new(receiver, faults(5)).expect("simulator");
    let data: Vec<u8> = (0..4_000u32).map(|i| (i * 7 % 256) as u8).collect();

    let out = run(sender, receiver, fast_config(), data.clone()).await;
    assert_eq!(out, data);
}

#[tokio::test]
async fn pass_through_loopback_transfer() {
    let (sender, receiver) = socket_pair().await;
    let config = RdtConfig {
        protocol: Protocol::PassThrough,
        idle_timeout: Duration::from_millis(500),
        ..fast_config()
    };
    let data = b"raw datagrams over a quiet loopback".to_vec();

    let out = run(sender, receiver, config, data.clone()).await;
    assert_eq!(out, data);
}
