//! Protocol-agnostic endpoints.
//!
//! The application picks a [`Protocol`] in its [`RdtConfig`]; [`Sender`] and
//! [`Receiver`] dispatch to the matching engine so the rest of the program
//! never has to care which one is running.

use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::config::{Protocol, RdtConfig};
use crate::connection::{ArqReceiver, ArqSender, ReceiveStats, SendStats};
use crate::error::RdtError;
use crate::passthrough::{PassThroughReceiver, PassThroughSender};
use crate::transport::Transport;

#[derive(Debug)]
pub enum Sender<T> {
    PassThrough(PassThroughSender<T>),
    Arq(ArqSender<T>),
}

impl<T: Transport> Sender<T> {
    pub fn new(transport: T, config: RdtConfig) -> Result<Self, RdtError> {
        Ok(match config.protocol {
            Protocol::PassThrough => Self::PassThrough(PassThroughSender::new(transport, config)?),
            Protocol::Arq => Self::Arq(ArqSender::new(transport, config)?),
        })
    }

    pub fn protocol(&self) -> Protocol {
        match self {
            Self::PassThrough(_) => Protocol::PassThrough,
            Self::Arq(_) => Protocol::Arq,
        }
    }

    /// Deliver `data`; returns once the receiver has acknowledged all of it.
    pub async fn send(&mut self, data: &[u8]) -> Result<SendStats, RdtError> {
        match self {
            Self::PassThrough(s) => s.send(data).await,
            Self::Arq(s) => s.send(data).await,
        }
    }

    /// Signal end of stream.  Further `send` calls fail with
    /// [`RdtError::Closed`].
    pub async fn close(&mut self) -> Result<(), RdtError> {
        match self {
            Self::PassThrough(s) => s.close().await,
            Self::Arq(s) => s.close().await,
        }
    }

    pub fn into_transport(self) -> T {
        match self {
            Self::PassThrough(s) => s.into_transport(),
            Self::Arq(s) => s.into_transport(),
        }
    }
}

#[derive(Debug)]
pub enum Receiver<T> {
    PassThrough(PassThroughReceiver<T>),
    Arq(ArqReceiver<T>),
}

impl<T: Transport> Receiver<T> {
    pub fn new(transport: T, config: RdtConfig) -> Result<Self, RdtError> {
        Ok(match config.protocol {
            Protocol::PassThrough => {
                Self::PassThrough(PassThroughReceiver::new(transport, config)?)
            }
            Protocol::Arq => Self::Arq(ArqReceiver::new(transport, config)?),
        })
    }

    pub fn protocol(&self) -> Protocol {
        match self {
            Self::PassThrough(_) => Protocol::PassThrough,
            Self::Arq(_) => Protocol::Arq,
        }
    }

    /// Next delivered payload, or `None` at end of stream.
    pub async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, RdtError> {
        match self {
            Self::PassThrough(r) => r.next_chunk().await,
            Self::Arq(r) => r.next_chunk().await,
        }
    }

    pub fn stats(&self) -> ReceiveStats {
        match self {
            Self::PassThrough(r) => r.stats(),
            Self::Arq(r) => r.stats(),
        }
    }

    /// Write every delivered payload to `sink`, in order, until end of stream.
    pub async fn receive<W>(&mut self, sink: &mut W) -> Result<ReceiveStats, RdtError>
    where
        W: AsyncWrite + Unpin + Send,
    {
        while let Some(chunk) = self.next_chunk().await? {
            sink.write_all(&chunk).await.map_err(RdtError::Sink)?;
        }
        sink.flush().await.map_err(RdtError::Sink)?;
        Ok(self.stats())
    }

    pub fn into_transport(self) -> T {
        match self {
            Self::PassThrough(r) => r.into_transport(),
            Self::Arq(r) => r.into_transport(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::memory_pair;

    #[tokio::test(start_paused = true)]
    async fn protocol_selects_engine() {
        let (a, b) = memory_pair();
        let pass = RdtConfig {
            protocol: Protocol::PassThrough,
            ..Default::default()
        };
        assert_eq!(Sender::new(a, pass.clone()).unwrap().protocol(), Protocol::PassThrough);
        assert_eq!(Receiver::new(b, RdtConfig::default()).unwrap().protocol(), Protocol::Arq);
    }

    #[tokio::test(start_paused = true)]
    async fn arq_transfer_into_sink() {
        let (a, b) = memory_pair();
        let config = RdtConfig {
            max_payload: 3,
            ..Default::default()
        };
        let mut sender = Sender::new(a, config.clone()).unwrap();
        let mut receiver = Receiver::new(b, config).unwrap();

        let rx = tokio::spawn(async move {
            let mut out = Vec::new();
            let stats = receiver.receive(&mut out).await.unwrap();
            (out, stats)
        });

        let stats = sender.send(b"HELLOWORLD").await.unwrap();
        sender.close().await.unwrap();
        assert_eq!(stats.frames, 4);
        assert_eq!(stats.bytes, 10);

        let (out, rstats) = rx.await.unwrap();
        assert_eq!(out, b"HELLOWORLD");
        assert_eq!(rstats.frames, 4);
        assert_eq!(rstats.duplicates, 0);
    }
}
