//! Protocol configuration shared by both roles.
//!
//! Both peers must agree on [`RdtConfig::digest`], [`RdtConfig::max_payload`]
//! and [`RdtConfig::seq_modulus`]; the timing fields are local to each side.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::digest::DigestKind;
use crate::packet::{Codec, MAX_SEQ_MODULUS, MAX_UDP_PAYLOAD, SEQ_LEN};

/// Payload bytes per frame unless configured otherwise.
pub const DEFAULT_MAX_PAYLOAD: usize = 1024;
/// Size of the sequence space unless configured otherwise.
pub const DEFAULT_SEQ_MODULUS: u16 = 256;
pub const DEFAULT_RETRANSMIT_TIMEOUT: Duration = Duration::from_millis(1000);
pub const DEFAULT_MAX_RETRIES: u32 = 64;
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_LINGER: Duration = Duration::from_secs(2);
pub const DEFAULT_FIN_RETRIES: u32 = 8;

/// Which implementation sits behind [`crate::endpoint::Sender`] and
/// [`crate::endpoint::Receiver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Protocol {
    /// Raw datagrams, no error correction.  For interoperability testing.
    PassThrough,
    /// Stop-and-wait ARQ.
    #[default]
    Arq,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PassThrough => f.write_str("pass-through"),
            Self::Arq => f.write_str("arq"),
        }
    }
}

impl FromStr for Protocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "arq" => Ok(Self::Arq),
            "pass-through" | "passthrough" => Ok(Self::PassThrough),
            other => Err(format!(
                "unknown protocol `{other}` (expected arq or pass-through)"
            )),
        }
    }
}

/// Tunable parameters for one endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RdtConfig {
    pub protocol: Protocol,
    pub digest: DigestKind,
    /// Largest payload carried by one frame (`MAX_PAYLOAD`).
    pub max_payload: usize,
    /// Size of the cyclic sequence space (`M`).
    pub seq_modulus: u16,
    /// How long the sender waits for a reply before retransmitting.
    pub retransmit_timeout: Duration,
    /// Retransmissions allowed per frame; `None` retries forever.
    pub max_retries: Option<u32>,
    /// Silence after which the receiver assumes the stream is over.
    pub idle_timeout: Duration,
    /// How long the receiver keeps re-acknowledging FIN after the stream ends.
    pub linger: Duration,
    /// FIN transmissions attempted by the sender before force-closing.
    pub fin_retries: u32,
}

impl Default for RdtConfig {
    fn default() -> Self {
        Self {
            protocol: Protocol::default(),
            digest: DigestKind::default(),
            max_payload: DEFAULT_MAX_PAYLOAD,
            seq_modulus: DEFAULT_SEQ_MODULUS,
            retransmit_timeout: DEFAULT_RETRANSMIT_TIMEOUT,
            max_retries: Some(DEFAULT_MAX_RETRIES),
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            linger: DEFAULT_LINGER,
            fin_retries: DEFAULT_FIN_RETRIES,
        }
    }
}

impl RdtConfig {
    /// Check every field against the limits imposed by the wire format.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let max_payload = MAX_UDP_PAYLOAD - self.digest.width() - SEQ_LEN;
        if self.max_payload == 0 || self.max_payload > max_payload {
            return Err(ConfigError::MaxPayload {
                value: self.max_payload,
                max: max_payload,
            });
        }
        if !(2..=MAX_SEQ_MODULUS).contains(&self.seq_modulus) {
            return Err(ConfigError::SeqModulus {
                value: self.seq_modulus,
                max: MAX_SEQ_MODULUS,
            });
        }
        for (name, value) in [
            ("retransmit_timeout", self.retransmit_timeout),
            ("idle_timeout", self.idle_timeout),
            ("linger", self.linger),
        ] {
            if value.is_zero() {
                return Err(ConfigError::ZeroDuration(name));
            }
        }
        if self.fin_retries == 0 {
            return Err(ConfigError::FinRetries);
        }
        Ok(())
    }

    /// Codec matching this configuration.
    pub fn codec(&self) -> Codec {
        Codec::new(self.digest, self.max_payload, self.seq_modulus)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("max_payload must be between 1 and {max} bytes, got {value}")]
    MaxPayload { value: usize, max: usize },
    #[error("sequence modulus must be between 2 and {max}, got {value}")]
    SeqModulus { value: u16, max: u16 },
    #[error("{0} must be non-zero")]
    ZeroDuration(&'static str),
    #[error("fin_retries must be at least 1")]
    FinRetries,
}
