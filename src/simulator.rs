//! Fault-injecting channel for testing and demonstrations.
//!
//! Real networks drop, corrupt, and duplicate packets.  To exercise the
//! reliability mechanisms without depending on actual network conditions,
//! this module provides a [`Simulator`] that wraps any [`Transport`] and
//! intercepts outbound datagrams, applying a configurable fault model:
//!
//! | Fault       | Description                                       |
//! |-------------|---------------------------------------------------|
//! | Loss        | Drop a datagram with probability `loss_rate`.     |
//! | Corruption  | Flip one random bit with probability `corrupt_rate`. |
//! | Duplication | Deliver a datagram twice with probability `duplicate_rate`. |
//!
//! Faults are applied on send only; wrap both ends to make both directions
//! unreliable.  A fixed `seed` makes a run reproducible.

use std::time::Duration;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;

use crate::transport::{Transport, TransportError};

/// Configuration for the fault-injection model.
///
/// All probabilities are in the range `[0.0, 1.0]`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimulatorConfig {
    /// Probability that any given datagram is silently dropped.
    pub loss_rate: f64,
    /// Probability that a delivered datagram has one bit flipped.
    pub corrupt_rate: f64,
    /// Probability that a delivered datagram is sent twice.
    pub duplicate_rate: f64,
    /// RNG seed; `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl SimulatorConfig {
    pub fn validate(&self) -> Result<(), SimulatorError> {
        for (name, rate) in [
            ("loss_rate", self.loss_rate),
            ("corrupt_rate", self.corrupt_rate),
            ("duplicate_rate", self.duplicate_rate),
        ] {
            if !(0.0..=1.0).contains(&rate) {
                return Err(SimulatorError::Rate { name, rate });
            }
        }
        Ok(())
    }

    /// `true` when no fault can ever fire.
    pub fn is_transparent(&self) -> bool {
        self.loss_rate == 0.0 && self.corrupt_rate == 0.0 && self.duplicate_rate == 0.0
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SimulatorError {
    #[error("{name} must be within [0, 1], got {rate}")]
    Rate { name: &'static str, rate: f64 },
}

/// Running totals of injected faults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FaultCounters {
    pub sent: u64,
    pub dropped: u64,
    pub corrupted: u64,
    pub duplicated: u64,
}

/// A fault-injecting wrapper around another transport.
#[derive(Debug)]
pub struct Simulator<T> {
    inner: T,
    config: SimulatorConfig,
    rng: StdRng,
    counters: FaultCounters,
}

impl<T: Transport> Simulator<T> {
    pub fn new(inner: T, config: SimulatorConfig) -> Result<Self, SimulatorError> {
        config.validate()?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Ok(Self {
            inner,
            config,
            rng,
            counters: FaultCounters::default(),
        })
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    pub fn counters(&self) -> FaultCounters {
        self.counters
    }

    pub fn into_inner(self) -> T {
        self.inner
    }

    fn roll(&mut self, rate: f64) -> bool {
        rate > 0.0 && self.rng.random_bool(rate)
    }

    fn flip_random_bit(&mut self, datagram: &mut [u8]) {
        if datagram.is_empty() {
            return;
        }
        let bit = self.rng.random_range(0..datagram.len() * 8);
        datagram[bit / 8] ^= 1 << (bit % 8);
    }
}

#[async_trait]
impl<T: Transport> Transport for Simulator<T> {
    /// Send a datagram through the simulated network.
    ///
    /// Applies loss, corruption and duplication according to `config` before
    /// handing the datagram to the inner transport.
    async fn send(&mut self, datagram: &[u8]) -> Result<(), TransportError> {
        self.counters.sent += 1;

        if self.roll(self.config.loss_rate) {
            self.counters.dropped += 1;
            log::debug!("[sim] dropped {} bytes", datagram.len());
            return Ok(());
        }

        let mut out = datagram.to_vec();
        if self.roll(self.config.corrupt_rate) {
            self.flip_random_bit(&mut out);
            self.counters.corrupted += 1;
            log::debug!("[sim] corrupted {} bytes", out.len());
        }

        self.inner.send(&out).await?;

        if self.roll(self.config.duplicate_rate) {
            self.counters.duplicated += 1;
            log::debug!("[sim] duplicated {} bytes", out.len());
            self.inner.send(&out).await?;
        }
        Ok(())
    }

    async fn recv(&mut self, timeout: Duration) -> Result<Vec<u8>, TransportError> {
        self.inner.recv(timeout).await
    }
}
