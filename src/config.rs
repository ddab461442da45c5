use crate::priv_prelude::*;
use thiserror::Error;

/// Port the emulator listens on unless told otherwise.
pub const DEFAULT_PORT: u16 = 11000;
/// Largest datagram read from the socket in one go. Longer datagrams are truncated.
pub const DEFAULT_MAX_DATAGRAM_SIZE: usize = 2048;
pub const DEFAULT_SEED: u64 = 1;
/// Longest one-way delay accepted, one hour.
pub const MAX_DELAY_MS: f64 = 3_600_000.0;
/// Slowest rate limit accepted, one bit per second.
pub const MIN_RATE_KBPS: f64 = 0.001;

/// Error raised when an emulator is configured with nonsensical parameters.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("loss probability must be within [0, 1], got {0}")]
    Loss(f64),
    #[error("reorder probability must be within [0, 1], got {0}")]
    Reorder(f64),
    #[error("delay must be within [0, {}] milliseconds, got {0}", MAX_DELAY_MS)]
    Delay(f64),
    #[error("link rate must be zero (unlimited) or at least {} kbps, got {0}", MIN_RATE_KBPS)]
    Rate(f64),
    #[error("max datagram size must be non-zero")]
    MaxDatagramSize,
}

/// How badly to treat packets crossing the emulated link. The default is a transparent link.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ImpairmentConfig {
    /// Probability that any given packet is dropped.
    pub loss: f64,
    /// One-way delay applied to every packet, in milliseconds.
    pub delay_ms: f64,
    /// Probability that a packet is held back for an extra two delays.
    pub reorder: f64,
    /// Link rate in kilobits per second. Zero means unlimited.
    pub rate_kbps: f64,
}

impl ImpairmentConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.loss) {
            return Err(ConfigError::Loss(self.loss));
        }
        if !(0.0..=1.0).contains(&self.reorder) {
            return Err(ConfigError::Reorder(self.reorder));
        }
        if !(0.0..=MAX_DELAY_MS).contains(&self.delay_ms) {
            return Err(ConfigError::Delay(self.delay_ms));
        }
        let unlimited = self.rate_kbps == 0.0;
        if !unlimited && !(self.rate_kbps.is_finite() && self.rate_kbps >= MIN_RATE_KBPS) {
            return Err(ConfigError::Rate(self.rate_kbps));
        }
        Ok(())
    }

    /// The base one-way delay.
    pub fn delay(&self) -> Result<Duration, ConfigError> {
        if !(0.0..=MAX_DELAY_MS).contains(&self.delay_ms) {
            return Err(ConfigError::Delay(self.delay_ms));
        }
        Duration::try_from_secs_f64(self.delay_ms / 1000.0).map_err(|_| ConfigError::Delay(self.delay_ms))
    }

    /// Additional delay given to packets picked for reordering.
    pub fn reorder_delay(&self) -> Result<Duration, ConfigError> {
        self.delay()?.checked_mul(2).ok_or(ConfigError::Delay(self.delay_ms))
    }

    /// Link rate in bits per second, or `None` if the link is unlimited.
    pub fn rate_bps(&self) -> Option<f64> {
        if self.rate_kbps > 0.0 {
            Some(self.rate_kbps * 1000.0)
        } else {
            None
        }
    }
}

/// Everything needed to start an [`Emulator`](crate::Emulator).
#[derive(Debug, Clone, PartialEq)]
pub struct EmulatorConfig {
    /// Address to listen on.
    pub bind_addr: SocketAddr,
    pub impairment: ImpairmentConfig,
    /// Seed for the loss/reorder decisions. The same seed and the same input give the same
    /// decisions.
    pub seed: u64,
    pub max_datagram_size: usize,
}

impl Default for EmulatorConfig {
    fn default() -> EmulatorConfig {
        EmulatorConfig {
            bind_addr: SocketAddr::from((ipv4!("0.0.0.0"), DEFAULT_PORT)),
            impairment: ImpairmentConfig::default(),
            seed: DEFAULT_SEED,
            max_datagram_size: DEFAULT_MAX_DATAGRAM_SIZE,
        }
    }
}

impl EmulatorConfig {
    pub fn new() -> EmulatorConfig {
        EmulatorConfig::default()
    }

    pub fn bind_addr(mut self, bind_addr: SocketAddr) -> EmulatorConfig {
        self.bind_addr = bind_addr;
        self
    }

    pub fn port(mut self, port: u16) -> EmulatorConfig {
        self.bind_addr.set_port(port);
        self
    }

    pub fn loss(mut self, loss: f64) -> EmulatorConfig {
        self.impairment.loss = loss;
        self
    }

    pub fn delay_ms(mut self, delay_ms: f64) -> EmulatorConfig {
        self.impairment.delay_ms = delay_ms;
        self
    }

    pub fn reorder(mut self, reorder: f64) -> EmulatorConfig {
        self.impairment.reorder = reorder;
        self
    }

    pub fn rate_kbps(mut self, rate_kbps: f64) -> EmulatorConfig {
        self.impairment.rate_kbps = rate_kbps;
        self
    }

    pub fn seed(mut self, seed: u64) -> EmulatorConfig {
        self.seed = seed;
        self
    }

    pub fn max_datagram_size(mut self, max_datagram_size: usize) -> EmulatorConfig {
        self.max_datagram_size = max_datagram_size;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.impairment.validate()?;
        if self.max_datagram_size == 0 {
            return Err(ConfigError::MaxDatagramSize);
        }
        Ok(())
    }
}
