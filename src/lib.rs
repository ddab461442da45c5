//! A user-space UDP link emulator. *Currently linux-only*.
//!
//! This crate is for testing reliable-transfer protocols (retransmission, windowing, ACK
//! handling and the like) over a link that misbehaves in controlled, repeatable ways. The
//! [`Emulator`] sits between two UDP endpoints and relays their datagrams to each other, dropping,
//! delaying, reordering and rate-limiting them on the way.
//!
//! # Pairing endpoints
//!
//! The emulator doesn't need to be told who its endpoints are. Each endpoint sends it a handshake
//! datagram of the form `HELLO <port>`, naming the port its peer listens on. Once two endpoints
//! have named each other, anything else either of them sends is forwarded to the other. Traffic
//! from anyone else is silently discarded.
//!
//! # Impairments
//!
//! Each forwarded packet goes through the [`Impairment`] pipeline:
//!
//! * with probability `loss` it's dropped.
//! * otherwise it's delayed by `delay_ms`.
//! * with probability `reorder` it's delayed by a further `2 * delay_ms`, so packets sent shortly
//! after it can overtake it.
//! * if `rate_kbps` is non-zero, it first has to queue for and be serialized onto a link of that
//! rate. Each direction has its own queue.
//!
//! All random decisions come from a seeded generator, so a run is reproducible.
//!
//! ```no_run
//! use netsim_emu::{Emulator, EmulatorConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = {
//!     EmulatorConfig::new()
//!     .port(11000)
//!     .loss(0.05)
//!     .delay_ms(20.0)
//!     .reorder(0.01)
//!     .rate_kbps(1000.0)
//!     .seed(42)
//! };
//! let emulator = Emulator::bind(config).await?;
//! emulator.run().await?;
//! # Ok(())
//! # }
//! ```

#![deny(missing_debug_implementations)]

mod priv_prelude;
mod config;
mod emulator;
pub mod handshake;
mod impairment;
mod registry;
mod scheduler;
mod socket;
mod stats;

#[cfg(test)]
mod tests;

pub use crate::{
    config::{
        ConfigError, EmulatorConfig, ImpairmentConfig,
        DEFAULT_MAX_DATAGRAM_SIZE, DEFAULT_PORT, DEFAULT_SEED, MAX_DELAY_MS, MIN_RATE_KBPS,
    },
    emulator::{BindError, Emulator},
    handshake::{Handshake, Message},
    impairment::{serialization_delay, Impairment, LinkShaper, Verdict},
    registry::{Endpoint, Endpoints, ForwardingTable, Registry},
    scheduler::{Delivery, Scheduler},
    stats::{Stats, StatsSnapshot},
};
