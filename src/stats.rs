//! Counters of what the emulator has done. They are reported, but never influence behaviour.

use crate::priv_prelude::*;
use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters, shared between the event loop and anyone holding a handle.
#[derive(Debug, Default)]
pub struct Stats {
    received: AtomicU64,
    handshakes: AtomicU64,
    malformed_handshakes: AtomicU64,
    unpaired: AtomicU64,
    lost: AtomicU64,
    reordered: AtomicU64,
    delivered: AtomicU64,
    delivered_bytes: AtomicU64,
}

/// A point-in-time copy of [`Stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Datagrams read from the socket, of any kind.
    pub received: u64,
    /// Well-formed handshakes.
    pub handshakes: u64,
    pub malformed_handshakes: u64,
    /// Data discarded because its source isn't paired.
    pub unpaired: u64,
    /// Packets dropped by simulated loss.
    pub lost: u64,
    /// Packets held back to be reordered.
    pub reordered: u64,
    pub delivered: u64,
    pub delivered_bytes: u64,
}

fn bump(counter: &AtomicU64, by: u64) {
    counter.fetch_add(by, Ordering::Relaxed);
}

impl Stats {
    pub fn new() -> Stats {
        Stats::default()
    }

    pub(crate) fn record_received(&self) {
        bump(&self.received, 1);
    }

    pub(crate) fn record_handshake(&self) {
        bump(&self.handshakes, 1);
    }

    pub(crate) fn record_malformed_handshake(&self) {
        bump(&self.malformed_handshakes, 1);
    }

    pub(crate) fn record_unpaired(&self) {
        bump(&self.unpaired, 1);
    }

    pub(crate) fn record_lost(&self) {
        bump(&self.lost, 1);
    }

    pub(crate) fn record_reordered(&self) {
        bump(&self.reordered, 1);
    }

    pub(crate) fn record_delivered(&self, len: usize) {
        bump(&self.delivered, 1);
        bump(&self.delivered_bytes, len as u64);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let load = |counter: &AtomicU64| counter.load(Ordering::Relaxed);
        StatsSnapshot {
            received: load(&self.received),
            handshakes: load(&self.handshakes),
            malformed_handshakes: load(&self.malformed_handshakes),
            unpaired: load(&self.unpaired),
            lost: load(&self.lost),
            reordered: load(&self.reordered),
            delivered: load(&self.delivered),
            delivered_bytes: load(&self.delivered_bytes),
        }
    }
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "received={} handshakes={} malformed={} unpaired={} lost={} reordered={} delivered={} ({} bytes)",
            self.received,
            self.handshakes,
            self.malformed_handshakes,
            self.unpaired,
            self.lost,
            self.reordered,
            self.delivered,
            self.delivered_bytes,
        )
    }
}
