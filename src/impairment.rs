//! Decides the fate of each packet crossing the emulated link.
//!
//! A packet is first subjected to random loss. Survivors get the configured one-way delay, and
//! some are picked for reordering and held back for two further delays, which lets packets sent
//! slightly later overtake them. If the link has a rate limit, packets also queue behind one
//! another while they're serialized onto the link, one queue per direction. The queueing delay
//! comes first, the propagation delay is added on top.

use crate::priv_prelude::*;

/// The outcome of passing a packet through the [`Impairment`] pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// The packet is lost.
    Drop,
    /// The packet should be delivered at `at`.
    Deliver {
        at: Instant,
        /// Whether the packet was held back for reordering.
        reordered: bool,
    },
}

/// Tracks when each direction of a rate-limited link is next free to start sending.
///
/// Each ordered `(source, destination)` pair is an independent single-server FIFO queue.
#[derive(Debug, Default)]
pub struct LinkShaper {
    next_free: HashMap<(SocketAddr, SocketAddr), Instant>,
}

impl LinkShaper {
    pub fn new() -> LinkShaper {
        LinkShaper::default()
    }

    /// Put `len` bytes onto the `src -> dst` link at `rate_bps` bits per second. Returns when the
    /// last bit leaves, which is also when the link next becomes free.
    ///
    /// Returns `None`, leaving the link untouched, if the finish time can't be represented.
    pub fn transmit(
        &mut self,
        src: SocketAddr,
        dst: SocketAddr,
        len: usize,
        rate_bps: f64,
        now: Instant,
    ) -> Option<Instant> {
        let serialization = serialization_delay(len, rate_bps)?;
        let next_free = self.next_free.entry((src, dst)).or_insert(now);
        let start = cmp::max(now, *next_free);
        let finish = start.checked_add(serialization)?;
        *next_free = finish;
        Some(finish)
    }

    /// When the `src -> dst` link is next free, if it has ever been used.
    pub fn next_free(&self, src: SocketAddr, dst: SocketAddr) -> Option<Instant> {
        self.next_free.get(&(src, dst)).copied()
    }
}

/// Time taken to clock `len` bytes onto a link running at `rate_bps` bits per second, or `None`
/// if that doesn't fit in a `Duration`.
pub fn serialization_delay(len: usize, rate_bps: f64) -> Option<Duration> {
    let secs = (len as f64 * 8.0) / rate_bps;
    Duration::try_from_secs_f64(secs).ok()
}

/// The loss, delay, reorder and rate-limiting pipeline.
pub struct Impairment {
    config: ImpairmentConfig,
    delay: Duration,
    reorder_delay: Duration,
    rate_bps: Option<f64>,
    rng: StdRng,
    shaper: LinkShaper,
}

impl Impairment {
    /// Create a pipeline. All random decisions are drawn from a generator seeded with `seed`.
    pub fn new(config: ImpairmentConfig, seed: u64) -> Result<Impairment, ConfigError> {
        config.validate()?;
        Ok(Impairment {
            config,
            delay: config.delay()?,
            reorder_delay: config.reorder_delay()?,
            rate_bps: config.rate_bps(),
            rng: StdRng::seed_from_u64(seed),
            shaper: LinkShaper::new(),
        })
    }

    pub fn config(&self) -> &ImpairmentConfig {
        &self.config
    }

    /// Decide whether and when a `len`-byte packet sent from `src` to `dst` at `now` arrives.
    ///
    /// Exactly one random number is drawn for a lost packet and two for a delivered one, so a
    /// given seed and sequence of packets always yields the same verdicts. A packet whose
    /// delivery time would fall outside what an `Instant` can hold is dropped.
    pub fn process(&mut self, src: SocketAddr, dst: SocketAddr, len: usize, now: Instant) -> Verdict {
        if self.rng.gen::<f64>() < self.config.loss {
            return Verdict::Drop;
        }

        let mut delay = self.delay;
        let reordered = self.rng.gen::<f64>() < self.config.reorder;
        if reordered {
            delay += self.reorder_delay;
        }

        let departure = match self.rate_bps {
            Some(rate_bps) => self.shaper.transmit(src, dst, len, rate_bps, now),
            None => Some(now),
        };
        match departure.and_then(|departure| departure.checked_add(delay)) {
            Some(at) => Verdict::Deliver { at, reordered },
            None => {
                warn!("delivery time of {} byte packet {} -> {} out of range, dropping", len, src, dst);
                Verdict::Drop
            },
        }
    }
}

impl fmt::Debug for Impairment {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Impairment")
            .field("config", &self.config)
            .field("shaper", &self.shaper)
            .finish()
    }
}
