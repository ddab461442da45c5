use crate::priv_prelude::*;

/// A packet waiting to be delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// When the packet is due.
    pub at: Instant,
    /// Breaks ties between packets due at the same instant. Earlier-scheduled goes first.
    pub seq: u64,
    pub destination: SocketAddr,
    pub payload: Bytes,
}

/// Packets in flight, ordered by delivery time then by the order they were scheduled.
#[derive(Debug, Default)]
pub struct Scheduler {
    pending: BTreeMap<(Instant, u64), (SocketAddr, Bytes)>,
    next_seq: u64,
}

impl Scheduler {
    pub fn new() -> Scheduler {
        Scheduler::default()
    }

    /// Schedule `payload` to go to `destination` at `at`. Returns the sequence number assigned
    /// to the packet.
    pub fn push(&mut self, at: Instant, destination: SocketAddr, payload: Bytes) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.pending.insert((at, seq), (destination, payload));
        seq
    }

    /// The earliest pending delivery time, if anything is pending.
    pub fn next_delivery(&self) -> Option<Instant> {
        self.pending.first_key_value().map(|(&(at, _seq), _)| at)
    }

    /// How long from `now` until the earliest pending delivery. `None` if nothing is pending,
    /// zero if something is already overdue.
    pub fn time_until_next(&self, now: Instant) -> Option<Duration> {
        self.next_delivery().map(|at| at.saturating_duration_since(now))
    }

    /// Remove every packet due at or before `now`, in delivery order.
    pub fn pop_due(&mut self, now: Instant) -> impl Iterator<Item = Delivery> + '_ {
        std::iter::from_fn(move || {
            let entry = self.pending.first_entry()?;
            if entry.key().0 > now {
                return None;
            }
            let ((at, seq), (destination, payload)) = entry.remove_entry();
            Some(Delivery { at, seq, destination, payload })
        })
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
