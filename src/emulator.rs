use crate::priv_prelude::*;
use crate::{handshake, socket};
use thiserror::Error;
use tokio::net::UdpSocket;

/// Error raised when an [`Emulator`] can't be started.
#[derive(Debug, Error)]
pub enum BindError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("address {addr} is already in use")]
    AddrInUse {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
    #[error("permission denied binding to {addr}")]
    PermissionDenied {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
    #[error("failed to bind udp socket to {addr}: {source}")]
    Io {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
}

impl BindError {
    fn from_io(addr: SocketAddr, source: io::Error) -> BindError {
        match source.kind() {
            io::ErrorKind::AddrInUse => BindError::AddrInUse { addr, source },
            io::ErrorKind::PermissionDenied => BindError::PermissionDenied { addr, source },
            _ => BindError::Io { addr, source },
        }
    }
}

/// A UDP relay which impairs the traffic of the endpoint pair it connects.
///
/// Endpoints send their handshake to the emulator's address, then send data to the same address.
/// Once two endpoints have named each other, data from one is passed through the
/// [`Impairment`](crate::Impairment) pipeline and, if it survives, delivered to the other at
/// the time the pipeline decides. Everything runs on one task: [`run`](crate::Emulator::run)
/// alternates between reading the socket and sending whatever has become due.
pub struct Emulator {
    socket: UdpSocket,
    endpoints: Endpoints,
    impairment: Impairment,
    scheduler: Scheduler,
    recv_buf: Vec<u8>,
    stats: Arc<Stats>,
}

impl Emulator {
    /// Validate `config` and bind the emulator's socket. Must be called within a tokio runtime.
    pub async fn bind(config: EmulatorConfig) -> Result<Emulator, BindError> {
        config.validate()?;
        let impairment = Impairment::new(config.impairment, config.seed)?;
        let socket = match socket::bind_udp(config.bind_addr) {
            Ok(socket) => socket,
            Err(err) => return Err(BindError::from_io(config.bind_addr, err)),
        };
        info!(
            "emulator listening on {} (loss={} delay_ms={} reorder={} rate_kbps={} seed={})",
            config.bind_addr,
            config.impairment.loss,
            config.impairment.delay_ms,
            config.impairment.reorder,
            config.impairment.rate_kbps,
            config.seed,
        );
        Ok(Emulator {
            socket,
            endpoints: Endpoints::new(),
            impairment,
            scheduler: Scheduler::new(),
            recv_buf: vec![0u8; config.max_datagram_size],
            stats: Arc::new(Stats::new()),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// A handle to the emulator's counters. Remains readable while the emulator runs.
    pub fn stats(&self) -> Arc<Stats> {
        self.stats.clone()
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Number of packets waiting to be delivered.
    pub fn in_flight(&self) -> usize {
        self.scheduler.len()
    }

    /// Run forever. Only returns if the socket fails.
    pub async fn run(mut self) -> io::Result<Infallible> {
        loop {
            self.turn().await?;
        }
    }

    /// One iteration of the event loop: wait for a datagram, but no longer than until the next
    /// delivery is due, handle it if one came, then send everything that's due.
    pub async fn turn(&mut self) -> io::Result<()> {
        if let Some((len, src)) = self.wait_for_datagram().await? {
            self.handle_datagram(src, len, Instant::now());
        }
        self.deliver_due(Instant::now()).await
    }

    async fn wait_for_datagram(&mut self) -> io::Result<Option<(usize, SocketAddr)>> {
        let recv = self.socket.recv_from(&mut self.recv_buf);
        let res = match self.scheduler.next_delivery() {
            None => recv.await,
            Some(deadline) => match tokio::time::timeout_at(deadline.into(), recv).await {
                Ok(res) => res,
                Err(_elapsed) => return Ok(None),
            },
        };
        match res {
            Ok(received) => Ok(Some(received)),
            // ICMP errors from an earlier send to a closed port show up here on some platforms.
            Err(err) if matches!(
                err.kind(),
                io::ErrorKind::ConnectionRefused | io::ErrorKind::ConnectionReset,
            ) => {
                warn!("ignoring receive error: {}", err);
                Ok(None)
            },
            Err(err) => Err(err),
        }
    }

    fn handle_datagram(&mut self, src: SocketAddr, len: usize, now: Instant) {
        self.stats.record_received();
        match handshake::classify(&self.recv_buf[..len]) {
            Message::Handshake(handshake) => {
                self.stats.record_handshake();
                let peer_opt = self.endpoints.handle_handshake(src, handshake);
                debug!("{} sent {}, paired with {:?}", src, handshake, peer_opt);
            },
            Message::MalformedHandshake => {
                self.stats.record_malformed_handshake();
                debug!("ignoring malformed handshake from {}", src);
            },
            Message::Data(data) => {
                let dst = match self.endpoints.destination(src) {
                    Some(dst) => dst,
                    None => {
                        self.stats.record_unpaired();
                        trace!("dropping {} bytes from unpaired {}", data.len(), src);
                        return;
                    },
                };
                match self.impairment.process(src, dst, data.len(), now) {
                    Verdict::Drop => {
                        self.stats.record_lost();
                        trace!("lost {} bytes {} -> {}", data.len(), src, dst);
                    },
                    Verdict::Deliver { at, reordered } => {
                        if reordered {
                            self.stats.record_reordered();
                        }
                        let seq = self.scheduler.push(at, dst, Bytes::copy_from_slice(data));
                        trace!(
                            "scheduled #{} ({} bytes {} -> {}) in {:?}",
                            seq,
                            data.len(),
                            src,
                            dst,
                            at.saturating_duration_since(now),
                        );
                    },
                }
            },
        }
    }

    async fn deliver_due(&mut self, now: Instant) -> io::Result<()> {
        for delivery in self.scheduler.pop_due(now) {
            let Delivery { seq, destination, payload, .. } = delivery;
            self.socket.send_to(&payload, destination).await?;
            self.stats.record_delivered(payload.len());
            trace!("delivered #{} ({} bytes) to {}", seq, payload.len(), destination);
        }
        Ok(())
    }
}

impl fmt::Debug for Emulator {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Emulator")
            .field("socket", &self.socket)
            .field("endpoints", &self.endpoints)
            .field("impairment", &self.impairment)
            .field("in_flight", &self.scheduler.len())
            .finish()
    }
}
