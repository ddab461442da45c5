use crate::priv_prelude::*;
use crate::{handshake, Emulator, StatsSnapshot};
use tokio::net::UdpSocket;

mod delay;
mod loss;

const RECV_BUF_LEN: usize = 4096;

/// A running emulator bound to an ephemeral loopback port.
struct TestEmulator {
    addr: SocketAddr,
    stats: Arc<Stats>,
    task: tokio::task::JoinHandle<io::Result<Infallible>>,
}

impl TestEmulator {
    async fn start(config: EmulatorConfig) -> TestEmulator {
        let config = config.bind_addr(SocketAddr::from((ipv4!("127.0.0.1"), 0)));
        let emulator = Emulator::bind(config).await.unwrap();
        let addr = emulator.local_addr().unwrap();
        let stats = emulator.stats();
        let task = tokio::spawn(emulator.run());
        TestEmulator { addr, stats, task }
    }

    fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Wait until the emulator has read `count` datagrams.
    async fn wait_for_received(&self, count: u64) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while self.stats().received < count {
            assert!(Instant::now() < deadline, "emulator only received {:?}", self.stats());
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    }
}

impl Drop for TestEmulator {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn endpoint() -> UdpSocket {
    UdpSocket::bind(SocketAddr::from((ipv4!("127.0.0.1"), 0))).await.unwrap()
}

fn port_of(socket: &UdpSocket) -> u16 {
    socket.local_addr().unwrap().port()
}

/// Create two endpoints and have them handshake with each other through `emulator`.
async fn paired_endpoints(emulator: &TestEmulator) -> (UdpSocket, UdpSocket) {
    let a = endpoint().await;
    let b = endpoint().await;
    let before = emulator.stats().received;
    a.send_to(&handshake::encode(port_of(&b)), emulator.addr).await.unwrap();
    b.send_to(&handshake::encode(port_of(&a)), emulator.addr).await.unwrap();
    emulator.wait_for_received(before + 2).await;
    (a, b)
}

async fn recv_timeout(socket: &UdpSocket, timeout: Duration) -> Option<(Vec<u8>, SocketAddr)> {
    let mut buf = vec![0u8; RECV_BUF_LEN];
    match tokio::time::timeout(timeout, socket.recv_from(&mut buf)).await {
        Ok(res) => {
            let (len, src) = res.unwrap();
            buf.truncate(len);
            Some((buf, src))
        },
        Err(_elapsed) => None,
    }
}

/// Receive until nothing arrives for `quiet_period`.
async fn recv_all(socket: &UdpSocket, quiet_period: Duration) -> Vec<Vec<u8>> {
    let mut received = Vec::new();
    while let Some((payload, _src)) = recv_timeout(socket, quiet_period).await {
        received.push(payload);
    }
    received
}
