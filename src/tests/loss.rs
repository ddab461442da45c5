use crate::priv_prelude::*;
use super::*;
use futures::join;

/// Send `num_msgs` numbered packets from `a` to `b` through `emulator` and return the numbers
/// that made it.
async fn send_numbered(
    emulator: &TestEmulator,
    a: &UdpSocket,
    b: &UdpSocket,
    num_msgs: u32,
) -> Vec<u32> {
    let sender = async {
        for val in 0..num_msgs {
            a.send_to(&val.to_be_bytes(), emulator.addr).await.unwrap();
            if val % 10 == 0 {
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        }
    };
    let receiver = recv_all(b, Duration::from_millis(300));
    let ((), received) = join!(sender, receiver);
    received
    .into_iter()
    .map(|payload| u32::from_be_bytes(payload[..].try_into().unwrap()))
    .collect()
}

#[tokio::test(flavor = "multi_thread")]
async fn zero_loss_delivers_everything() {
    const NUM_MSGS: u32 = 500;

    let emulator = TestEmulator::start(EmulatorConfig::new().loss(0.0).delay_ms(10.0)).await;
    let (a, b) = paired_endpoints(&emulator).await;

    let received = send_numbered(&emulator, &a, &b, NUM_MSGS).await;
    assert_eq!(received, (0..NUM_MSGS).collect::<Vec<_>>());
    assert_eq!(emulator.stats().lost, 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn full_loss_delivers_nothing() {
    const NUM_MSGS: u32 = 100;

    let emulator = TestEmulator::start(EmulatorConfig::new().loss(1.0)).await;
    let (a, b) = paired_endpoints(&emulator).await;

    let received = send_numbered(&emulator, &a, &b, NUM_MSGS).await;
    assert!(received.is_empty());

    let stats = emulator.stats();
    assert_eq!(stats.lost, u64::from(NUM_MSGS));
    assert_eq!(stats.delivered, 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn partial_loss_is_approx_correct() {
    const NUM_MSGS: u32 = 1000;
    const LOSS_RATE: f64 = 0.3;

    let emulator = TestEmulator::start(EmulatorConfig::new().loss(LOSS_RATE)).await;
    let (a, b) = paired_endpoints(&emulator).await;

    let received = send_numbered(&emulator, &a, &b, NUM_MSGS).await;
    let lost_count = NUM_MSGS as usize - received.len();
    let loss_rate = (lost_count as f64) / (NUM_MSGS as f64);
    assert!(loss_rate < LOSS_RATE * 1.2);
    assert!(LOSS_RATE < loss_rate * 1.2);

    // Survivors arrive once each, in order.
    assert!(received.windows(2).all(|xs| xs[0] < xs[1]));

    let stats = emulator.stats();
    assert_eq!(stats.lost + stats.delivered, u64::from(NUM_MSGS));
}

#[tokio::test(flavor = "multi_thread")]
async fn same_seed_loses_same_packets() {
    const NUM_MSGS: u32 = 200;

    let run = |seed| async move {
        let emulator = TestEmulator::start(EmulatorConfig::new().loss(0.5).seed(seed)).await;
        let (a, b) = paired_endpoints(&emulator).await;
        send_numbered(&emulator, &a, &b, NUM_MSGS).await
    };

    let first = run(7).await;
    let second = run(7).await;
    let other = run(8).await;
    assert!(!first.is_empty());
    assert_eq!(first, second);
    assert_ne!(first, other);
}
