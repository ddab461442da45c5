use crate::priv_prelude::*;
use super::*;

#[tokio::test(flavor = "multi_thread")]
async fn single_packet_arrives_after_delay() {
    const DELAY: Duration = Duration::from_millis(50);
    const SLACK: Duration = Duration::from_millis(150);

    let emulator = TestEmulator::start(EmulatorConfig::new().delay_ms(50.0)).await;
    let (a, b) = paired_endpoints(&emulator).await;

    let send_instant = Instant::now();
    a.send_to(b"X", emulator.addr).await.unwrap();
    let (payload, src) = recv_timeout(&b, Duration::from_secs(2)).await.unwrap();
    let elapsed = send_instant.elapsed();

    assert_eq!(payload, b"X");
    assert_eq!(src, emulator.addr);
    assert!(DELAY <= elapsed, "arrived after only {:?}", elapsed);
    assert!(elapsed < DELAY + SLACK, "arrived after {:?}", elapsed);
    assert!(recv_timeout(&b, Duration::from_millis(100)).await.is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn zero_delay_in_order_both_ways() {
    const NUM_MSGS: u32 = 100;

    let emulator = TestEmulator::start(EmulatorConfig::new()).await;
    let (a, b) = paired_endpoints(&emulator).await;

    for (sender, receiver) in [(&a, &b), (&b, &a)] {
        for val in 0..NUM_MSGS {
            sender.send_to(&val.to_be_bytes(), emulator.addr).await.unwrap();
            if val % 10 == 0 {
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        }
        let received = recv_all(receiver, Duration::from_millis(200)).await;
        let expected: Vec<Vec<u8>> = (0..NUM_MSGS).map(|val| val.to_be_bytes().to_vec()).collect();
        assert_eq!(received, expected);
    }

    let stats = emulator.stats();
    assert_eq!(stats.delivered, 2 * u64::from(NUM_MSGS));
    assert_eq!(stats.lost, 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn payloads_are_forwarded_unmodified() {
    let emulator = TestEmulator::start(EmulatorConfig::new().delay_ms(5.0)).await;
    let (a, b) = paired_endpoints(&emulator).await;

    let mut payload = vec![0u8; 1400];
    rand::thread_rng().fill(&mut payload[..]);
    payload[100..106].copy_from_slice(b"HELLO ");
    a.send_to(&payload, emulator.addr).await.unwrap();
    a.send_to(b"", emulator.addr).await.unwrap();
    a.send_to(b"HELLO", emulator.addr).await.unwrap();

    let received = recv_all(&b, Duration::from_millis(200)).await;
    assert_eq!(received, vec![payload, Vec::new(), b"HELLO".to_vec()]);
}

#[tokio::test(flavor = "multi_thread")]
async fn oversized_datagrams_are_truncated() {
    let emulator = TestEmulator::start(EmulatorConfig::new().max_datagram_size(16)).await;
    let (a, b) = paired_endpoints(&emulator).await;

    let payload: Vec<u8> = (0..64).collect();
    a.send_to(&payload, emulator.addr).await.unwrap();
    let (received, _src) = recv_timeout(&b, Duration::from_secs(2)).await.unwrap();
    assert_eq!(received, payload[..16]);
}
