//! Bounded queues push back on the producer instead of growing.

use std::{sync::Arc, time::Duration};

use bytes::Bytes;
use rstest::rstest;
use tokio::{
    sync::Semaphore,
    task::yield_now,
    time::{sleep, timeout},
};
use wirelink::{ConnectionConfig, ConnectionError, EchoCallback};
use wirelink_testing::{PeerHarness, RecordingCallback, encode_frames};

#[rstest]
#[tokio::test]
async fn stalled_callback_stops_dispatch_but_keeps_order() {
    let gate = Arc::new(Semaphore::new(0));
    let callback = Arc::new(RecordingCallback::new().gated(Arc::clone(&gate)));
    let config = ConnectionConfig::default().receive_limit(2);
    let mut harness = PeerHarness::start(callback.clone(), config);

    let payloads: Vec<Vec<u8>> = (0u8..10).map(|i| vec![i; 3]).collect();
    harness
        .send_raw(&encode_frames(&payloads))
        .await
        .expect("send frames");

    callback.wait_for_messages(1).await;
    sleep(Duration::from_millis(50)).await;
    assert_eq!(callback.messages().len(), 1, "dispatch must wait for the callback");
    assert!(!harness.connection().is_closed());

    gate.add_permits(payloads.len());
    let seen = callback.wait_for_messages(payloads.len()).await;
    let seen: Vec<Vec<u8>> = seen.into_iter().map(|b| b.to_vec()).collect();
    assert_eq!(seen, payloads);
    harness.connection().close();
}

#[rstest]
#[tokio::test]
async fn full_inbound_queue_stops_socket_reads_without_loss() {
    const RECEIVE_LIMIT: usize = 2;
    let gate = Arc::new(Semaphore::new(0));
    let callback = Arc::new(RecordingCallback::new().gated(Arc::clone(&gate)));
    let config = ConnectionConfig::default().receive_limit(RECEIVE_LIMIT);
    let mut harness = PeerHarness::with_capacity(callback.clone(), config, 64);
    assert!(harness.connection().start());
    let conn = Arc::clone(harness.connection());

    // 40 frames of 12 bytes: far more than the queue, the decoder buffer and
    // the 64-byte duplex can absorb together.
    let payloads: Vec<Vec<u8>> = (0u8..40).map(|i| vec![i; 8]).collect();
    let wire = encode_frames(&payloads);
    let writer = tokio::spawn(async move {
        harness.send_raw(&wire).await.expect("send frames");
        harness
    });

    callback.wait_for_messages(1).await;
    sleep(Duration::from_millis(100)).await;
    assert!(!writer.is_finished(), "peer writes must stall once the queue is full");
    assert_eq!(callback.messages().len(), 1);
    assert!(!conn.is_closed());

    gate.add_permits(payloads.len());
    let harness = timeout(Duration::from_secs(2), writer)
        .await
        .expect("writer resumes")
        .expect("writer joins");
    let seen = callback.wait_for_messages(payloads.len()).await;
    let seen: Vec<Vec<u8>> = seen.into_iter().map(|b| b.to_vec()).collect();
    assert_eq!(seen, payloads);

    harness.connection().close();
    assert!(harness.drain().await);
}

#[rstest]
#[tokio::test]
async fn slow_peer_fills_outbound_queue() {
    let config = ConnectionConfig::default().send_limit(1);
    let harness = PeerHarness::with_capacity(Arc::new(EchoCallback), config, 4);
    assert!(harness.connection().start());

    let mut saw_full = false;
    for _ in 0..16 {
        match harness
            .connection()
            .try_enqueue_outbound(Bytes::from_static(b"abcd"))
        {
            Ok(()) => yield_now().await,
            Err(ConnectionError::QueueFull) => {
                saw_full = true;
                break;
            }
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
    assert!(saw_full, "outbound queue never filled");
    harness.connection().close();
    assert!(harness.drain().await);
}
