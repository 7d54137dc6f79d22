//! A panicking callback takes down its own connection and nothing else.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use rstest::rstest;
use serial_test::serial;
use wirelink::{CallbackError, Connection, ConnectionCallback, ConnectionConfig};
use wirelink_testing::{LoggerHandle, PeerHarness, logger, metrics::{CounterSnapshot, debugging_recorder}, recv_expect};

/// Echoes everything except `boom`, which panics.
struct Fragile;

#[async_trait]
impl ConnectionCallback for Fragile {
    async fn message_arrived(
        &self,
        conn: &Arc<Connection>,
        message: Bytes,
    ) -> Result<(), CallbackError> {
        assert_ne!(&message[..], b"boom", "callback hit a poisoned message");
        conn.enqueue_outbound(message).await?;
        Ok(())
    }
}

#[rstest]
#[serial]
#[tokio::test]
async fn panic_is_logged_and_closes_only_the_faulty_connection(mut logger: LoggerHandle) {
    logger.clear();
    let mut faulty = PeerHarness::start(Arc::new(Fragile), ConnectionConfig::default());
    let mut healthy = PeerHarness::start(Arc::new(Fragile), ConnectionConfig::default());

    faulty.send_frame(b"boom").await.expect("send");
    assert!(faulty.drain().await, "faulty connection loops exit");
    assert!(faulty.connection().is_closed());

    healthy.send_frame(b"fine").await.expect("send");
    assert_eq!(recv_expect!(healthy.read_bytes(4)), b"fine");
    assert!(!healthy.connection().is_closed());

    assert!(logger.drain_contains("connection loop panicked: role=dispatch"));
    healthy.connection().close();
}

#[rstest]
#[serial]
fn panic_increments_loop_panic_counter() {
    let (snapshotter, recorder) = debugging_recorder();
    metrics::with_local_recorder(&recorder, || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("build runtime");
        rt.block_on(async {
            let mut harness = PeerHarness::start(Arc::new(Fragile), ConnectionConfig::default());
            harness.send_frame(b"boom").await.expect("send");
            assert!(harness.drain().await);
        });
    });

    let counters = CounterSnapshot::take(&snapshotter);
    assert_eq!(
        counters.counter(wirelink::metrics::LOOP_PANICS, Some(("role", "dispatch"))),
        1
    );
}
