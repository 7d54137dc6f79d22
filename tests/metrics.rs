//! Metrics recorded by the connection loops.
//!
//! Uses `metrics_util::debugging::DebuggingRecorder` installed as a local
//! recorder around a current-thread runtime, so every loop reports into it.

use std::sync::Arc;

use rstest::rstest;
use serial_test::serial;
use wirelink::{
    ConnectionConfig,
    EchoCallback,
    connection::active_connection_count,
    metrics::{Direction, ERRORS_TOTAL, FRAMES_PROCESSED, inc_frames},
};
use wirelink_testing::{
    PeerHarness,
    metrics::{CounterSnapshot, debugging_recorder},
};

fn block_on<F: std::future::Future>(fut: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("build runtime")
        .block_on(fut)
}

#[rstest]
#[case(Direction::Inbound, "inbound")]
#[case(Direction::Outbound, "outbound")]
fn frame_helper_labels_direction(#[case] direction: Direction, #[case] label: &str) {
    let (snapshotter, recorder) = debugging_recorder();
    metrics::with_local_recorder(&recorder, || inc_frames(direction));
    let counters = CounterSnapshot::take(&snapshotter);
    assert_eq!(counters.counter(FRAMES_PROCESSED, Some(("direction", label))), 1);
}

#[rstest]
fn one_snapshot_answers_repeated_queries() {
    let (snapshotter, recorder) = debugging_recorder();
    metrics::with_local_recorder(&recorder, || {
        inc_frames(Direction::Inbound);
        inc_frames(Direction::Inbound);
        inc_frames(Direction::Outbound);
    });
    let counters = CounterSnapshot::take(&snapshotter);
    let inbound = Some(("direction", "inbound"));
    assert_eq!(counters.counter(FRAMES_PROCESSED, inbound), 2);
    assert_eq!(counters.counter(FRAMES_PROCESSED, inbound), 2);
    assert_eq!(
        counters.counter(FRAMES_PROCESSED, Some(("direction", "outbound"))),
        1
    );
    assert_eq!(counters.counter(FRAMES_PROCESSED, None), 3);
}

#[rstest]
#[serial]
fn echo_counts_frames_both_ways() {
    let (snapshotter, recorder) = debugging_recorder();
    metrics::with_local_recorder(&recorder, || {
        block_on(async {
            let mut harness =
                PeerHarness::start(Arc::new(EchoCallback), ConnectionConfig::default());
            harness.send_frame(b"one").await.expect("send");
            harness.send_frame(b"two").await.expect("send");
            assert_eq!(harness.read_bytes(6).await.expect("read"), b"onetwo");
            harness.connection().close();
            assert!(harness.drain().await);
        });
    });

    let counters = CounterSnapshot::take(&snapshotter);
    assert_eq!(
        counters.counter(FRAMES_PROCESSED, Some(("direction", "inbound"))),
        2
    );
    assert_eq!(
        counters.counter(FRAMES_PROCESSED, Some(("direction", "outbound"))),
        2
    );
}

#[rstest]
#[serial]
fn empty_message_counts_as_callback_error() {
    let (snapshotter, recorder) = debugging_recorder();
    metrics::with_local_recorder(&recorder, || {
        block_on(async {
            let mut harness =
                PeerHarness::start(Arc::new(EchoCallback), ConnectionConfig::default());
            harness.send_frame(b"").await.expect("send");
            assert!(harness.drain().await);
        });
    });

    let counters = CounterSnapshot::take(&snapshotter);
    assert_eq!(counters.counter(ERRORS_TOTAL, Some(("kind", "callback"))), 1);
}

#[rstest]
#[serial]
fn live_connection_gauge_follows_connection_lifetime() {
    let before = active_connection_count();
    let harness = PeerHarness::new(Arc::new(EchoCallback), ConnectionConfig::default());
    assert_eq!(active_connection_count(), before + 1);
    harness.connection().close();
    drop(harness);
    assert_eq!(active_connection_count(), before);
}
