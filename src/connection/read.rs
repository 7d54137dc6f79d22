//! Inbound half: socket to inbound queue.

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::mpsc;

use super::{Connection, isolate::LoopExit};
use crate::{
    codec::FrameSource,
    metrics::{self, Direction},
};

/// Decode frames from `source` and push them onto `inbound` in arrival order.
///
/// Blocks on the queue when it is full, which stops further reads until the
/// dispatch loop catches up.
pub(super) async fn run(
    conn: Arc<Connection>,
    mut source: FrameSource,
    inbound: mpsc::Sender<Bytes>,
) -> LoopExit {
    let signals = conn.signals();
    loop {
        if let Some(exit) = signals.check() {
            return exit;
        }

        let frame = tokio::select! {
            biased;

            exit = signals.fired() => return exit,
            res = source.read_frame() => res,
        };
        let frame = match frame {
            Ok(frame) => frame,
            Err(e) if e.is_clean_close() => return LoopExit::PeerClosed,
            Err(e) => return LoopExit::Codec(e),
        };
        metrics::inc_frames(Direction::Inbound);

        tokio::select! {
            biased;

            exit = signals.fired() => return exit,
            res = inbound.send(frame) => {
                if res.is_err() {
                    return LoopExit::Closed;
                }
            }
        }
    }
}
