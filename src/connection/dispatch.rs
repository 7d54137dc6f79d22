//! Hands inbound messages to the application callback, one at a time.

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::mpsc;

use super::{Connection, isolate::LoopExit};

/// Deliver each message from `inbound` to the callback in arrival order.
///
/// The next message is not taken until the callback for the current one has
/// returned, so a slow callback backs up the inbound queue and, through it,
/// the read loop.
pub(super) async fn run(conn: Arc<Connection>, mut inbound: mpsc::Receiver<Bytes>) -> LoopExit {
    let signals = conn.signals();
    let callback = Arc::clone(&conn.callback);
    loop {
        let message = tokio::select! {
            biased;

            exit = signals.fired() => return exit,
            next = inbound.recv() => match next {
                Some(message) => message,
                // Read loop has exited.
                None => return LoopExit::Closed,
            },
        };

        let outcome = tokio::select! {
            biased;

            exit = signals.fired() => return exit,
            res = callback.message_arrived(&conn, message) => res,
        };
        if let Err(e) = outcome {
            return LoopExit::Callback(e);
        }
    }
}
