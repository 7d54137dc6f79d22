//! Panic isolation for the per-connection loops.

use std::{future::Future, io, panic::AssertUnwindSafe, sync::Arc};

use futures::FutureExt;
use log::{debug, error, warn};

use super::Connection;
use crate::{callback::CallbackError, codec::CodecError};

/// Which of the three loops a task runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum LoopRole {
    Read,
    Write,
    Dispatch,
}

impl LoopRole {
    pub(super) fn as_str(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::Dispatch => "dispatch",
        }
    }
}

/// Why a loop returned.
#[derive(Debug)]
pub(super) enum LoopExit {
    /// The owner's shutdown token fired.
    ServerShutdown,
    /// The connection started closing, or a sibling loop went away.
    Closed,
    /// The peer closed its side at a frame boundary.
    PeerClosed,
    /// The inbound byte stream could not be decoded.
    Codec(CodecError),
    /// Writing a buffer to the socket failed.
    Write(io::Error),
    /// The application callback rejected a message.
    Callback(CallbackError),
}

/// Run `body` on the owner's tracker. Whatever ends it, return or panic, the
/// connection is closed afterwards.
pub(super) fn spawn_isolated<F>(conn: &Arc<Connection>, role: LoopRole, body: F)
where
    F: Future<Output = LoopExit> + Send + 'static,
{
    let conn = Arc::clone(conn);
    let tracker = conn.owner.tracker.clone();
    tracker.spawn(async move {
        match AssertUnwindSafe(body).catch_unwind().await {
            Ok(exit) => log_exit(&conn, role, exit),
            Err(panic) => {
                // Taken on the same thread that panicked: the unwind is caught
                // within the poll that raised it.
                let backtrace = crate::panic::take_panic_backtrace()
                    .map_or_else(|| String::from("<unavailable>"), |bt| bt.to_string());
                let panic_msg = crate::panic::format_panic(panic);
                let id = conn.id();
                let peer_addr = conn.remote_addr();
                crate::metrics::inc_loop_panics(role.as_str());
                error!(
                    "connection loop panicked: role={}, panic={panic_msg}, id={id}, \
                     peer_addr={peer_addr:?}\n{backtrace}",
                    role.as_str()
                );
                tracing::error!(
                    panic = %panic_msg,
                    role = role.as_str(),
                    %id,
                    ?peer_addr,
                    "connection loop panicked"
                );
            }
        }
        conn.close();
    });
}

fn log_exit(conn: &Connection, role: LoopRole, exit: LoopExit) {
    let id = conn.id();
    let peer = conn.remote_addr();
    let role = role.as_str();
    match exit {
        LoopExit::ServerShutdown => debug!("{role} loop stopped by shutdown: id={id}"),
        LoopExit::Closed => debug!("{role} loop stopped: id={id}"),
        LoopExit::PeerClosed => debug!("peer closed connection: id={id}, peer={peer:?}"),
        LoopExit::Codec(e) => {
            crate::metrics::inc_errors(e.error_type());
            warn!(
                "failed to read frame: error={e}, error_type={}, id={id}, peer={peer:?}",
                e.error_type()
            );
        }
        LoopExit::Write(e) => {
            crate::metrics::inc_errors("write");
            error!("failed to write outbound buffer: error={e}, id={id}, peer={peer:?}");
        }
        LoopExit::Callback(e) => {
            crate::metrics::inc_errors("callback");
            warn!("message handling failed: error={e}, id={id}, peer={peer:?}");
        }
    }
}
