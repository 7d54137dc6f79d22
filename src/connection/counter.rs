//! Live connection gauge kept by an RAII guard.

use std::sync::atomic::{AtomicU64, Ordering};

static LIVE: AtomicU64 = AtomicU64::new(0);

/// Held by every [`Connection`](super::Connection) for its whole lifetime.
///
/// Bumps the process-wide count and the metrics gauge on creation and
/// reverses both on drop, so the count follows the last `Arc` rather than the
/// close call.
pub(super) struct ActiveConnection;

impl ActiveConnection {
    pub(super) fn new() -> Self {
        LIVE.fetch_add(1, Ordering::Relaxed);
        crate::metrics::inc_connections();
        Self
    }
}

impl Drop for ActiveConnection {
    fn drop(&mut self) {
        LIVE.fetch_sub(1, Ordering::Relaxed);
        crate::metrics::dec_connections();
    }
}

/// Number of [`Connection`](super::Connection) values currently alive in this
/// process.
#[must_use]
pub fn active_connection_count() -> u64 { LIVE.load(Ordering::Relaxed) }

pub(super) fn current_count() -> u64 { active_connection_count() }
