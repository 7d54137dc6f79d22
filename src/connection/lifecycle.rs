//! Close state shared by a connection's loops and its owner.

use std::sync::{
    Once,
    atomic::{AtomicBool, Ordering},
};

use tokio_util::sync::CancellationToken;

/// Once-only close gate.
///
/// `closing` is cancelled first so every blocked loop wakes; `closed` is
/// published only after the socket has been shut down. `once` serialises the
/// close path: concurrent callers block until the winner returns.
pub(super) struct Lifecycle {
    closed: AtomicBool,
    once: Once,
    closing: CancellationToken,
}

impl Lifecycle {
    pub(super) fn new() -> Self {
        Self {
            closed: AtomicBool::new(false),
            once: Once::new(),
            closing: CancellationToken::new(),
        }
    }

    pub(super) fn is_closed(&self) -> bool { self.closed.load(Ordering::Acquire) }

    pub(super) fn token(&self) -> &CancellationToken { &self.closing }

    pub(super) fn signal(&self) { self.closing.cancel(); }

    pub(super) fn mark_closed(&self) { self.closed.store(true, Ordering::Release); }

    /// Run `teardown` if no caller has yet; otherwise wait for the caller
    /// that did.
    pub(super) fn close_once(&self, teardown: impl FnOnce()) { self.once.call_once(teardown); }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use super::Lifecycle;

    #[test]
    fn teardown_runs_once_across_threads() {
        let lifecycle = Arc::new(Lifecycle::new());
        let runs = Arc::new(AtomicUsize::new(0));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let lifecycle = Arc::clone(&lifecycle);
                let runs = Arc::clone(&runs);
                std::thread::spawn(move || {
                    lifecycle.close_once(|| {
                        lifecycle.signal();
                        runs.fetch_add(1, Ordering::SeqCst);
                        lifecycle.mark_closed();
                    });
                    assert!(lifecycle.is_closed());
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("thread completes");
        }
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert!(lifecycle.token().is_cancelled());
    }
}
