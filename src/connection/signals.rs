//! The two stop conditions every loop races against.

use tokio_util::sync::CancellationToken;

use super::isolate::LoopExit;

/// Server shutdown and connection close, observed together.
pub(super) struct Signals {
    shutdown: CancellationToken,
    closing: CancellationToken,
}

impl Signals {
    pub(super) fn new(shutdown: CancellationToken, closing: CancellationToken) -> Self {
        Self { shutdown, closing }
    }

    /// Non-blocking check made before starting a new operation.
    pub(super) fn check(&self) -> Option<LoopExit> {
        if self.shutdown.is_cancelled() {
            Some(LoopExit::ServerShutdown)
        } else if self.closing.is_cancelled() {
            Some(LoopExit::Closed)
        } else {
            None
        }
    }

    /// Resolve once either signal fires. Server shutdown wins a tie.
    pub(super) async fn fired(&self) -> LoopExit {
        tokio::select! {
            biased;

            () = self.shutdown.cancelled() => LoopExit::ServerShutdown,
            () = self.closing.cancelled() => LoopExit::Closed,
        }
    }
}
