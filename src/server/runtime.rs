//! Running a bound [`Server`].

mod accept;
mod backoff;

use std::sync::Arc;

#[cfg(test)]
pub(super) use accept::MockAcceptListener;
pub(super) use accept::{AcceptLoopOptions, accept_loop};
pub use backoff::BackoffConfig;
use futures::Future;
use log::{info, warn};
use tokio::signal;
use tokio_util::{sync::CancellationToken, task::TaskTracker};

use super::{Bound, Server, ServerError, connection::ConnectionFactory};
use crate::{codec::FrameCodec, connection::ConnectionOwner};

impl<C> Server<C, Bound>
where
    C: FrameCodec,
{
    /// Run the server until Ctrl-C is received.
    ///
    /// # Errors
    ///
    /// Accept failures are retried with exponential back-off and do not
    /// surface as errors; the `Result` is reserved for fatal conditions.
    pub async fn run(self) -> Result<(), ServerError> {
        self.run_with_shutdown(async {
            let _ = signal::ctrl_c().await;
        })
        .await
    }

    /// Run the server until the `shutdown` future resolves, then drain.
    ///
    /// On shutdown the server-wide token is cancelled: accept workers stop
    /// and every connection loop, idle or busy, observes the signal and
    /// closes its connection. The call returns once every spawned task has
    /// finished.
    ///
    /// # Examples
    ///
    /// ```
    /// use tokio::sync::oneshot;
    /// use wirelink::Server;
    ///
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), wirelink::ServerError> {
    /// let server = Server::new().bind(([127, 0, 0, 1], 0).into())?;
    ///
    /// let (tx, rx) = oneshot::channel::<()>();
    /// let handle = tokio::spawn(async move {
    ///     server
    ///         .run_with_shutdown(async {
    ///             let _ = rx.await;
    ///         })
    ///         .await
    /// });
    ///
    /// let _ = tx.send(());
    /// handle
    ///     .await
    ///     .expect("join server task")
    ///     .expect("server run failed");
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    ///
    /// See [`run`](Self::run).
    pub async fn run_with_shutdown<S>(self, shutdown: S) -> Result<(), ServerError>
    where
        S: Future<Output = ()> + Send,
    {
        let Server {
            callback,
            codec,
            config,
            workers,
            backoff_config,
            ready_tx,
            registry,
            state: Bound { listener },
        } = self;
        let shutdown_token = CancellationToken::new();
        let tracker = TaskTracker::new();
        let owner = ConnectionOwner::new(shutdown_token.clone(), tracker.clone())
            .with_registry(Arc::clone(&registry));
        let factory = ConnectionFactory {
            callback,
            codec,
            config,
        };

        for _ in 0..workers {
            tracker.spawn(accept_loop(
                Arc::clone(&listener),
                AcceptLoopOptions {
                    factory: factory.clone(),
                    owner: owner.clone(),
                    backoff: backoff_config,
                },
            ));
        }
        info!(
            "server listening: local_addr={:?}, workers={workers}",
            listener.local_addr().ok()
        );

        // Signal readiness after all workers have been spawned.
        if let Some(tx) = ready_tx
            && tx.send(()).is_err()
        {
            warn!("failed to send readiness signal: receiver dropped");
        }

        shutdown.await;
        info!(
            "server shutting down: open_connections={}",
            registry.active_ids().len()
        );
        shutdown_token.cancel();
        tracker.close();
        tracker.wait().await;
        info!("server drained");
        Ok(())
    }
}
