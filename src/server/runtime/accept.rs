//! Accept loop feeding connections to the owner's tracker.

use std::{io, net::SocketAddr, sync::Arc};

use async_trait::async_trait;
use log::warn;
use tokio::{
    net::{TcpListener, TcpStream},
    time::sleep,
};

use super::backoff::BackoffConfig;
use crate::{codec::FrameCodec, connection::ConnectionOwner, server::connection::ConnectionFactory};

/// Source of incoming connections consumed by the accept loop.
///
/// Implementations must be cancellation-safe: dropping a pending `accept()`
/// future must not leak resources.
#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub(in crate::server) trait AcceptListener: Send + Sync {
    async fn accept(&self) -> io::Result<(TcpStream, SocketAddr)>;
    fn local_addr(&self) -> io::Result<SocketAddr>;
}

#[async_trait]
impl AcceptListener for TcpListener {
    async fn accept(&self) -> io::Result<(TcpStream, SocketAddr)> {
        TcpListener::accept(self).await
    }

    fn local_addr(&self) -> io::Result<SocketAddr> { TcpListener::local_addr(self) }
}

pub(in crate::server) struct AcceptLoopOptions<C> {
    pub factory: ConnectionFactory<C>,
    pub owner: ConnectionOwner,
    pub backoff: BackoffConfig,
}

/// Accept connections from `listener` until the owner's shutdown token fires.
///
/// Each accepted stream becomes a started [`Connection`](crate::Connection)
/// whose loops run on the owner's tracker. Failed accepts are logged and
/// retried after an exponentially growing delay.
pub(in crate::server) async fn accept_loop<L, C>(listener: Arc<L>, options: AcceptLoopOptions<C>)
where
    L: AcceptListener + 'static,
    C: FrameCodec,
{
    let AcceptLoopOptions {
        factory,
        owner,
        backoff,
    } = options;
    let backoff = backoff.normalized();
    let shutdown = owner.shutdown_token().clone();
    let mut delay = backoff.initial_delay;
    loop {
        let accepted = tokio::select! {
            biased;

            () = shutdown.cancelled() => return,
            res = listener.accept() => res,
        };
        match accepted {
            Ok((stream, _)) => {
                factory.serve(stream, &owner);
                delay = backoff.initial_delay;
            }
            Err(e) => {
                let local_addr = listener.local_addr().ok();
                warn!("accept error: error={e:?}, local_addr={local_addr:?}");
                tokio::select! {
                    biased;

                    () = shutdown.cancelled() => return,
                    () = sleep(delay) => {}
                }
                delay = backoff.next_delay(delay);
            }
        }
    }
}
