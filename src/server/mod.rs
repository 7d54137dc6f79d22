//! Tokio-based owner for wirelink connections.
//!
//! [`Server`] accepts TCP connections on worker tasks, wraps each stream in a
//! [`Connection`](crate::Connection) and starts it. Every accept worker and
//! every connection loop runs on one task tracker, so shutdown is a matter of
//! cancelling a single token and waiting for the tracker to empty.

use std::sync::Arc;

use tokio::{net::TcpListener, sync::oneshot};

use crate::{
    callback::ConnectionCallback,
    codec::{FrameCodec, LengthDelimitedFrameCodec},
    config::ConnectionConfig,
    registry::ConnectionRegistry,
};

/// TCP server running a [`ConnectionCallback`] on every accepted connection.
///
/// The server carries a typestate `S` indicating whether it is [`Unbound`]
/// or [`Bound`]. New servers start `Unbound` and must call
/// [`bind`](Server::bind) or
/// [`bind_existing_listener`](Server::bind_existing_listener) before
/// running.
///
/// # Examples
///
/// ```no_run
/// use wirelink::{EchoCallback, Server};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), wirelink::ServerError> {
/// Server::new()
///     .callback(EchoCallback)
///     .workers(2)
///     .bind(([127, 0, 0, 1], 7000).into())?
///     .run()
///     .await
/// # }
/// ```
pub struct Server<C = LengthDelimitedFrameCodec, S = Unbound>
where
    C: FrameCodec,
    S: ServerState,
{
    pub(crate) callback: Arc<dyn ConnectionCallback>,
    pub(crate) codec: C,
    pub(crate) config: ConnectionConfig,
    pub(crate) workers: usize,
    pub(crate) backoff_config: BackoffConfig,
    /// Fired once, after every accept worker has been spawned.
    pub(crate) ready_tx: Option<oneshot::Sender<()>>,
    pub(crate) registry: Arc<ConnectionRegistry>,
    pub(crate) state: S,
}

/// Marker indicating the server has not yet bound a listener.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unbound;

/// Marker indicating the server is bound to a TCP listener.
#[derive(Debug, Clone)]
pub struct Bound {
    pub(crate) listener: Arc<TcpListener>,
}

/// Trait implemented by [`Unbound`] and [`Bound`] to model binding typestate.
pub trait ServerState: sealed::Sealed {}

mod sealed {
    //! Prevent external implementations of [`ServerState`].

    pub trait Sealed {}
    impl Sealed for super::Unbound {}
    impl Sealed for super::Bound {}
}

impl ServerState for Unbound {}
impl ServerState for Bound {}

mod config;
mod connection;
pub mod error;
mod runtime;

pub use error::ServerError;
/// Re-exported configuration types for server backoff behavior.
pub use runtime::BackoffConfig;

#[cfg(test)]
pub(crate) mod test_util;
