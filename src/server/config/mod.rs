//! Builder methods for [`Server`].

use std::sync::Arc;

use tokio::sync::oneshot;

use super::{BackoffConfig, Server, ServerState, Unbound};
use crate::{
    callback::{ConnectionCallback, EchoCallback},
    codec::{FrameCodec, LengthDelimitedFrameCodec},
    config::ConnectionConfig,
    registry::ConnectionRegistry,
};

mod binding;


impl Server<LengthDelimitedFrameCodec, Unbound> {
    /// Create an unbound server with the echo callback, the default codec and
    /// default connection limits.
    ///
    /// The worker count defaults to the number of available CPU cores (or 1 if
    /// this cannot be determined).
    #[must_use]
    pub fn new() -> Self {
        let workers = std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get);
        let config = ConnectionConfig::default();
        Self {
            callback: Arc::new(EchoCallback),
            codec: LengthDelimitedFrameCodec::new(config.frame_length()),
            config,
            workers,
            backoff_config: BackoffConfig::default(),
            ready_tx: None,
            registry: Arc::new(ConnectionRegistry::new()),
            state: Unbound,
        }
    }
}

impl Default for Server<LengthDelimitedFrameCodec, Unbound> {
    fn default() -> Self { Self::new() }
}

impl<C, S> Server<C, S>
where
    C: FrameCodec,
    S: ServerState,
{
    /// Set the number of accept workers. Zero is raised to one.
    #[must_use]
    pub fn workers(mut self, count: usize) -> Self {
        self.workers = count.max(1);
        self
    }

    /// Set queue limits for every connection and apply the frame length
    /// limit to the codec.
    #[must_use]
    pub fn config(mut self, config: ConnectionConfig) -> Self {
        self.codec.set_max_frame_length(config.frame_length());
        self.config = config;
        self
    }

    /// Set the callback driving every accepted connection.
    #[must_use]
    pub fn callback<CB>(mut self, callback: CB) -> Self
    where
        CB: ConnectionCallback,
    {
        self.callback = Arc::new(callback);
        self
    }

    /// Replace the framing codec.
    #[must_use]
    pub fn codec<C2>(self, codec: C2) -> Server<C2, S>
    where
        C2: FrameCodec,
    {
        Server {
            callback: self.callback,
            codec,
            config: self.config,
            workers: self.workers,
            backoff_config: self.backoff_config,
            ready_tx: self.ready_tx,
            registry: self.registry,
            state: self.state,
        }
    }

    /// Configure accept-loop back-off. The values are normalised first.
    #[must_use]
    pub fn backoff(mut self, backoff: BackoffConfig) -> Self {
        self.backoff_config = backoff.normalized();
        self
    }

    /// Configure a channel used to signal when the server is ready to accept
    /// connections.
    #[must_use]
    pub fn ready_signal(mut self, tx: oneshot::Sender<()>) -> Self {
        self.ready_tx = Some(tx);
        self
    }

    /// Returns the configured number of worker tasks for the server.
    #[inline]
    #[must_use]
    pub const fn worker_count(&self) -> usize { self.workers }

    /// Limits applied to each connection.
    #[must_use]
    pub const fn connection_config(&self) -> &ConnectionConfig { &self.config }

    /// Registry holding the server's live connections.
    ///
    /// The handle stays valid while the server runs, so callers can inspect
    /// or close connections from outside.
    #[must_use]
    pub fn registry(&self) -> Arc<ConnectionRegistry> { Arc::clone(&self.registry) }
}
