//! Connection actor managing one accepted socket.
//!
//! A [`Connection`] owns the socket and runs three loops over it, each on its
//! own task:
//!
//! - the read loop decodes frames and pushes them onto the inbound queue;
//! - the dispatch loop hands each inbound message to the
//!   [`ConnectionCallback`], which may queue replies;
//! - the write loop drains the outbound queue onto the socket in order.
//!
//! Every loop races its blocking operations against two cancellation tokens:
//! the connection's own close signal and the owner's shutdown signal. Whatever
//! ends a loop, a clean exit, an error or a panic, the loop finishes by calling
//! [`Connection::close`], whose side effects run exactly once.

mod counter;
mod dispatch;
mod isolate;
mod lifecycle;
mod read;
mod signals;
mod write;

use std::{
    fmt,
    net::SocketAddr,
    panic::AssertUnwindSafe,
    sync::{Arc, Mutex, PoisonError},
};

use bytes::Bytes;
use counter::ActiveConnection;
pub use counter::active_connection_count;
use isolate::LoopRole;
use lifecycle::Lifecycle;
use log::{error, info, warn};
use signals::Signals;
use tokio::{
    io::AsyncWrite,
    sync::mpsc::{self, error::TrySendError},
};
use tokio_util::{sync::CancellationToken, task::TaskTracker};

use crate::{
    callback::ConnectionCallback,
    codec::{FrameCodec, FrameSource},
    config::ConnectionConfig,
    error::ConnectionError,
    registry::{ConnectionId, ConnectionRegistry},
    socket::{ShutdownHandle, Socket},
};

/// Resources a connection borrows from the server that owns it.
///
/// The shutdown token is observed by every loop of every connection; the
/// tracker counts live loops so the owner can wait for all of them to finish;
/// the optional registry is updated when a connection starts and closes.
///
/// # Examples
///
/// ```
/// use tokio_util::{sync::CancellationToken, task::TaskTracker};
/// use wirelink::ConnectionOwner;
///
/// let owner = ConnectionOwner::new(CancellationToken::new(), TaskTracker::new());
/// assert!(!owner.shutdown_token().is_cancelled());
/// ```
#[derive(Clone)]
pub struct ConnectionOwner {
    shutdown: CancellationToken,
    tracker: TaskTracker,
    registry: Option<Arc<ConnectionRegistry>>,
}

impl ConnectionOwner {
    /// Create an owner from a shutdown token and a loop tracker.
    #[must_use]
    pub fn new(shutdown: CancellationToken, tracker: TaskTracker) -> Self {
        Self {
            shutdown,
            tracker,
            registry: None,
        }
    }

    /// Register started connections in `registry`.
    #[must_use]
    pub fn with_registry(mut self, registry: Arc<ConnectionRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Server-wide shutdown signal.
    #[must_use]
    pub fn shutdown_token(&self) -> &CancellationToken { &self.shutdown }

    /// Tracker counting the loops of every connection spawned by this owner.
    #[must_use]
    pub fn tracker(&self) -> &TaskTracker { &self.tracker }

    /// Registry connections are added to, if any.
    #[must_use]
    pub fn registry(&self) -> Option<&Arc<ConnectionRegistry>> { self.registry.as_ref() }
}

type BoxWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Halves and queue ends handed to the loops by [`Connection::start`].
struct LoopParts {
    source: FrameSource,
    writer: BoxWriter,
    outbound_rx: mpsc::Receiver<Bytes>,
    inbound_tx: mpsc::Sender<Bytes>,
    inbound_rx: mpsc::Receiver<Bytes>,
}

/// Actor driving one socket session.
///
/// Created with [`Connection::new`], started with [`Connection::start`], and
/// torn down by [`Connection::close`] from any loop or from outside.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
///
/// use tokio::net::TcpListener;
/// use tokio_util::{sync::CancellationToken, task::TaskTracker};
/// use wirelink::{
///     Connection,
///     ConnectionConfig,
///     ConnectionOwner,
///     EchoCallback,
///     LengthDelimitedFrameCodec,
/// };
///
/// # async fn demo() -> std::io::Result<()> {
/// let listener = TcpListener::bind("127.0.0.1:0").await?;
/// let owner = ConnectionOwner::new(CancellationToken::new(), TaskTracker::new());
/// let (stream, _) = listener.accept().await?;
/// let conn = Connection::new(
///     stream,
///     &LengthDelimitedFrameCodec::default(),
///     ConnectionConfig::default(),
///     Arc::new(EchoCallback),
///     owner,
/// );
/// conn.start();
/// # Ok(())
/// # }
/// ```
pub struct Connection {
    id: ConnectionId,
    peer_addr: Option<SocketAddr>,
    lifecycle: Lifecycle,
    outbound_tx: mpsc::Sender<Bytes>,
    parts: Mutex<Option<LoopParts>>,
    socket_shutdown: Mutex<Option<ShutdownHandle>>,
    callback: Arc<dyn ConnectionCallback>,
    owner: ConnectionOwner,
    _active: ActiveConnection,
}

impl Connection {
    /// Wrap an accepted socket.
    ///
    /// Queues are sized from `config`; frames are decoded with `codec`.
    /// Nothing runs until [`start`](Self::start) is called.
    #[must_use]
    pub fn new<S, C>(
        socket: S,
        codec: &C,
        config: ConnectionConfig,
        callback: Arc<dyn ConnectionCallback>,
        owner: ConnectionOwner,
    ) -> Arc<Self>
    where
        S: Socket,
        C: FrameCodec,
    {
        let peer_addr = socket.peer_addr();
        let socket_shutdown = socket.shutdown_handle();
        let (reader, writer) = tokio::io::split(socket);
        let (outbound_tx, outbound_rx) = mpsc::channel(config.send_capacity());
        let (inbound_tx, inbound_rx) = mpsc::channel(config.receive_capacity());
        let parts = LoopParts {
            source: FrameSource::new(reader, codec),
            writer: Box::new(writer),
            outbound_rx,
            inbound_tx,
            inbound_rx,
        };
        let conn = Arc::new(Self {
            id: ConnectionId::next(),
            peer_addr,
            lifecycle: Lifecycle::new(),
            outbound_tx,
            parts: Mutex::new(Some(parts)),
            socket_shutdown: Mutex::new(Some(socket_shutdown)),
            callback,
            owner,
            _active: ActiveConnection::new(),
        });
        info!(
            "connection opened: wirelink_active_connections={}, id={}, peer={:?}",
            counter::current_count(),
            conn.id,
            conn.peer_addr
        );
        conn
    }

    /// Ask the callback to accept the connection and launch the loops.
    ///
    /// Returns `false` without spawning anything if the callback refuses (or
    /// panics), if the connection was already started, or if it has already
    /// begun closing.
    pub fn start(self: &Arc<Self>) -> bool {
        if self.closing_started() {
            warn!("start after close ignored: id={}", self.id);
            return false;
        }
        if lock(&self.parts).is_none() {
            warn!("connection already started: id={}", self.id);
            return false;
        }
        let accepted = std::panic::catch_unwind(AssertUnwindSafe(|| self.callback.connect(self)))
            .unwrap_or_else(|panic| {
                error!(
                    "connect callback panicked: panic={}, id={}, peer={:?}",
                    crate::panic::format_panic(panic),
                    self.id,
                    self.peer_addr
                );
                false
            });
        if !accepted {
            info!(
                "connection refused by callback: id={}, peer={:?}",
                self.id, self.peer_addr
            );
            return false;
        }
        let Some(parts) = lock(&self.parts).take() else {
            warn!("connection already started: id={}", self.id);
            return false;
        };
        if let Some(registry) = &self.owner.registry {
            registry.insert(self);
            // A close racing the insert may already have deregistered.
            if self.closing_started() {
                registry.remove(&self.id);
            }
        }
        if self.closing_started() {
            info!("connection closed during start: id={}", self.id);
            return false;
        }
        crate::panic::install_backtrace_hook();

        let LoopParts {
            source,
            writer,
            outbound_rx,
            inbound_tx,
            inbound_rx,
        } = parts;
        isolate::spawn_isolated(
            self,
            LoopRole::Read,
            read::run(Arc::clone(self), source, inbound_tx),
        );
        isolate::spawn_isolated(
            self,
            LoopRole::Write,
            write::run(Arc::clone(self), writer, outbound_rx),
        );
        isolate::spawn_isolated(
            self,
            LoopRole::Dispatch,
            dispatch::run(Arc::clone(self), inbound_rx),
        );
        true
    }

    fn closing_started(&self) -> bool { self.lifecycle.token().is_cancelled() }

    /// Close the connection.
    ///
    /// The first caller triggers the close signal, shuts the socket down,
    /// publishes [`is_closed`](Self::is_closed), runs the callback's `closed`
    /// hook and deregisters the connection. Concurrent callers wait for that
    /// to finish; later callers return immediately.
    pub fn close(&self) {
        if self.lifecycle.is_closed() {
            return;
        }
        self.lifecycle.close_once(|| {
            self.lifecycle.signal();
            self.shutdown_socket();
            self.lifecycle.mark_closed();
            info!(
                "connection closed: id={}, peer={:?}",
                self.id, self.peer_addr
            );
            let callback = &self.callback;
            if let Err(panic) =
                std::panic::catch_unwind(AssertUnwindSafe(|| callback.closed(self)))
            {
                error!(
                    "closed callback panicked: panic={}, id={}, peer={:?}",
                    crate::panic::format_panic(panic),
                    self.id,
                    self.peer_addr
                );
            }
            if let Some(registry) = &self.owner.registry {
                registry.remove(&self.id);
            }
        });
    }

    fn shutdown_socket(&self) {
        let handle = lock(&self.socket_shutdown).take();
        if let Some(handle) = handle
            && let Err(e) = handle.shutdown()
        {
            // The peer may already have reset the connection.
            log::debug!("socket shutdown failed: id={}, error={e}", self.id);
        }
    }

    /// Returns `true` once the close path has run.
    ///
    /// A cheap, non-blocking check for best-effort guards.
    #[must_use]
    pub fn is_closed(&self) -> bool { self.lifecycle.is_closed() }

    /// Wait until the connection starts closing.
    pub async fn closing(&self) { self.lifecycle.token().cancelled().await; }

    /// Queue `buffer` for the write loop, waiting while the queue is full.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError::Closed`] if the connection is closing,
    /// including when it starts closing while this call waits for space.
    pub async fn enqueue_outbound(&self, buffer: Bytes) -> Result<(), ConnectionError> {
        if self.is_closed() {
            return Err(ConnectionError::Closed);
        }
        tokio::select! {
            biased;

            () = self.lifecycle.token().cancelled() => Err(ConnectionError::Closed),
            res = self.outbound_tx.send(buffer) => res.map_err(|_| ConnectionError::Closed),
        }
    }

    /// Queue `buffer` for the write loop without waiting.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError::QueueFull`] if the outbound queue is at
    /// capacity and [`ConnectionError::Closed`] if the connection is closing.
    pub fn try_enqueue_outbound(&self, buffer: Bytes) -> Result<(), ConnectionError> {
        if self.is_closed() || self.lifecycle.token().is_cancelled() {
            return Err(ConnectionError::Closed);
        }
        self.outbound_tx.try_send(buffer).map_err(|e| match e {
            TrySendError::Full(_) => ConnectionError::QueueFull,
            TrySendError::Closed(_) => ConnectionError::Closed,
        })
    }

    /// Address of the remote peer, if known.
    #[must_use]
    pub fn remote_addr(&self) -> Option<SocketAddr> { self.peer_addr }

    /// Identifier assigned to this connection.
    #[must_use]
    pub fn id(&self) -> ConnectionId { self.id }

    fn signals(&self) -> Signals {
        Signals::new(
            self.owner.shutdown.clone(),
            self.lifecycle.token().clone(),
        )
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("peer_addr", &self.peer_addr)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

/// Lock a mutex, recovering the data if a previous holder panicked.
fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
