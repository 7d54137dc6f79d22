//! In-memory peer for a single connection.

use std::{io, sync::Arc, time::Duration};

use tokio::{
    io::{AsyncReadExt, AsyncWriteExt, DuplexStream},
    time::timeout,
};
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use wirelink::{
    Connection,
    ConnectionCallback,
    ConnectionConfig,
    ConnectionOwner,
    ConnectionRegistry,
    LengthDelimitedFrameCodec,
};

use crate::frames::encode_frame;

const DUPLEX_CAPACITY: usize = 64 * 1024;
const DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// A connection plus the client end of its duplex stream.
///
/// The harness plays the owner too: it holds the shutdown token, the task
/// tracker and a registry the connection is entered into.
pub struct PeerHarness {
    conn: Arc<Connection>,
    peer: Option<DuplexStream>,
    shutdown: CancellationToken,
    tracker: TaskTracker,
    registry: Arc<ConnectionRegistry>,
}

impl PeerHarness {
    /// Build a connection without starting it.
    #[must_use]
    pub fn new(callback: Arc<dyn ConnectionCallback>, config: ConnectionConfig) -> Self {
        Self::with_capacity(callback, config, DUPLEX_CAPACITY)
    }

    /// Build a connection whose duplex stream buffers at most `capacity`
    /// bytes in each direction.
    #[must_use]
    pub fn with_capacity(
        callback: Arc<dyn ConnectionCallback>,
        config: ConnectionConfig,
        capacity: usize,
    ) -> Self {
        let (local, peer) = tokio::io::duplex(capacity);
        let shutdown = CancellationToken::new();
        let tracker = TaskTracker::new();
        let registry = Arc::new(ConnectionRegistry::new());
        let owner = ConnectionOwner::new(shutdown.clone(), tracker.clone())
            .with_registry(Arc::clone(&registry));
        let conn = Connection::new(
            local,
            &LengthDelimitedFrameCodec::new(config.frame_length()),
            config,
            callback,
            owner,
        );
        Self {
            conn,
            peer: Some(peer),
            shutdown,
            tracker,
            registry,
        }
    }

    /// Build and start a connection.
    ///
    /// # Panics
    ///
    /// Panics if the callback refuses the connection.
    #[must_use]
    pub fn start(callback: Arc<dyn ConnectionCallback>, config: ConnectionConfig) -> Self {
        let harness = Self::new(callback, config);
        assert!(harness.conn.start(), "callback refused the connection");
        harness
    }

    /// The connection under test.
    #[must_use]
    pub fn connection(&self) -> &Arc<Connection> { &self.conn }

    /// The owner's shutdown token.
    #[must_use]
    pub fn shutdown_token(&self) -> &CancellationToken { &self.shutdown }

    /// The tracker the connection's loops run on.
    #[must_use]
    pub fn tracker(&self) -> &TaskTracker { &self.tracker }

    /// The registry the connection is entered into once started.
    #[must_use]
    pub fn registry(&self) -> &Arc<ConnectionRegistry> { &self.registry }

    fn peer(&mut self) -> io::Result<&mut DuplexStream> {
        self.peer
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "peer has hung up"))
    }

    /// Write `payload` as one length-prefixed frame.
    ///
    /// # Errors
    ///
    /// Returns any error from the duplex stream.
    pub async fn send_frame(&mut self, payload: &[u8]) -> io::Result<()> {
        self.send_raw(&encode_frame(payload)).await
    }

    /// Write bytes exactly as given.
    ///
    /// # Errors
    ///
    /// Returns any error from the duplex stream.
    pub async fn send_raw(&mut self, bytes: &[u8]) -> io::Result<()> {
        let peer = self.peer()?;
        peer.write_all(bytes).await?;
        peer.flush().await
    }

    /// Read exactly `len` bytes written by the connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection's side closes first.
    pub async fn read_bytes(&mut self, len: usize) -> io::Result<Vec<u8>> {
        let mut buf = vec![0; len];
        self.peer()?.read_exact(&mut buf).await?;
        Ok(buf)
    }

    /// Read until the connection's side of the stream is dropped.
    ///
    /// # Errors
    ///
    /// Returns any error from the duplex stream.
    pub async fn read_to_end(&mut self) -> io::Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.peer()?.read_to_end(&mut buf).await?;
        Ok(buf)
    }

    /// Drop the client end, as a peer closing its socket would.
    pub fn hang_up(&mut self) { self.peer = None; }

    /// Close the tracker and wait for every loop to exit.
    ///
    /// Returns `false` if the loops are still running after two seconds.
    pub async fn drain(&self) -> bool {
        self.tracker.close();
        timeout(DRAIN_TIMEOUT, self.tracker.wait()).await.is_ok()
    }
}
