//! Transport abstraction owned by a connection.
//!
//! A [`Socket`] is any full-duplex byte stream the actor can split into a
//! read half for the read loop and a write half for the write loop. Besides
//! the streams themselves the actor needs two things from the transport: the
//! peer address for diagnostics, and a [`ShutdownHandle`] the close path can
//! fire from any thread to unblock whichever syscall is in flight.

use std::{fmt, io, net::SocketAddr};

use log::warn;
use socket2::SockRef;
use tokio::{
    io::{AsyncRead, AsyncWrite, DuplexStream},
    net::TcpStream,
};

/// Full-duplex transport wrapped by a [`Connection`](crate::Connection).
pub trait Socket: AsyncRead + AsyncWrite + Send + Unpin + 'static {
    /// Address of the remote end, if the transport has one.
    fn peer_addr(&self) -> Option<SocketAddr> { None }

    /// Produce a handle that shuts the transport down out of band.
    ///
    /// The default handle does nothing; such transports are released when the
    /// loops observe the close signal and drop their halves.
    fn shutdown_handle(&self) -> ShutdownHandle { ShutdownHandle::noop() }
}

impl Socket for TcpStream {
    fn peer_addr(&self) -> Option<SocketAddr> {
        match TcpStream::peer_addr(self) {
            Ok(addr) => Some(addr),
            Err(e) => {
                warn!("failed to retrieve peer address: error={e}");
                None
            }
        }
    }

    fn shutdown_handle(&self) -> ShutdownHandle {
        match SockRef::from(self).try_clone() {
            Ok(socket) => ShutdownHandle::new(move || socket.shutdown(std::net::Shutdown::Both)),
            Err(e) => {
                warn!("failed to duplicate socket for shutdown: error={e}");
                ShutdownHandle::noop()
            }
        }
    }
}

impl Socket for DuplexStream {}

type ShutdownFn = Box<dyn FnOnce() -> io::Result<()> + Send + 'static>;

/// One-shot action closing a transport from outside its I/O tasks.
///
/// # Examples
///
/// ```
/// use std::sync::{
///     Arc,
///     atomic::{AtomicBool, Ordering},
/// };
///
/// use wirelink::ShutdownHandle;
///
/// let fired = Arc::new(AtomicBool::new(false));
/// let flag = Arc::clone(&fired);
/// let handle = ShutdownHandle::new(move || {
///     flag.store(true, Ordering::SeqCst);
///     Ok(())
/// });
/// handle.shutdown().expect("shutdown succeeds");
/// assert!(fired.load(Ordering::SeqCst));
/// ```
#[must_use]
pub struct ShutdownHandle(Option<ShutdownFn>);

impl ShutdownHandle {
    /// Wrap a shutdown action.
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce() -> io::Result<()> + Send + 'static,
    {
        Self(Some(Box::new(f)))
    }

    /// A handle that does nothing when fired.
    pub fn noop() -> Self { Self(None) }

    /// Fire the shutdown action.
    ///
    /// # Errors
    ///
    /// Returns whatever error the transport reported while shutting down.
    pub fn shutdown(self) -> io::Result<()> {
        match self.0 {
            Some(f) => f(),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for ShutdownHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ShutdownHandle")
            .field(&self.0.as_ref().map(|_| "<shutdown>"))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::{TcpListener, TcpStream},
    };

    use super::*;

    #[test]
    fn noop_handle_succeeds() {
        ShutdownHandle::noop()
            .shutdown()
            .expect("noop shutdown never fails");
    }

    #[tokio::test]
    async fn duplex_has_no_peer_address() {
        let (a, _b) = tokio::io::duplex(8);
        assert!(Socket::peer_addr(&a).is_none());
    }

    #[tokio::test]
    async fn tcp_shutdown_handle_unblocks_pending_read() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local_addr");
        let client = TcpStream::connect(addr).await.expect("connect");
        let (mut server, peer) = listener.accept().await.expect("accept");

        assert_eq!(
            Socket::peer_addr(&server),
            Some(peer),
            "peer address should match accept()"
        );

        let handle = server.shutdown_handle();
        let reader = tokio::spawn(async move {
            let mut buf = [0_u8; 8];
            server.read(&mut buf).await
        });
        tokio::task::yield_now().await;
        handle.shutdown().expect("shutdown");

        let read = reader.await.expect("join reader").expect("read returns");
        assert_eq!(read, 0, "shutdown should surface as end of stream");

        let mut client = client;
        let mut buf = [0_u8; 1];
        let n = client.read(&mut buf).await.expect("client read");
        assert_eq!(n, 0, "peer should observe the close");
        let _ = client.write_all(b"x").await;
    }
}
