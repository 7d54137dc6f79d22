//! Listener binding for [`Server`].

use std::{
    net::{SocketAddr, TcpListener as StdTcpListener},
    sync::Arc,
};

use tokio::net::TcpListener;

use crate::{
    codec::FrameCodec,
    server::{Bound, Server, ServerError, ServerState, Unbound},
};

impl<C, S> Server<C, S>
where
    C: FrameCodec,
    S: ServerState,
{
    fn bind_to_listener(self, std_listener: StdTcpListener) -> Result<Server<C, Bound>, ServerError> {
        let Server {
            callback,
            codec,
            config,
            workers,
            backoff_config,
            ready_tx,
            registry,
            ..
        } = self;

        std_listener
            .set_nonblocking(true)
            .map_err(ServerError::Bind)?;
        let tokio_listener = TcpListener::from_std(std_listener).map_err(ServerError::Bind)?;

        Ok(Server {
            callback,
            codec,
            config,
            workers,
            backoff_config,
            ready_tx,
            registry,
            state: Bound {
                listener: Arc::new(tokio_listener),
            },
        })
    }

    /// Bind to a fresh address.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::net::{Ipv4Addr, SocketAddr};
    ///
    /// use wirelink::Server;
    ///
    /// # #[tokio::main(flavor = "current_thread")]
    /// # async fn main() {
    /// let server = Server::new()
    ///     .bind(SocketAddr::from((Ipv4Addr::LOCALHOST, 0)))
    ///     .expect("bind failed");
    /// assert!(server.local_addr().is_some());
    /// # }
    /// ```
    ///
    /// # Errors
    /// Returns [`ServerError::Bind`] if binding or configuring the listener
    /// fails.
    pub fn bind(self, addr: SocketAddr) -> Result<Server<C, Bound>, ServerError> {
        let std_listener = StdTcpListener::bind(addr).map_err(ServerError::Bind)?;
        self.bind_to_listener(std_listener)
    }

    /// Bind to an existing `StdTcpListener`.
    ///
    /// # Errors
    /// Returns [`ServerError::Bind`] if configuring the listener fails.
    pub fn bind_existing_listener(
        self,
        std_listener: StdTcpListener,
    ) -> Result<Server<C, Bound>, ServerError> {
        self.bind_to_listener(std_listener)
    }
}

impl<C: FrameCodec> Server<C, Unbound> {
    /// Return `None` as the server is not bound.
    #[must_use]
    pub const fn local_addr(&self) -> Option<SocketAddr> { None }
}

impl<C: FrameCodec> Server<C, Bound> {
    /// Returns the bound address, or `None` if retrieving it fails.
    #[must_use]
    pub fn local_addr(&self) -> Option<SocketAddr> { self.state.listener.local_addr().ok() }
}
