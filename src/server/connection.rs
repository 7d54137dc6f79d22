//! Turning accepted streams into running connections.

use std::sync::Arc;

use log::debug;
use tokio::net::TcpStream;

use crate::{
    callback::ConnectionCallback,
    codec::FrameCodec,
    config::ConnectionConfig,
    connection::{Connection, ConnectionOwner},
};

/// Everything needed to build a connection, cloned into each accept worker.
#[derive(Clone)]
pub(in crate::server) struct ConnectionFactory<C> {
    pub callback: Arc<dyn ConnectionCallback>,
    pub codec: C,
    pub config: ConnectionConfig,
}

impl<C: FrameCodec> ConnectionFactory<C> {
    /// Wrap `stream` and start it under `owner`.
    ///
    /// A refused connection is dropped here, which closes the stream.
    pub(in crate::server) fn serve(
        &self,
        stream: TcpStream,
        owner: &ConnectionOwner,
    ) -> Option<Arc<Connection>> {
        let conn = Connection::new(
            stream,
            &self.codec,
            self.config,
            Arc::clone(&self.callback),
            owner.clone(),
        );
        if conn.start() {
            Some(conn)
        } else {
            debug!("dropping refused connection: id={}", conn.id());
            None
        }
    }
}
