//! Errors raised by [`Server`](super::Server) operations.

use std::io;

use thiserror::Error;

/// Errors that may occur while binding or running the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Binding or configuring the listener failed.
    #[error("bind error: {0}")]
    Bind(#[source] io::Error),

    /// Accepting a connection failed in a way that cannot be retried.
    #[error("accept error: {0}")]
    Accept(#[source] io::Error),
}

impl ServerError {
    /// The underlying I/O error.
    #[must_use]
    pub fn io_error(&self) -> &io::Error {
        match self {
            Self::Bind(e) | Self::Accept(e) => e,
        }
    }
}
