//! Application callbacks invoked by the connection actor.
//!
//! [`ConnectionCallback`] is the capability an application supplies to give a
//! connection its behaviour. Every hook has a default, so an implementation
//! overrides only what it needs; [`EchoCallback`] uses the defaults
//! unchanged: accept every connection, echo every non-empty message, do
//! nothing on close.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use log::debug;
use thiserror::Error;

use crate::{connection::Connection, error::ConnectionError};

/// Failure reported by [`ConnectionCallback::message_arrived`].
///
/// Any error is fatal to the connection: the dispatch loop stops and the
/// connection closes.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum CallbackError {
    /// The message carried no payload.
    #[error("error package: empty message")]
    EmptyMessage,
    /// A reply could not be queued because the connection is closing.
    #[error(transparent)]
    Connection(#[from] ConnectionError),
    /// The application rejected the message.
    #[error("message rejected: {0}")]
    Rejected(String),
}

impl CallbackError {
    /// Build a [`CallbackError::Rejected`] from any displayable reason.
    pub fn rejected(reason: impl std::fmt::Display) -> Self { Self::Rejected(reason.to_string()) }
}

/// Hooks an application implements to drive a connection.
///
/// `connect` runs once before the loops start. `message_arrived` runs from
/// the dispatch loop only, once per inbound message in arrival order, never
/// concurrently with itself for the same connection. `closed` runs exactly
/// once from the close path, after the socket has been shut down.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use async_trait::async_trait;
/// use bytes::Bytes;
/// use wirelink::{CallbackError, Connection, ConnectionCallback};
///
/// struct Upper;
///
/// #[async_trait]
/// impl ConnectionCallback for Upper {
///     async fn message_arrived(
///         &self,
///         conn: &Arc<Connection>,
///         message: Bytes,
///     ) -> Result<(), CallbackError> {
///         let reply = message.to_ascii_uppercase();
///         conn.enqueue_outbound(Bytes::from(reply)).await?;
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait ConnectionCallback: Send + Sync + 'static {
    /// Decide whether to serve a freshly accepted connection.
    ///
    /// Returning `false` aborts start-up: no loops are launched and the
    /// connection may be discarded.
    fn connect(&self, conn: &Arc<Connection>) -> bool {
        debug!(
            "connection come: id={}, peer={:?}",
            conn.id(),
            conn.remote_addr()
        );
        true
    }

    /// Handle one inbound message.
    ///
    /// The default rejects empty messages and echoes everything else back
    /// through the outbound queue.
    ///
    /// # Errors
    ///
    /// Any error closes the connection.
    async fn message_arrived(
        &self,
        conn: &Arc<Connection>,
        message: Bytes,
    ) -> Result<(), CallbackError> {
        if message.is_empty() {
            return Err(CallbackError::EmptyMessage);
        }
        debug!(
            "message arrived: id={}, len={}",
            conn.id(),
            message.len()
        );
        conn.enqueue_outbound(message).await?;
        Ok(())
    }

    /// Observe the end of a connection.
    fn closed(&self, _conn: &Connection) {}
}

/// Callback using every default: accept, echo, ignore close.
#[derive(Clone, Copy, Debug, Default)]
pub struct EchoCallback;

impl ConnectionCallback for EchoCallback {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_keeps_reason() {
        let err = CallbackError::rejected("bad opcode 7");
        assert_eq!(err.to_string(), "message rejected: bad opcode 7");
    }

    #[test]
    fn connection_errors_are_transparent() {
        let err = CallbackError::from(ConnectionError::Closed);
        assert_eq!(err.to_string(), ConnectionError::Closed.to_string());
    }
}
