//! Errors surfaced to callers of a connection's send operations.
//!
//! Loops never return errors to anyone; they log and close. The only failures
//! an application observes directly are the ones below, returned from
//! [`Connection::enqueue_outbound`](crate::Connection::enqueue_outbound) and
//! [`Connection::try_enqueue_outbound`](crate::Connection::try_enqueue_outbound).

use thiserror::Error;

/// Errors returned when queueing outbound bytes on a connection.
#[non_exhaustive]
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionError {
    /// The connection has started closing; nothing more will be written.
    #[error("use of closed network connection")]
    Closed,
    /// The outbound queue was at capacity and the caller asked not to wait.
    #[error("outbound queue full")]
    QueueFull,
}

impl ConnectionError {
    /// Returns `true` if the error means the connection is going away.
    #[must_use]
    pub fn is_closed(&self) -> bool { matches!(self, Self::Closed) }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::ConnectionError;

    #[rstest]
    #[case(ConnectionError::Closed, "use of closed network connection")]
    #[case(ConnectionError::QueueFull, "outbound queue full")]
    fn display_messages(#[case] err: ConnectionError, #[case] expected: &str) {
        assert_eq!(err.to_string(), expected);
    }

    #[test]
    fn only_closed_reports_closed() {
        assert!(ConnectionError::Closed.is_closed());
        assert!(!ConnectionError::QueueFull.is_closed());
    }
}
