//! Per-connection configuration.
//!
//! [`ConnectionConfig`] carries the bounds applied to every connection a
//! server accepts: how many outbound buffers may wait for the write loop, how
//! many decoded inbound messages may wait for the dispatch loop, and the
//! largest frame the default codec will decode. It derives `serde` traits so
//! the owning application can load it from whatever format it already uses.

use serde::{Deserialize, Serialize};

use crate::codec::{MAX_FRAME_LENGTH, MIN_FRAME_LENGTH, clamp_frame_length};

/// Default capacity of the outbound (send) queue.
pub const DEFAULT_SEND_LIMIT: usize = 64;
/// Default capacity of the inbound (receive) queue.
pub const DEFAULT_RECEIVE_LIMIT: usize = 64;
/// Default maximum frame length accepted by the length-delimited codec.
pub const DEFAULT_MAX_FRAME_LENGTH: usize = 64 * 1024;

/// Queue and framing limits for a connection.
///
/// Capacities of zero are raised to one when read through the accessors:
/// both queues are bounded channels and must hold at least one buffer.
///
/// # Examples
///
/// ```
/// use wirelink::ConnectionConfig;
///
/// let config = ConnectionConfig::default()
///     .send_limit(16)
///     .receive_limit(0);
/// assert_eq!(config.send_capacity(), 16);
/// assert_eq!(config.receive_capacity(), 1);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Capacity of the outbound queue drained by the write loop.
    pub send_limit: usize,
    /// Capacity of the inbound queue drained by the dispatch loop.
    pub receive_limit: usize,
    /// Largest frame payload the default codec will accept.
    pub max_frame_length: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            send_limit: DEFAULT_SEND_LIMIT,
            receive_limit: DEFAULT_RECEIVE_LIMIT,
            max_frame_length: DEFAULT_MAX_FRAME_LENGTH,
        }
    }
}

impl ConnectionConfig {
    /// Set the outbound queue capacity.
    #[must_use]
    pub fn send_limit(mut self, limit: usize) -> Self {
        self.send_limit = limit;
        self
    }

    /// Set the inbound queue capacity.
    #[must_use]
    pub fn receive_limit(mut self, limit: usize) -> Self {
        self.receive_limit = limit;
        self
    }

    /// Set the maximum frame length, clamped to
    /// [`MIN_FRAME_LENGTH`]..=[`MAX_FRAME_LENGTH`].
    #[must_use]
    pub fn max_frame_length(mut self, length: usize) -> Self {
        self.max_frame_length = clamp_frame_length(length);
        self
    }

    /// Effective outbound queue capacity.
    #[must_use]
    pub fn send_capacity(&self) -> usize { self.send_limit.max(1) }

    /// Effective inbound queue capacity.
    #[must_use]
    pub fn receive_capacity(&self) -> usize { self.receive_limit.max(1) }

    /// Effective frame length limit.
    #[must_use]
    pub fn frame_length(&self) -> usize { clamp_frame_length(self.max_frame_length) }
}
