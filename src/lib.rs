#![doc(html_root_url = "https://docs.rs/wirelink/latest")]
//! Public API for the `wirelink` library.
//!
//! This crate provides a per-connection actor for framed TCP services: a read
//! loop, a write loop and a dispatch loop sharing one socket, one close signal
//! and one server-wide shutdown signal, torn down exactly once regardless of
//! which side failed first.

pub mod callback;
pub mod codec;
pub mod config;
pub mod connection;
pub mod error;
pub mod metrics;
pub mod panic;
pub mod registry;
pub mod server;
pub mod socket;

pub use callback::{CallbackError, ConnectionCallback, EchoCallback};
pub use codec::{CodecError, FrameCodec, FrameSource, LengthDelimitedFrameCodec};
pub use config::ConnectionConfig;
pub use connection::{Connection, ConnectionOwner};
pub use error::ConnectionError;
pub use registry::{ConnectionId, ConnectionRegistry};
pub use server::{Server, ServerError};
pub use socket::{ShutdownHandle, Socket};
