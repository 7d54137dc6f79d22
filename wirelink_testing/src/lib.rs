//! Utilities for exercising a [`Connection`](wirelink::Connection) from the
//! peer's side during tests.
//!
//! [`PeerHarness`] builds a connection over a `tokio::io::duplex` stream and
//! keeps the other end, so a test can write frames as a client would and read
//! back whatever the connection writes.
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use wirelink::{ConnectionConfig, EchoCallback};
//! use wirelink_testing::PeerHarness;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> std::io::Result<()> {
//! let mut harness = PeerHarness::start(Arc::new(EchoCallback), ConnectionConfig::default());
//! harness.send_frame(b"ping").await?;
//! assert_eq!(harness.read_bytes(4).await?, b"ping");
//! # Ok(())
//! # }
//! ```

pub mod frames;
pub mod logging;
pub mod macros;
pub mod metrics;
pub mod peer;
pub mod recording;

pub use frames::{encode_frame, encode_frames};
pub use logging::{LoggerHandle, logger};
pub use peer::PeerHarness;
pub use recording::RecordingCallback;
