//! Test helpers shared across server modules.

use std::net::{Ipv4Addr, SocketAddr, TcpListener as StdTcpListener};

use rstest::fixture;

use super::{Bound, Server};
use crate::codec::LengthDelimitedFrameCodec;

#[fixture]
/// Returns a bound [`StdTcpListener`] on a free port for use in tests.
///
/// Keeping the listener bound prevents another process from claiming the
/// port between discovery and use.
pub fn free_listener() -> StdTcpListener {
    let addr = SocketAddr::new(Ipv4Addr::LOCALHOST.into(), 0);
    StdTcpListener::bind(addr).expect("Failed to bind free port listener")
}

/// Bind a default echo server to `listener`. Needs a Tokio runtime.
pub fn bind_server(listener: StdTcpListener) -> Server<LengthDelimitedFrameCodec, Bound> {
    Server::new()
        .bind_existing_listener(listener)
        .expect("Failed to bind")
}
