//! Command line interface for the `wirelink` echo server.
//!
//! Kept free of library types so `build.rs` can include it to render the
//! man page.

use std::net::SocketAddr;

use clap::Parser;

/// Command line arguments for the `wirelink` binary.
#[derive(Debug, Parser)]
#[command(
    name = "wirelink",
    version,
    about = "Echo server built on the wirelink connection actor"
)]
pub struct Cli {
    /// Address to listen on.
    #[arg(short, long, default_value = "127.0.0.1:7000")]
    pub bind: SocketAddr,

    /// Capacity of each connection's outbound queue.
    #[arg(long, default_value_t = 64)]
    pub send_limit: usize,

    /// Capacity of each connection's inbound queue.
    #[arg(long, default_value_t = 64)]
    pub receive_limit: usize,

    /// Largest accepted frame payload in bytes.
    #[arg(long, default_value_t = 64 * 1024)]
    pub max_frame_length: usize,

    /// Number of accept workers; defaults to the number of CPUs.
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Serve Prometheus metrics on this address.
    #[arg(long)]
    pub metrics_addr: Option<SocketAddr>,
}
