//! Echo server binary for `wirelink`.
//!
//! Every framed message a client sends is written back to it unframed.
//! Runs until Ctrl-C, then drains open connections.

mod cli;

use std::net::SocketAddr;

use clap::Parser;
use wirelink::{ConnectionConfig, EchoCallback, Server};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Applications embedding the library should install their own subscriber.
    tracing_subscriber::fmt::init();

    let cli = cli::Cli::parse();
    if let Some(addr) = cli.metrics_addr {
        install_metrics_exporter(addr)?;
    }

    let config = ConnectionConfig::default()
        .send_limit(cli.send_limit)
        .receive_limit(cli.receive_limit)
        .max_frame_length(cli.max_frame_length);
    let mut server = Server::new().callback(EchoCallback).config(config);
    if let Some(workers) = cli.workers {
        server = server.workers(workers);
    }
    server.bind(cli.bind)?.run().await?;
    Ok(())
}

#[cfg(feature = "metrics")]
fn install_metrics_exporter(addr: SocketAddr) -> Result<(), Box<dyn std::error::Error>> {
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;
    tracing::info!(%addr, "prometheus exporter listening");
    Ok(())
}

#[cfg(not(feature = "metrics"))]
fn install_metrics_exporter(addr: SocketAddr) -> Result<(), Box<dyn std::error::Error>> {
    tracing::warn!(%addr, "built without the metrics feature; ignoring --metrics-addr");
    Ok(())
}
