//! Server shutdown closes idle connections and waits for their loops.

use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use rstest::rstest;
use tokio::{io::AsyncReadExt, net::TcpStream, sync::oneshot, time::timeout};
use wirelink::{Connection, ConnectionCallback, ConnectionRegistry, Server};
use wirelink_testing::recv_expect;

/// Counts `closed` hooks into a counter the test keeps a handle to.
struct CloseCounter(Arc<AtomicUsize>);

impl ConnectionCallback for CloseCounter {
    fn closed(&self, _conn: &Connection) { self.0.fetch_add(1, Ordering::SeqCst); }
}

async fn wait_for_registered(registry: &Arc<ConnectionRegistry>, count: usize) {
    timeout(Duration::from_secs(2), async {
        while registry.active_ids().len() < count {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("connections registered");
}

#[rstest]
#[tokio::test]
async fn shutdown_drains_idle_connections() {
    let closes = Arc::new(AtomicUsize::new(0));
    let server = Server::new()
        .workers(2)
        .callback(CloseCounter(Arc::clone(&closes)))
        .bind(([127, 0, 0, 1], 0).into())
        .expect("bind");
    let addr = server.local_addr().expect("bound address");
    let registry = server.registry();
    let (stop, stop_rx) = oneshot::channel::<()>();
    let handle = tokio::spawn(server.run_with_shutdown(async {
        let _ = stop_rx.await;
    }));

    let mut clients = Vec::new();
    for _ in 0..3 {
        clients.push(TcpStream::connect(addr).await.expect("connect"));
    }
    wait_for_registered(&registry, 3).await;

    let _ = stop.send(());
    timeout(Duration::from_secs(2), handle)
        .await
        .expect("server drains")
        .expect("join")
        .expect("run");
    assert!(registry.is_empty());
    assert_eq!(closes.load(Ordering::SeqCst), 3, "closed fires once per connection");

    for client in &mut clients {
        let mut rest = Vec::new();
        recv_expect!(client.read_to_end(&mut rest));
        assert!(rest.is_empty());
    }
}
