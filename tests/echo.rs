//! End-to-end echo over TCP.

use std::time::Duration;

use rstest::{fixture, rstest};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
    sync::oneshot,
    task::JoinHandle,
    time::timeout,
};
use wirelink::{Server, ServerError};
use wirelink_testing::{encode_frame, recv_expect};

struct Running {
    addr: std::net::SocketAddr,
    stop: oneshot::Sender<()>,
    handle: JoinHandle<Result<(), ServerError>>,
}

impl Running {
    async fn stop(self) {
        let _ = self.stop.send(());
        timeout(Duration::from_secs(2), self.handle)
            .await
            .expect("server drains")
            .expect("join server")
            .expect("server run");
    }
}

#[fixture]
async fn server() -> Running {
    let server = Server::new()
        .workers(1)
        .bind(([127, 0, 0, 1], 0).into())
        .expect("bind");
    let addr = server.local_addr().expect("bound address");
    let (ready_tx, ready_rx) = oneshot::channel();
    let (stop, stop_rx) = oneshot::channel::<()>();
    let handle = tokio::spawn(server.ready_signal(ready_tx).run_with_shutdown(async {
        let _ = stop_rx.await;
    }));
    ready_rx.await.expect("server ready");
    Running { addr, stop, handle }
}

#[rstest]
#[tokio::test]
async fn single_byte_payload_is_echoed_and_connection_stays_open(
    #[future] server: Running,
) {
    let server = server.await;
    let mut client = TcpStream::connect(server.addr).await.expect("connect");

    client.write_all(&encode_frame(b"A")).await.expect("write");
    let mut buf = [0u8; 1];
    recv_expect!(client.read_exact(&mut buf));
    assert_eq!(&buf, b"A");

    client.write_all(&encode_frame(b"B")).await.expect("write");
    recv_expect!(client.read_exact(&mut buf));
    assert_eq!(&buf, b"B");

    server.stop().await;
}

#[rstest]
#[tokio::test]
async fn empty_payload_closes_the_connection(#[future] server: Running) {
    let server = server.await;
    let mut client = TcpStream::connect(server.addr).await.expect("connect");

    client.write_all(&encode_frame(b"")).await.expect("write");
    let mut rest = Vec::new();
    recv_expect!(client.read_to_end(&mut rest));
    assert!(rest.is_empty());

    server.stop().await;
}

#[rstest]
#[tokio::test]
async fn oversized_frame_closes_the_connection(#[future] server: Running) {
    let server = server.await;
    let mut client = TcpStream::connect(server.addr).await.expect("connect");

    client
        .write_all(&[0x7f, 0xff, 0xff, 0xff])
        .await
        .expect("write header");
    let mut rest = Vec::new();
    recv_expect!(client.read_to_end(&mut rest));
    assert!(rest.is_empty());

    server.stop().await;
}
