//! Outbound half: outbound queue to socket.

use std::{io, sync::Arc};

use bytes::Bytes;
use tokio::{
    io::{AsyncWrite, AsyncWriteExt},
    sync::mpsc,
};

use super::{Connection, isolate::LoopExit};
use crate::metrics::{self, Direction};

/// Write queued buffers to `writer` in FIFO order, each in full.
///
/// Buffers are written as given; any framing is the application's concern.
/// Buffers still queued when a stop signal fires are dropped.
pub(super) async fn run<W>(
    conn: Arc<Connection>,
    mut writer: W,
    mut outbound: mpsc::Receiver<Bytes>,
) -> LoopExit
where
    W: AsyncWrite + Unpin,
{
    let signals = conn.signals();
    loop {
        let buffer = tokio::select! {
            biased;

            exit = signals.fired() => return exit,
            next = outbound.recv() => match next {
                Some(buffer) => buffer,
                None => return LoopExit::Closed,
            },
        };

        let written = tokio::select! {
            biased;

            exit = signals.fired() => return exit,
            res = write_buffer(&mut writer, &buffer) => res,
        };
        if let Err(e) = written {
            return LoopExit::Write(e);
        }
        metrics::inc_frames(Direction::Outbound);
    }
}

async fn write_buffer<W>(writer: &mut W, buffer: &[u8]) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(buffer).await?;
    writer.flush().await
}
