//! A callback that remembers what happened to it.

use std::sync::{
    Arc,
    Mutex,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::{Semaphore, watch};
use wirelink::{CallbackError, Connection, ConnectionCallback};

/// Records every hook invocation for later assertions.
///
/// By default messages are only recorded. [`echoing`](Self::echoing) also
/// writes each message back; [`gated`](Self::gated) makes every
/// `message_arrived` wait for a semaphore permit after recording, which lets
/// a test hold the dispatch loop still.
pub struct RecordingCallback {
    echo: bool,
    gate: Option<Arc<Semaphore>>,
    messages: Mutex<Vec<Bytes>>,
    received: watch::Sender<usize>,
    connects: AtomicUsize,
    closes: AtomicUsize,
}

impl Default for RecordingCallback {
    fn default() -> Self { Self::new() }
}

impl RecordingCallback {
    /// A callback that records and accepts everything.
    #[must_use]
    pub fn new() -> Self {
        Self {
            echo: false,
            gate: None,
            messages: Mutex::new(Vec::new()),
            received: watch::Sender::new(0),
            connects: AtomicUsize::new(0),
            closes: AtomicUsize::new(0),
        }
    }

    /// Echo each message back after recording it.
    #[must_use]
    pub fn echoing(mut self) -> Self {
        self.echo = true;
        self
    }

    /// Wait for one permit from `gate` per message.
    #[must_use]
    pub fn gated(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Messages seen so far, in arrival order.
    ///
    /// # Panics
    ///
    /// Panics if the message log lock is poisoned.
    #[must_use]
    pub fn messages(&self) -> Vec<Bytes> { self.messages.lock().expect("messages poisoned").clone() }

    /// Wait until at least `count` messages have arrived, then return them.
    ///
    /// # Panics
    ///
    /// Panics if the message log lock is poisoned.
    pub async fn wait_for_messages(&self, count: usize) -> Vec<Bytes> {
        let mut rx = self.received.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait.
        let _ = rx.wait_for(|seen| *seen >= count).await;
        self.messages()
    }

    /// Number of `connect` calls.
    #[must_use]
    pub fn connect_count(&self) -> usize { self.connects.load(Ordering::SeqCst) }

    /// Number of `closed` calls.
    #[must_use]
    pub fn closed_count(&self) -> usize { self.closes.load(Ordering::SeqCst) }
}

#[async_trait]
impl ConnectionCallback for RecordingCallback {
    fn connect(&self, _conn: &Arc<Connection>) -> bool {
        self.connects.fetch_add(1, Ordering::SeqCst);
        true
    }

    async fn message_arrived(
        &self,
        conn: &Arc<Connection>,
        message: Bytes,
    ) -> Result<(), CallbackError> {
        self.messages
            .lock()
            .expect("messages poisoned")
            .push(message.clone());
        self.received.send_modify(|seen| *seen += 1);
        if let Some(gate) = &self.gate {
            gate.acquire()
                .await
                .map_err(CallbackError::rejected)?
                .forget();
        }
        if self.echo {
            conn.enqueue_outbound(message).await?;
        }
        Ok(())
    }

    fn closed(&self, _conn: &Connection) { self.closes.fetch_add(1, Ordering::SeqCst); }
}
