//! Live channel abstraction
//!
//! A transport pushes `ChannelMessage`s through a `ChannelSink`; the ingestion
//! buffer owns the matching `ChannelHandle`. Dropping the handle cancels the
//! transport, so a connection never outlives its consumer.

use crate::endpoint::Endpoint;
use crate::error::TransportError;
use std::cell::{Cell, RefCell};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// Lifecycle and data messages emitted by a transport.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelMessage {
    /// Handshake completed.
    Opened,
    /// One raw event payload.
    Payload(String),
    /// Transport failed or the stream ended.
    Failed(TransportError),
}

/// Something that can open a server-to-client push stream.
pub trait LiveChannel {
    fn connect(&self, endpoint: &Endpoint) -> Result<ChannelHandle, TransportError>;
}

/// Consumer side of an open connection.
#[derive(Debug)]
pub struct ChannelHandle {
    rx: UnboundedReceiver<ChannelMessage>,
    cancelled: Arc<AtomicBool>,
}

/// Producer side of an open connection, handed to the transport worker.
#[derive(Clone, Debug)]
pub struct ChannelSink {
    tx: UnboundedSender<ChannelMessage>,
    cancelled: Arc<AtomicBool>,
}

impl ChannelHandle {
    /// Create a connected sink/handle pair.
    pub fn pair() -> (ChannelSink, ChannelHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let cancelled = Arc::new(AtomicBool::new(false));
        (
            ChannelSink {
                tx,
                cancelled: cancelled.clone(),
            },
            ChannelHandle { rx, cancelled },
        )
    }

    /// Next message. `None` once every sink is gone.
    pub async fn recv(&mut self) -> Option<ChannelMessage> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<ChannelMessage> {
        self.rx.try_recv().ok()
    }

    /// Release the connection. Idempotent.
    pub fn close(&mut self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.rx.close();
    }

    pub fn is_closed(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

impl Drop for ChannelHandle {
    fn drop(&mut self) {
        self.close();
    }
}

impl ChannelSink {
    /// Returns false when the consumer has gone away.
    pub fn send(&self, msg: ChannelMessage) -> bool {
        if self.is_cancelled() {
            return false;
        }
        self.tx.send(msg).is_ok()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst) || self.tx.is_closed()
    }
}

/// In-process channel for tests and offline runs.
pub struct MemoryChannel {
    sinks: RefCell<Vec<ChannelSink>>,
    refuse: Cell<bool>,
    auto_handshake: bool,
    connects: Cell<usize>,
}

impl Default for MemoryChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryChannel {
    pub fn new() -> Self {
        Self {
            sinks: RefCell::new(Vec::new()),
            refuse: Cell::new(false),
            auto_handshake: true,
            connects: Cell::new(0),
        }
    }

    /// Do not send `Opened` on connect; call `open_all` instead.
    pub fn manual_handshake(mut self) -> Self {
        self.auto_handshake = false;
        self
    }

    pub fn refuse_connections(&self, refuse: bool) {
        self.refuse.set(refuse);
    }

    /// Deliver a payload to every live connection. Returns how many received it.
    pub fn send_payload(&self, raw: &str) -> usize {
        self.broadcast(ChannelMessage::Payload(raw.to_string()))
    }

    pub fn open_all(&self) -> usize {
        self.broadcast(ChannelMessage::Opened)
    }

    pub fn fail_all(&self, err: TransportError) -> usize {
        self.broadcast(ChannelMessage::Failed(err))
    }

    /// Connections whose handle is still held.
    pub fn active_connections(&self) -> usize {
        self.sinks
            .borrow()
            .iter()
            .filter(|s| !s.is_cancelled())
            .count()
    }

    pub fn connect_count(&self) -> usize {
        self.connects.get()
    }

    fn broadcast(&self, msg: ChannelMessage) -> usize {
        let mut sinks = self.sinks.borrow_mut();
        sinks.retain(|s| !s.is_cancelled());
        sinks.iter().filter(|s| s.send(msg.clone())).count()
    }
}

impl LiveChannel for MemoryChannel {
    fn connect(&self, endpoint: &Endpoint) -> Result<ChannelHandle, TransportError> {
        if self.refuse.get() {
            return Err(TransportError::Refused(endpoint.display_url()));
        }
        self.connects.set(self.connects.get() + 1);

        let (sink, handle) = ChannelHandle::pair();
        if self.auto_handshake {
            sink.send(ChannelMessage::Opened);
        }
        self.sinks.borrow_mut().push(sink);
        Ok(handle)
    }
}
