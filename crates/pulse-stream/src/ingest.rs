//! Stream ingestion buffer
//!
//! Owns the bounded event buffer and the connection to the live channel.
//! Everything runs on the caller's task: the transport hands over messages,
//! `handle_message` applies them, and `on_event` hears about the outcome.

use crate::buffer::EventBuffer;
use crate::channel::{ChannelHandle, ChannelMessage, LiveChannel};
use crate::endpoint::Endpoint;
use crate::error::{BufferConfigError, MalformedEventError, TransportError};
use crate::event::{Event, EventId, ParsedPayload};
use chrono::Utc;
use log::{debug, info, warn};
use std::fmt;

/// Connection lifecycle, driven by the channel's callbacks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Live,
    Errored,
}

impl ConnectionState {
    /// Whether the state machine allows moving to `next`.
    pub fn can_transition(self, next: ConnectionState) -> bool {
        use ConnectionState::*;
        matches!(
            (self, next),
            (Disconnected, Connecting)
                | (Connecting, Live)
                | (Connecting, Errored)
                | (Live, Errored)
                | (Errored, Disconnected)
                | (Connecting, Disconnected)
                | (Live, Disconnected)
        )
    }

    pub fn is_live(self) -> bool {
        matches!(self, ConnectionState::Live)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Live => "live",
            ConnectionState::Errored => "errored",
        };
        f.write_str(s)
    }
}

/// What `on_event` hears.
#[derive(Debug)]
pub enum IngestSignal<'a> {
    /// A valid event was prepended.
    Accepted { event: &'a Event, buffer_len: usize },
    /// A payload was dropped.
    Rejected(&'a MalformedEventError),
    /// The connection moved to a new state.
    Status(ConnectionState),
}

/// Running counters, for status displays.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub accepted: u64,
    pub rejected: u64,
    pub evicted: u64,
}

type SignalCallback = Box<dyn FnMut(IngestSignal<'_>)>;

pub struct IngestionBuffer {
    buffer: EventBuffer,
    state: ConnectionState,
    next_id: EventId,
    handle: Option<ChannelHandle>,
    endpoint: Option<Endpoint>,
    on_event: Option<SignalCallback>,
    stats: IngestStats,
}

impl IngestionBuffer {
    pub fn new(max_items: i64) -> Result<Self, BufferConfigError> {
        Ok(Self::with_buffer(EventBuffer::with_capacity(max_items)?))
    }

    pub fn with_buffer(buffer: EventBuffer) -> Self {
        Self {
            buffer,
            state: ConnectionState::Disconnected,
            next_id: 1,
            handle: None,
            endpoint: None,
            on_event: None,
            stats: IngestStats::default(),
        }
    }

    /// Connect to `endpoint`. Any previous connection is closed first.
    ///
    /// On a connect error the state passes through `Errored` back to
    /// `Disconnected` and the error is returned; the buffer keeps its events.
    pub fn open<C, F>(
        &mut self,
        channel: &C,
        endpoint: Endpoint,
        on_event: F,
    ) -> Result<(), TransportError>
    where
        C: LiveChannel + ?Sized,
        F: FnMut(IngestSignal<'_>) + 'static,
    {
        self.close();
        self.on_event = Some(Box::new(on_event));

        info!("Opening live channel: {}", endpoint);
        self.set_state(ConnectionState::Connecting);

        match channel.connect(&endpoint) {
            Ok(handle) => {
                self.handle = Some(handle);
                self.endpoint = Some(endpoint);
                Ok(())
            }
            Err(e) => {
                warn!("Live channel connect failed: {}", e);
                self.set_state(ConnectionState::Errored);
                self.set_state(ConnectionState::Disconnected);
                Err(e)
            }
        }
    }

    /// Wait for the next channel message. Pending forever while closed, so it
    /// can sit in a `select!` unconditionally.
    pub async fn next_message(&mut self) -> ChannelMessage {
        match self.handle.as_mut() {
            Some(handle) => match handle.recv().await {
                Some(msg) => msg,
                None => ChannelMessage::Failed(TransportError::Dropped(
                    "transport went away".to_string(),
                )),
            },
            None => std::future::pending().await,
        }
    }

    /// Drain whatever the transport has queued without waiting.
    pub fn poll_messages(&mut self) -> usize {
        let mut handled = 0;
        while let Some(msg) = self.handle.as_mut().and_then(|h| h.try_recv()) {
            self.handle_message(msg);
            handled += 1;
        }
        handled
    }

    pub fn handle_message(&mut self, msg: ChannelMessage) {
        match msg {
            ChannelMessage::Opened => {
                if self.state == ConnectionState::Connecting {
                    self.set_state(ConnectionState::Live);
                }
            }
            ChannelMessage::Payload(raw) => {
                if self.handle.is_none() {
                    return;
                }
                if self.state == ConnectionState::Connecting {
                    // First data frame doubles as the handshake.
                    self.set_state(ConnectionState::Live);
                }
                let _ = self.push(&raw);
            }
            ChannelMessage::Failed(err) => {
                if self.handle.is_none() {
                    return;
                }
                warn!("Live channel failed: {}", err);
                self.set_state(ConnectionState::Errored);
                self.close();
            }
        }
    }

    /// Parse and prepend one payload. Malformed payloads are counted,
    /// reported to `on_event`, and otherwise ignored.
    pub fn push(&mut self, raw: &str) -> Result<EventId, MalformedEventError> {
        let parsed = match ParsedPayload::parse(raw) {
            Ok(parsed) => parsed,
            Err(e) => {
                self.stats.rejected += 1;
                debug!("Dropping malformed payload: {}", e);
                self.emit(IngestSignal::Rejected(&e));
                return Err(e);
            }
        };

        let id = self.next_id;
        self.next_id += 1;

        let evicted = self.buffer.push_front(parsed.into_event(id, Utc::now()));
        self.stats.accepted += 1;
        if !evicted.is_empty() {
            self.stats.evicted += evicted.len() as u64;
            debug!("Evicted {} event(s) past capacity", evicted.len());
        }

        if let Some(cb) = self.on_event.as_mut()
            && let Some(event) = self.buffer.front()
        {
            cb(IngestSignal::Accepted {
                event,
                buffer_len: self.buffer.len(),
            });
        }
        Ok(id)
    }

    /// Release the connection. Safe to call in any state, any number of times.
    pub fn close(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            handle.close();
            if let Some(endpoint) = &self.endpoint {
                info!("Closed live channel: {}", endpoint);
            }
        }
        if self.state != ConnectionState::Disconnected {
            self.set_state(ConnectionState::Disconnected);
        }
    }

    /// Current events, newest first.
    pub fn snapshot(&self) -> Vec<Event> {
        self.buffer.snapshot()
    }

    /// Read-only view for slicing without cloning everything.
    pub fn buffer(&self) -> &EventBuffer {
        &self.buffer
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn stats(&self) -> IngestStats {
        self.stats
    }

    pub fn endpoint(&self) -> Option<&Endpoint> {
        self.endpoint.as_ref()
    }

    pub fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    fn set_state(&mut self, next: ConnectionState) {
        if !self.state.can_transition(next) {
            debug!("Ignoring connection transition {} -> {}", self.state, next);
            return;
        }
        debug!("Connection state {} -> {}", self.state, next);
        self.state = next;
        self.emit(IngestSignal::Status(next));
    }

    fn emit(&mut self, signal: IngestSignal<'_>) {
        if let Some(cb) = self.on_event.as_mut() {
            cb(signal);
        }
    }
}

impl Drop for IngestionBuffer {
    fn drop(&mut self) {
        self.close();
    }
}
