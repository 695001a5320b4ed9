//! Server-sent events transport
//!
//! Blocking ureq reader on its own thread, forwarding each SSE event's data
//! block as one payload. A read timeout lets the thread notice cancellation
//! even when the server is quiet.

use crate::channel::{ChannelHandle, ChannelMessage, ChannelSink, LiveChannel};
use crate::endpoint::{Endpoint, TENANT_PARAM};
use crate::error::TransportError;
use log::{debug, info, warn};
use std::io::{BufRead, BufReader, ErrorKind, Read};
use std::thread;
use std::time::Duration;

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(1);
/// Longest accepted SSE line, terminator included.
const MAX_LINE_BYTES: usize = 1024 * 1024;

/// HTTP `text/event-stream` channel.
#[derive(Clone)]
pub struct SseChannel {
    agent: ureq::Agent,
}

impl Default for SseChannel {
    fn default() -> Self {
        Self::new(DEFAULT_CONNECT_TIMEOUT, DEFAULT_READ_TIMEOUT)
    }
}

impl SseChannel {
    pub fn new(connect_timeout: Duration, read_timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(connect_timeout)
            .timeout_read(read_timeout)
            .build();
        Self { agent }
    }
}

impl LiveChannel for SseChannel {
    fn connect(&self, endpoint: &Endpoint) -> Result<ChannelHandle, TransportError> {
        let (sink, handle) = ChannelHandle::pair();
        let agent = self.agent.clone();
        let endpoint = endpoint.clone();

        thread::Builder::new()
            .name("sse-reader".to_string())
            .spawn(move || run_reader(agent, endpoint, sink))
            .map_err(TransportError::from)?;

        Ok(handle)
    }
}

fn run_reader(agent: ureq::Agent, endpoint: Endpoint, sink: ChannelSink) {
    let mut request = agent
        .get(&endpoint.url)
        .set("Accept", "text/event-stream")
        .set("Cache-Control", "no-cache");
    if let Some(tenant) = &endpoint.tenant {
        request = request.query(TENANT_PARAM, tenant);
    }

    let response = match request.call() {
        Ok(response) => response,
        Err(ureq::Error::Status(code, _)) => {
            sink.send(ChannelMessage::Failed(TransportError::Status(code)));
            return;
        }
        Err(e) => {
            sink.send(ChannelMessage::Failed(TransportError::Connect {
                endpoint: endpoint.display_url(),
                reason: e.to_string(),
            }));
            return;
        }
    };

    info!("SSE stream open: {}", endpoint);
    if !sink.send(ChannelMessage::Opened) {
        return;
    }

    let reason = pump(response.into_reader(), &sink);
    match reason {
        Some(err) => {
            warn!("SSE stream {} ended: {}", endpoint, err);
            sink.send(ChannelMessage::Failed(err));
        }
        None => debug!("SSE reader for {} cancelled", endpoint),
    }
}

/// Read until cancelled (returns None) or the stream fails.
fn pump(reader: impl Read, sink: &ChannelSink) -> Option<TransportError> {
    let mut reader = BufReader::new(reader);
    let mut parser = SseParser::default();
    let mut line = Vec::new();

    loop {
        if sink.is_cancelled() {
            return None;
        }
        let budget = (MAX_LINE_BYTES + 1 - line.len()) as u64;
        match (&mut reader).take(budget).read_until(b'\n', &mut line) {
            Ok(0) => return Some(TransportError::Dropped("end of stream".to_string())),
            Ok(_) => {
                if line.len() > MAX_LINE_BYTES {
                    return Some(TransportError::Dropped(format!(
                        "line exceeds {} bytes",
                        MAX_LINE_BYTES
                    )));
                }
                if line.last() != Some(&b'\n') {
                    // Partial line; keep reading.
                    continue;
                }
                let text = String::from_utf8_lossy(&line);
                if let Some(data) = parser.feed_line(&text)
                    && !sink.send(ChannelMessage::Payload(data))
                {
                    return None;
                }
                line.clear();
            }
            Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => continue,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Some(TransportError::Dropped(e.to_string())),
        }
    }
}

/// Incremental parser for the `text/event-stream` line format.
#[derive(Debug, Default)]
pub struct SseParser {
    data: Vec<String>,
}

impl SseParser {
    /// Feed one line (with or without its terminator). Returns the event data
    /// when a blank line completes an event.
    pub fn feed_line(&mut self, line: &str) -> Option<String> {
        let line = line.trim_end_matches(['\n', '\r']);

        if line.is_empty() {
            if self.data.is_empty() {
                return None;
            }
            let data = self.data.join("\n");
            self.data.clear();
            return Some(data);
        }

        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        if field == "data" {
            self.data.push(value.to_string());
        }
        None
    }
}
