//! pulse-stream - Bounded live event ingestion
//!
//! Features:
//! - Newest-first event buffer with a hard capacity
//! - Connection state machine with guaranteed release on close/drop
//! - SSE transport over ureq, in-memory channel for tests

pub mod buffer;
pub mod channel;
pub mod endpoint;
pub mod error;
pub mod event;
pub mod ingest;
pub mod sse;

pub use buffer::EventBuffer;
pub use channel::{ChannelHandle, ChannelMessage, ChannelSink, LiveChannel, MemoryChannel};
pub use endpoint::Endpoint;
pub use error::{BufferConfigError, MalformedEventError, TransportError};
pub use event::{Event, EventId, EventKind, Metadata};
pub use ingest::{ConnectionState, IngestSignal, IngestStats, IngestionBuffer};
pub use sse::SseChannel;
