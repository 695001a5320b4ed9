//! Event bus between the feed pipeline and the panel thread.
//!
//! - Broadcast channel (tokio): every subscriber sees every event
//! - The panel polls on a fixed timer and drains everything per tick
//!
//! Event types live next to the panel that consumes them (`panels::feed::events`).

/// Broadcast channel capacity.
/// Lagging receivers skip old events; the panel only needs the latest frame.
pub const CHANNEL_CAPACITY: usize = 64;
