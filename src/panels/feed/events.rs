//! Feed event definitions and broadcast event bus.
//!
//! The pipeline publishes, the panel thread drains on its poll timer.

use crate::event_bus::CHANNEL_CAPACITY;
use crate::services::feed::StatusIndicator;
use pulse_stream::{Event, IngestStats};
use pulse_window::VisibleWindow;
use std::sync::OnceLock;
use tokio::sync::broadcast::{self, Receiver, Sender};

/// Everything the panel needs to draw one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct FeedFrame {
    pub frame: u64,
    pub status: StatusIndicator,
    pub window: VisibleWindow,
    pub total: usize,
    /// Events in `window`, newest first.
    pub rows: Vec<Event>,
    pub stats: IngestStats,
}

#[derive(Clone, Debug)]
pub enum FeedEvent {
    Status(StatusIndicator),
    Frame(Box<FeedFrame>), // Boxed to keep enum size small
    Notice(String),
}

impl FeedEvent {
    /// Get variant index for deduplication.
    #[inline]
    pub fn variant_index(&self) -> usize {
        match self {
            FeedEvent::Status(_) => 0,
            FeedEvent::Frame(_) => 1,
            FeedEvent::Notice(_) => 2,
        }
    }
}

static FEED_SENDER: OnceLock<Sender<FeedEvent>> = OnceLock::new();

fn get_sender() -> &'static Sender<FeedEvent> {
    FEED_SENDER.get_or_init(|| {
        let (tx, _rx) = broadcast::channel(CHANNEL_CAPACITY);
        tx
    })
}

/// Publish an event. Non-blocking.
/// Dropped when nobody is subscribed (headless runs, tests).
#[inline]
pub fn send(event: FeedEvent) {
    let _ = get_sender().send(event);
}

#[inline]
pub fn send_status(status: StatusIndicator) {
    send(FeedEvent::Status(status));
}

#[inline]
pub fn send_frame(frame: FeedFrame) {
    send(FeedEvent::Frame(Box::new(frame)));
}

#[inline]
pub fn send_notice(text: impl Into<String>) {
    send(FeedEvent::Notice(text.into()));
}

pub fn subscribe() -> Receiver<FeedEvent> {
    get_sender().subscribe()
}

/// Drain all pending events, keeping only the latest Status and Frame.
/// Notices are all kept, in order.
#[inline]
pub fn drain_latest(rx: &mut Receiver<FeedEvent>) -> Vec<FeedEvent> {
    let mut events = Vec::with_capacity(4);

    loop {
        match rx.try_recv() {
            Ok(event) => events.push(event),
            Err(broadcast::error::TryRecvError::Empty) => break,
            Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
            Err(broadcast::error::TryRecvError::Closed) => break,
        }
    }

    dedupe_latest(events)
}

fn dedupe_latest(events: Vec<FeedEvent>) -> Vec<FeedEvent> {
    if events.len() <= 1 {
        return events;
    }

    let mut seen = [false; 3];
    let mut result = Vec::with_capacity(events.len());

    for event in events.into_iter().rev() {
        let idx = event.variant_index();
        if matches!(event, FeedEvent::Notice(_)) {
            result.push(event);
        } else if !seen[idx] {
            seen[idx] = true;
            result.push(event);
        }
    }

    result.reverse();
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(n: u64) -> FeedEvent {
        FeedEvent::Frame(Box::new(FeedFrame {
            frame: n,
            status: StatusIndicator::Live,
            window: VisibleWindow::default(),
            total: 0,
            rows: Vec::new(),
            stats: IngestStats::default(),
        }))
    }

    #[test]
    fn test_dedupe_keeps_latest_frame_and_all_notices() {
        let events = vec![
            frame(1),
            FeedEvent::Notice("a".into()),
            FeedEvent::Status(StatusIndicator::Connecting),
            frame(2),
            FeedEvent::Status(StatusIndicator::Live),
            FeedEvent::Notice("b".into()),
        ];
        let kept = dedupe_latest(events);

        assert_eq!(kept.len(), 4);
        assert!(matches!(&kept[0], FeedEvent::Notice(n) if n == "a"));
        assert!(matches!(&kept[1], FeedEvent::Frame(f) if f.frame == 2));
        assert!(matches!(kept[2], FeedEvent::Status(StatusIndicator::Live)));
        assert!(matches!(&kept[3], FeedEvent::Notice(n) if n == "b"));
    }

    #[test]
    fn test_drain_latest_reads_private_receiver() {
        // Use a private channel; the global bus is shared by parallel tests.
        let (tx, mut rx) = broadcast::channel(CHANNEL_CAPACITY);
        tx.send(frame(1)).unwrap();
        tx.send(frame(2)).unwrap();
        let kept = drain_latest(&mut rx);
        assert_eq!(kept.len(), 1);
        assert!(matches!(&kept[0], FeedEvent::Frame(f) if f.frame == 2));
        assert!(drain_latest(&mut rx).is_empty());
    }
}
