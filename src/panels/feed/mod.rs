//! Terminal feed panel.
//!
//! A single polling thread drains the feed event bus and redraws. Connection
//! loss only changes the header; the last rows stay on screen.

pub mod events;
pub mod list;

use events::{FeedEvent, FeedFrame};
use log::{debug, info};
use std::io::{self, Write};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Polling interval for the event bus.
/// 50ms = 20Hz, well above how fast a person reads a feed.
const EVENT_POLL_INTERVAL_MS: u64 = 50;

/// Subscribe on the calling thread, then draw on a background thread.
/// Subscribing first means no event published after this returns is missed.
pub fn start_panel() -> io::Result<JoinHandle<()>> {
    let mut rx = events::subscribe();

    thread::Builder::new()
        .name("feed-panel".into())
        .spawn(move || {
            info!("Feed panel started");
            let mut last: Option<FeedFrame> = None;
            let mut notice: Option<String> = None;

            loop {
                thread::sleep(Duration::from_millis(EVENT_POLL_INTERVAL_MS));

                let events = events::drain_latest(&mut rx);
                if events.is_empty() {
                    continue;
                }

                for event in events {
                    match event {
                        FeedEvent::Status(status) => {
                            debug!("Panel status: {}", status);
                            if let Some(frame) = last.as_mut() {
                                frame.status = status;
                            }
                        }
                        FeedEvent::Frame(frame) => last = Some(*frame),
                        FeedEvent::Notice(text) => notice = Some(text),
                    }
                }

                if let Some(frame) = &last {
                    draw(frame, notice.as_deref());
                }
            }
        })
}

fn draw(frame: &FeedFrame, notice: Option<&str>) {
    let mut out = io::stdout().lock();
    // Clear and home.
    let _ = write!(out, "\x1b[2J\x1b[H");
    let _ = writeln!(out, "{}", list::format_header(frame));
    if let Some(text) = notice {
        let _ = writeln!(out, "  {}", text);
    }
    let _ = writeln!(out);
    for event in &frame.rows {
        let _ = writeln!(out, "{}", list::format_row(event));
    }
    let _ = out.flush();
}
