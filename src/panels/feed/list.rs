//! Row and header text for the feed list.

use super::events::FeedFrame;
use crate::functions::formatting::{format_duration_ms, format_time, truncate};
use pulse_stream::Event;

/// Widest kind label ("published").
const LABEL_WIDTH: usize = 9;
const MESSAGE_WIDTH: usize = 60;

/// One list row: time, kind label, message, then step and duration when the
/// event carries them.
pub fn format_row(event: &Event) -> String {
    let mut row = format!(
        "{}  {:<width$}  {}",
        format_time(&event.occurred_at),
        event.kind.label(),
        truncate(&event.message, MESSAGE_WIDTH),
        width = LABEL_WIDTH,
    );

    if let Some(meta) = &event.metadata {
        if let Some(step) = meta.step() {
            row.push_str(&format!("  [{}]", step));
        }
        if let Some(ms) = meta.duration_ms() {
            row.push_str(&format!("  ({})", format_duration_ms(ms)));
        }
    }
    if event.kind.is_failure() {
        row.push_str("  !");
    }
    row
}

pub fn format_header(frame: &FeedFrame) -> String {
    let range = if frame.window.is_empty() {
        "empty".to_string()
    } else {
        format!(
            "rows {}-{} of {}",
            frame.window.start_index + 1,
            frame.window.end_index,
            frame.total
        )
    };
    format!(
        "● {}  {}  (accepted {}, rejected {}, evicted {})",
        frame.status, range, frame.stats.accepted, frame.stats.rejected, frame.stats.evicted
    )
}
