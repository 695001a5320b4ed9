//! Windowed renderer.
//!
//! Holds the last notified viewport and list length and recomputes the
//! visible window only when told that one of them changed.

use crate::viewport::Viewport;
use crate::window::{VisibleWindow, compute_window};
use log::debug;

#[derive(Debug, Clone)]
pub struct WindowedRenderer {
    viewport: Viewport,
    len: usize,
    window: VisibleWindow,
    recomputes: u64,
}

impl WindowedRenderer {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            viewport,
            len: 0,
            window: compute_window(0, &viewport),
            recomputes: 0,
        }
    }

    /// Scroll position or geometry changed.
    pub fn on_viewport_changed(&mut self, viewport: Viewport) -> VisibleWindow {
        self.viewport = viewport;
        self.recompute()
    }

    /// The underlying list grew, shrank, or its contents shifted.
    pub fn on_buffer_changed(&mut self, len: usize) -> VisibleWindow {
        self.len = len;
        self.recompute()
    }

    /// Both changed in the same frame; one recompute.
    pub fn update(&mut self, viewport: Viewport, len: usize) -> VisibleWindow {
        self.viewport = viewport;
        self.len = len;
        self.recompute()
    }

    pub fn window(&self) -> VisibleWindow {
        self.window
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// How many times the window has been recomputed.
    pub fn recomputes(&self) -> u64 {
        self.recomputes
    }

    /// Rows of `items` that should be materialized right now.
    pub fn visible<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        self.window.slice(items)
    }

    fn recompute(&mut self) -> VisibleWindow {
        self.window = compute_window(self.len, &self.viewport);
        self.recomputes += 1;
        debug!(
            "Window {}..{} of {} (offset_y={})",
            self.window.start_index, self.window.end_index, self.len, self.window.offset_y
        );
        self.window
    }
}
