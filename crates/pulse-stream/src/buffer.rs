//! Bounded newest-first event buffer

use crate::error::BufferConfigError;
use crate::event::Event;
use std::collections::VecDeque;
use std::num::NonZeroUsize;
use std::ops::Range;

/// Newest-first sequence of events, never longer than `max_items`.
#[derive(Clone, Debug)]
pub struct EventBuffer {
    items: VecDeque<Event>,
    max_items: NonZeroUsize,
}

impl EventBuffer {
    pub fn new(max_items: NonZeroUsize) -> Self {
        Self {
            items: VecDeque::with_capacity(max_items.get().min(1024)),
            max_items,
        }
    }

    /// Build from an untrusted capacity (config files carry signed numbers).
    pub fn with_capacity(max_items: i64) -> Result<Self, BufferConfigError> {
        usize::try_from(max_items)
            .ok()
            .and_then(NonZeroUsize::new)
            .map(Self::new)
            .ok_or(BufferConfigError::MaxItems(max_items))
    }

    pub fn max_items(&self) -> usize {
        self.max_items.get()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Insert at the front. Returns whatever fell off the tail.
    pub fn push_front(&mut self, event: Event) -> Vec<Event> {
        self.items.push_front(event);
        let mut evicted = Vec::new();
        while self.items.len() > self.max_items.get() {
            if let Some(old) = self.items.pop_back() {
                evicted.push(old);
            }
        }
        evicted
    }

    /// Newest event.
    pub fn front(&self) -> Option<&Event> {
        self.items.front()
    }

    pub fn get(&self, idx: usize) -> Option<&Event> {
        self.items.get(idx)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.items.iter()
    }

    /// Iterate a sub-range, clamped to the current length.
    pub fn range(&self, range: Range<usize>) -> impl Iterator<Item = &Event> {
        let end = range.end.min(self.items.len());
        let start = range.start.min(end);
        self.items.range(start..end)
    }

    pub fn snapshot(&self) -> Vec<Event> {
        self.items.iter().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}
