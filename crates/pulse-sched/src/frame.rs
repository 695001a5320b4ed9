//! Frame-batched state merge
//!
//! Patches submitted between two frames are folded into one pending patch
//! (last write wins per field) and applied to the owned state exactly once
//! when the frame fires. Dropping or cancelling the batcher discards whatever
//! is still pending.

use log::debug;
use std::cell::RefCell;
use std::pin::Pin;
use std::rc::Rc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::{Sleep, sleep};

/// A partial state update.
pub trait Patch {
    /// Fold `newer` into `self`. Fields set in `newer` win.
    fn merge(&mut self, newer: Self);
}

/// State that advances one merged patch per frame.
pub trait FrameState {
    type Patch: Patch;

    fn apply(&mut self, patch: Self::Patch);
}

struct Slot<P> {
    pending: Option<P>,
    closed: bool,
}

struct Shared<P> {
    slot: RefCell<Slot<P>>,
    wake: Notify,
}

impl<P: Patch> Shared<P> {
    fn submit(&self, patch: P) -> bool {
        {
            let mut slot = self.slot.borrow_mut();
            if slot.closed {
                return false;
            }
            match slot.pending.as_mut() {
                Some(pending) => pending.merge(patch),
                None => slot.pending = Some(patch),
            }
        }
        self.wake.notify_one();
        true
    }
}

/// Cloneable handle for submitting patches from callbacks.
pub struct Submitter<P> {
    shared: Rc<Shared<P>>,
}

impl<P> Clone for Submitter<P> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<P: Patch> Submitter<P> {
    /// Returns false once the batcher is gone.
    pub fn submit(&self, patch: P) -> bool {
        self.shared.submit(patch)
    }
}

pub struct FrameBatcher<S: FrameState> {
    state: S,
    shared: Rc<Shared<S::Patch>>,
    interval: Duration,
    deadline: Option<Pin<Box<Sleep>>>,
    frame: u64,
}

impl<S: FrameState> FrameBatcher<S> {
    pub fn new(state: S, interval: Duration) -> Self {
        Self {
            state,
            shared: Rc::new(Shared {
                slot: RefCell::new(Slot {
                    pending: None,
                    closed: false,
                }),
                wake: Notify::new(),
            }),
            interval,
            deadline: None,
            frame: 0,
        }
    }

    pub fn submitter(&self) -> Submitter<S::Patch> {
        Submitter {
            shared: self.shared.clone(),
        }
    }

    pub fn submit(&self, patch: S::Patch) -> bool {
        self.shared.submit(patch)
    }

    pub fn is_pending(&self) -> bool {
        self.shared.slot.borrow().pending.is_some()
    }

    /// Whether a frame timer is currently armed.
    pub fn is_scheduled(&self) -> bool {
        self.deadline.is_some()
    }

    /// Wait for the next frame carrying a patch, apply it, and return the
    /// frame number. Cancel-safe: the pending patch and the armed timer
    /// survive if this future is dropped.
    pub async fn next_frame(&mut self) -> u64 {
        loop {
            if self.deadline.is_none() {
                if !self.is_pending() {
                    self.shared.wake.notified().await;
                    continue;
                }
                self.deadline = Some(Box::pin(sleep(self.interval)));
            }
            if let Some(deadline) = self.deadline.as_mut() {
                deadline.await;
            }
            self.deadline = None;
            if let Some(frame) = self.apply_pending() {
                return frame;
            }
        }
    }

    /// Apply the pending patch now, without waiting for the frame timer.
    pub fn flush(&mut self) -> Option<u64> {
        self.deadline = None;
        self.apply_pending()
    }

    /// Discard the pending patch and disarm the timer.
    pub fn cancel(&mut self) {
        let dropped = self.shared.slot.borrow_mut().pending.take().is_some();
        self.deadline = None;
        if dropped {
            debug!("Cancelled pending frame merge");
        }
    }

    /// Cancel and refuse further submissions.
    pub fn close(&mut self) {
        self.cancel();
        self.shared.slot.borrow_mut().closed = true;
    }

    pub fn state(&self) -> &S {
        &self.state
    }

    /// Frames applied so far.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    fn apply_pending(&mut self) -> Option<u64> {
        let patch = self.shared.slot.borrow_mut().pending.take()?;
        self.state.apply(patch);
        self.frame += 1;
        Some(self.frame)
    }
}

impl<S: FrameState> Drop for FrameBatcher<S> {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{Instant, timeout};

    const FRAME: Duration = Duration::from_millis(16);

    #[derive(Debug, Default, PartialEq)]
    struct ScrollState {
        offset: u32,
        height: u32,
        transitions: u32,
    }

    #[derive(Debug, Default)]
    struct ScrollPatch {
        offset: Option<u32>,
        height: Option<u32>,
    }

    impl Patch for ScrollPatch {
        fn merge(&mut self, newer: Self) {
            if newer.offset.is_some() {
                self.offset = newer.offset;
            }
            if newer.height.is_some() {
                self.height = newer.height;
            }
        }
    }

    impl FrameState for ScrollState {
        type Patch = ScrollPatch;

        fn apply(&mut self, patch: ScrollPatch) {
            if let Some(offset) = patch.offset {
                self.offset = offset;
            }
            if let Some(height) = patch.height {
                self.height = height;
            }
            self.transitions += 1;
        }
    }

    fn offset(v: u32) -> ScrollPatch {
        ScrollPatch {
            offset: Some(v),
            height: None,
        }
    }

    fn height(v: u32) -> ScrollPatch {
        ScrollPatch {
            offset: None,
            height: Some(v),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_patches_within_frame_apply_together() {
        let mut batcher = FrameBatcher::new(ScrollState::default(), FRAME);
        let start = Instant::now();

        batcher.submit(offset(1));
        batcher.submit(offset(2));
        batcher.submit(height(300));
        assert_eq!(batcher.state().transitions, 0);

        let frame = batcher.next_frame().await;
        assert_eq!(frame, 1);
        assert!(start.elapsed() >= FRAME);
        assert!(start.elapsed() < FRAME * 2);
        assert_eq!(
            *batcher.state(),
            ScrollState {
                offset: 2,
                height: 300,
                transitions: 1,
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_frames_are_sequential() {
        let mut batcher = FrameBatcher::new(ScrollState::default(), FRAME);
        batcher.submit(offset(5));
        assert_eq!(batcher.next_frame().await, 1);
        batcher.submit(offset(9));
        assert_eq!(batcher.next_frame().await, 2);
        assert_eq!(batcher.state().offset, 9);
        assert_eq!(batcher.state().transitions, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_submitter_wakes_idle_batcher() {
        let mut batcher = FrameBatcher::new(ScrollState::default(), FRAME);
        let submitter = batcher.submitter();
        let start = Instant::now();

        let (frame, accepted) = tokio::join!(batcher.next_frame(), async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            submitter.submit(height(42))
        });

        assert!(accepted);
        assert_eq!(frame, 1);
        assert!(start.elapsed() >= Duration::from_millis(5) + FRAME);
        assert_eq!(batcher.state().height, 42);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_discards_pending() {
        let mut batcher = FrameBatcher::new(ScrollState::default(), FRAME);
        batcher.submit(offset(7));
        batcher.cancel();
        assert!(!batcher.is_pending());

        let waited = timeout(Duration::from_millis(100), batcher.next_frame()).await;
        assert!(waited.is_err());
        assert_eq!(batcher.state().transitions, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_next_frame_is_cancel_safe() {
        let mut batcher = FrameBatcher::new(ScrollState::default(), FRAME);
        batcher.submit(offset(3));

        // Drop the wait halfway through the frame.
        let early = timeout(Duration::from_millis(5), batcher.next_frame()).await;
        assert!(early.is_err());
        assert!(batcher.is_pending());
        assert!(batcher.is_scheduled());

        assert_eq!(batcher.next_frame().await, 1);
        assert_eq!(batcher.state().offset, 3);
    }

    #[test]
    fn test_flush_applies_immediately() {
        let mut batcher = FrameBatcher::new(ScrollState::default(), FRAME);
        assert_eq!(batcher.flush(), None);
        batcher.submit(offset(4));
        batcher.submit(height(8));
        assert_eq!(batcher.flush(), Some(1));
        assert_eq!(batcher.state().offset, 4);
        assert_eq!(batcher.state().height, 8);
        assert_eq!(batcher.frame(), 1);
    }

    #[test]
    fn test_submitter_is_inert_after_drop() {
        let batcher = FrameBatcher::new(ScrollState::default(), FRAME);
        let submitter = batcher.submitter();
        assert!(submitter.submit(offset(1)));
        drop(batcher);
        assert!(!submitter.submit(offset(2)));
    }
}
