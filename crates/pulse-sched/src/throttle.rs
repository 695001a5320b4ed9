//! Leading-edge throttle.
//!
//! The first call fires immediately; calls inside the cooldown are dropped,
//! not deferred.

use std::time::Duration;
use tokio::time::Instant;

pub struct Throttle<F> {
    delay: Duration,
    callback: F,
    last_fired: Option<Instant>,
}

impl<F> Throttle<F> {
    pub fn new(delay: Duration, callback: F) -> Self {
        Self {
            delay,
            callback,
            last_fired: None,
        }
    }

    /// Invoke the callback unless still cooling down. Returns whether it ran.
    pub fn call<A>(&mut self, args: A) -> bool
    where
        F: FnMut(A),
    {
        if !self.ready() {
            return false;
        }
        self.last_fired = Some(Instant::now());
        (self.callback)(args);
        true
    }

    /// Whether the next call would fire.
    pub fn ready(&self) -> bool {
        match self.last_fired {
            Some(last) => last.elapsed() >= self.delay,
            None => true,
        }
    }

    /// Forget the cooldown.
    pub fn reset(&mut self) {
        self.last_fired = None;
    }
}
