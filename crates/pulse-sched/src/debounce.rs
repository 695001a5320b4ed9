//! Trailing debounce: a value settles once input has been quiet for `delay`.

use std::pin::Pin;
use std::time::Duration;
use tokio::time::{Instant, Sleep, sleep_until};

pub struct Debounce<T> {
    delay: Duration,
    pending: Option<T>,
    value: Option<T>,
    timer: Option<Pin<Box<Sleep>>>,
}

impl<T> Debounce<T> {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
            value: None,
            timer: None,
        }
    }

    /// Record a new input and restart the quiet window.
    pub fn input(&mut self, value: T) {
        self.pending = Some(value);
        let deadline = Instant::now() + self.delay;
        match self.timer.as_mut() {
            Some(timer) => timer.as_mut().reset(deadline),
            None => self.timer = Some(Box::pin(sleep_until(deadline))),
        }
    }

    /// Last settled value. Intermediate inputs never show up here.
    pub fn value(&self) -> Option<&T> {
        self.value.as_ref()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Drop the pending input and release the timer.
    pub fn cancel(&mut self) {
        self.pending = None;
        self.timer = None;
    }
}

impl<T: Clone> Debounce<T> {
    /// Resolve with the final input of a burst once the quiet window
    /// elapses. Pending forever while nothing is queued. Cancel-safe.
    pub async fn settled(&mut self) -> T {
        loop {
            match self.timer.as_mut() {
                Some(timer) => timer.await,
                None => std::future::pending::<()>().await,
            }
            self.timer = None;
            if let Some(value) = self.pending.take() {
                self.value = Some(value.clone());
                return value;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{advance, timeout};

    const DELAY: Duration = Duration::from_millis(50);

    #[tokio::test(start_paused = true)]
    async fn test_burst_settles_once_with_last_value() {
        let start = Instant::now();
        let mut d = Debounce::new(DELAY);

        d.input(0);
        advance(Duration::from_millis(10)).await;
        d.input(10);
        advance(Duration::from_millis(10)).await;
        d.input(20);

        // Nothing before t=70.
        let early = timeout(Duration::from_millis(45), d.settled()).await;
        assert!(early.is_err());
        assert_eq!(d.value(), None);

        let v = d.settled().await;
        assert_eq!(v, 20);
        assert!(start.elapsed() >= Duration::from_millis(70));
        assert!(start.elapsed() < Duration::from_millis(71));
        assert_eq!(d.value(), Some(&20));

        // And nothing after that.
        let later = timeout(Duration::from_millis(500), d.settled()).await;
        assert!(later.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_drops_pending_input() {
        let mut d = Debounce::new(DELAY);
        d.input("resize");
        d.cancel();
        assert!(!d.is_pending());
        let waited = timeout(Duration::from_millis(200), d.settled()).await;
        assert!(waited.is_err());
        assert_eq!(d.value(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_separate_bursts_settle_separately() {
        let mut d = Debounce::new(DELAY);
        d.input(1);
        assert_eq!(d.settled().await, 1);
        d.input(2);
        assert_eq!(d.settled().await, 2);
    }
}
