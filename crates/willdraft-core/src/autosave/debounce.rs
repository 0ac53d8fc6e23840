//! Quiescence timer
//!
//! Every change re-arms the timer; `settled()` resolves once the full window
//! has passed without a change. The debouncer never looks at content.

use std::time::Duration;

use tokio::time::{sleep_until, Instant};

/// Default quiescence window
pub const DEFAULT_WINDOW: Duration = Duration::from_millis(1500);

/// Debounce timer driven by `touch()` calls
#[derive(Debug)]
pub struct Debouncer {
    window: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            deadline: None,
        }
    }

    /// Record a change, restarting the window
    pub fn touch(&mut self) {
        self.deadline = Some(Instant::now() + self.window);
    }

    /// Whether a settle is pending
    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Wait until the window has elapsed since the last `touch()`
    ///
    /// Cancel safe: dropping the future before it completes keeps the timer
    /// armed. Never resolves while disarmed.
    pub async fn settled(&mut self) {
        match self.deadline {
            Some(deadline) => {
                sleep_until(deadline).await;
                self.deadline = None;
            }
            None => std::future::pending().await,
        }
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{advance, timeout};

    #[tokio::test(start_paused = true)]
    async fn test_settles_after_window() {
        let mut debouncer = Debouncer::default();
        let start = Instant::now();
        debouncer.touch();

        debouncer.settled().await;
        assert_eq!(start.elapsed(), DEFAULT_WINDOW);
        assert!(!debouncer.is_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_settles_once_after_last_touch() {
        let mut debouncer = Debouncer::new(Duration::from_millis(1500));

        // Edits every 400ms never let the window elapse
        for _ in 0..5 {
            debouncer.touch();
            let early = timeout(Duration::from_millis(400), debouncer.settled()).await;
            assert!(early.is_err(), "settled during a burst");
        }
        let last_touch = Instant::now() - Duration::from_millis(400);

        debouncer.settled().await;
        assert!(Instant::now() >= last_touch + Duration::from_millis(1500));

        // Disarmed now: no second settle without another touch
        let again = timeout(Duration::from_secs(10), debouncer.settled()).await;
        assert!(again.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_wait_keeps_timer_armed() {
        let mut debouncer = Debouncer::new(Duration::from_millis(100));
        debouncer.touch();
        let _ = timeout(Duration::from_millis(50), debouncer.settled()).await;
        assert!(debouncer.is_armed());

        advance(Duration::from_millis(60)).await;
        debouncer.settled().await;
        assert!(!debouncer.is_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_settles_untouched() {
        let mut debouncer = Debouncer::new(Duration::from_millis(10));
        let result = timeout(Duration::from_secs(60), debouncer.settled()).await;
        assert!(result.is_err());
    }
}
