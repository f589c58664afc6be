//! Trailing-edge debounce for typed search terms.

use std::time::Duration;

use tokio::time::Instant;

/// Holds the latest pushed value until it has been quiet for `delay`.
#[derive(Debug)]
pub struct Debouncer<T> {
    delay: Duration,
    pending: Option<(T, Instant)>,
}

impl<T> Debouncer<T> {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    /// Replace the pending value and restart the quiet period.
    pub fn push(&mut self, value: T) {
        self.pending = Some((value, Instant::now() + self.delay));
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(_, deadline)| *deadline)
    }

    /// Take the value if its quiet period is over.
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        let ready = matches!(&self.pending, Some((_, deadline)) if *deadline <= now);
        if ready {
            self.pending.take().map(|(value, _)| value)
        } else {
            None
        }
    }

    /// Wait out the quiet period and take the value; `None` if nothing is pending.
    pub async fn settle(&mut self) -> Option<T> {
        let deadline = self.deadline()?;
        tokio::time::sleep_until(deadline).await;
        self.pending.take().map(|(value, _)| value)
    }

    /// Drop the pending value.
    pub fn cancel(&mut self) {
        self.pending = None;
    }
}
