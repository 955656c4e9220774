use std::time::{Duration, Instant};

/// Exponential delay between reconnect attempts. Never sleeps; callers ask
/// whether an attempt is due.
#[derive(Debug, Clone)]
pub struct ReconnectBackoff {
    initial: Duration,
    max: Duration,
    delay: Duration,
    next_attempt: Option<Instant>,
    failures: u32,
}

impl ReconnectBackoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        let max = max.max(initial);
        Self {
            initial,
            max,
            delay: initial,
            next_attempt: None,
            failures: 0,
        }
    }

    /// `Ok` if an attempt may start at `now`, otherwise the time left.
    pub fn check(&self, now: Instant) -> Result<(), Duration> {
        match self.next_attempt {
            Some(next) if now < next => Err(next - now),
            _ => Ok(()),
        }
    }

    /// Schedule the next attempt after a failure that ended at `at`, then
    /// double the delay up to the cap.
    pub fn record_failure(&mut self, at: Instant) {
        self.next_attempt = Some(at + self.delay);
        self.delay = self.delay.saturating_mul(2).min(self.max);
        self.failures = self.failures.saturating_add(1);
    }

    pub fn reset(&mut self) {
        self.delay = self.initial;
        self.next_attempt = None;
        self.failures = 0;
    }

    /// Consecutive failures since the last reset.
    pub fn failures(&self) -> u32 {
        self.failures
    }

    /// Delay that will follow the next failure.
    pub fn next_delay(&self) -> Duration {
        self.delay
    }
}
