use std::time::{Duration, Instant};
use tokio::time::sleep;

/// Enforces a minimum interval between consecutive fetch starts.
/// A slow fetch eats into the interval instead of adding to it.
#[derive(Debug)]
pub struct Pacer {
    interval: Duration,
    last_start: Option<Instant>,
}

impl Pacer {
    pub fn new(interval: Duration) -> Self {
        Self { interval, last_start: None }
    }

    /// Wait out the remainder of the window, then mark a fetch as started.
    pub async fn ready(&mut self) {
        if let Some(last) = self.last_start {
            let elapsed = last.elapsed();
            if elapsed < self.interval {
                let wait = self.interval - elapsed;
                tracing::info!(wait_secs = wait.as_secs_f64(), "observing politeness window");
                sleep(wait).await;
            }
        }
        self.last_start = Some(Instant::now());
    }
}

/// Exponential delay between fetch retries, capped at `max`.
#[derive(Debug, Clone, Copy)]
pub struct RetryBackoff {
    base: Duration,
    max: Duration,
}

impl RetryBackoff {
    pub const fn new(base: Duration, max: Duration) -> Self {
        Self { base, max }
    }

    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.min(20));
        self.base.saturating_mul(factor).min(self.max)
    }
}
