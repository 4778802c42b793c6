use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Randomized delay between requests: `min_ms` plus a uniform draw from
/// `[0, jitter_ms]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Pacing {
    pub min_ms: u64,
    pub jitter_ms: u64,
}

impl Pacing {
    pub const fn new(min_ms: u64, jitter_ms: u64) -> Self {
        Self { min_ms, jitter_ms }
    }

    /// No waiting at all; used by tests and offline runs.
    pub const fn disabled() -> Self {
        Self::new(0, 0)
    }

    pub fn is_disabled(&self) -> bool {
        *self == Self::disabled()
    }

    pub fn next_delay(&self) -> Duration {
        let jitter = if self.jitter_ms == 0 {
            0
        } else {
            fastrand::u64(0..=self.jitter_ms)
        };
        Duration::from_millis(self.min_ms + jitter)
    }

    pub async fn pause(&self) {
        if self.is_disabled() {
            return;
        }
        let delay = self.next_delay();
        debug!(delay_ms = delay.as_millis() as u64, "Pacing");
        tokio::time::sleep(delay).await;
    }
}
